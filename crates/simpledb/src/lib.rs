//! # simpledb
//!
//! A small facade for running SQL with parameters and getting back rows,
//! scalars or affected-row counts.
//!
//! ## Features
//!
//! - **Templates**: build commands from a format string with named, anonymous,
//!   literal, nested and list slots; names are checked for conflicts
//! - **Dialects**: token prefix, literal quoting and name comparison per engine
//! - **Lazy connections**: a `Database` opens on first use and is closed once
//! - **Observers**: hooks for "command created" and "connection opened",
//!   per instance and process-wide
//! - **PostgreSQL** (feature `postgres`): a `tokio-postgres` provider that
//!   rewrites named tokens to `$n`
//!
//! ## Example
//!
//! ```ignore
//! use simpledb::{Database, DatabaseConfig, StandardDialect, list, named, template};
//!
//! let config = DatabaseConfig::new().dialect(StandardDialect::postgres());
//! let mut db = Database::from_settings(
//!     simpledb::ConnectionSettings::new("postgres://app@localhost/app", "postgres"),
//!     config,
//! )?;
//!
//! // Literal text, positional args named @0, @1, ...
//! let args: Vec<simpledb::Arg> = vec![true.into(), 42.into()];
//! db.execute(("UPDATE users SET active = @0 WHERE id = @1", args)).await?;
//!
//! // Template with a named parameter and an IN list
//! let rows = db
//!     .query(template!(
//!         "SELECT * FROM users WHERE org = {} AND id IN {}",
//!         named("org", 7),
//!         list(vec![1, 2, 3]).parenthesized(),
//!     ))
//!     .await?;
//!
//! let missing: Option<i32> = db.query_scalar_as("SELECT NULL::int").await?;
//! db.close().await?;
//! ```

pub mod command;
pub mod config;
pub mod connection;
pub mod database;
pub mod dialect;
pub mod error;
pub mod observer;
pub mod param;
pub mod resolver;
pub mod row;
pub mod template;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use command::{Command, CommandBuilder, CommandOptions, CommandSource, QueryOptions};
pub use config::{DatabaseConfig, GlobalConfig, global};
pub use connection::{
    Connection, ConnectionDecorator, ConnectionFactory, ConnectionInfo, DEFAULT_PROVIDER,
    ProviderRegistry,
};
pub use database::{Database, DatabaseState};
pub use dialect::{Dialect, NameComparer, StandardDialect};
pub use error::{DbError, DbResult};
pub use observer::{CompositeObserver, DatabaseObserver, ObserverStats, StatsObserver};
pub use param::{
    Arg, DbType, DefaultParameterFactory, ParamConfig, ParamOption, Parameter, ParameterFactory,
    param,
};
pub use resolver::{ConnectionSettings, ConnectionStringResolver, FileResolver, MapResolver};
pub use row::{Row, RowStream, Rows};
pub use template::{
    FormattedCommand, IntoSlot, ListSlot, Slot, Template, TemplateFormatter, list, literal, named,
    reference,
};
pub use value::{FromValue, Value};

#[cfg(feature = "tracing")]
pub use observer::TracingObserver;

#[cfg(feature = "postgres")]
pub use postgres::{PgConnection, PgConnectionFactory};
