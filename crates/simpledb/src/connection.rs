//! The connection boundary: what the facade needs from a database driver.

use crate::command::Command;
use crate::error::{DbError, DbResult};
use crate::row::RowStream;
use crate::value::Value;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Provider name used when a connection string does not name one.
pub const DEFAULT_PROVIDER: &str = "postgres";

/// Describes an opened connection to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub provider: String,
    /// Connection target with any password removed.
    pub target: String,
}

impl ConnectionInfo {
    pub fn new(provider: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            target: target.into(),
        }
    }
}

/// One physical database connection.
///
/// Implementations receive fully built commands; parameter tokens in
/// `command.text` use the facade dialect's syntax and it is up to the
/// connection to translate them if the server expects something else.
#[async_trait]
pub trait Connection: Send {
    async fn open(&mut self) -> DbResult<()>;

    /// Close the connection. Closing twice is not an error.
    async fn close(&mut self) -> DbResult<()>;

    fn info(&self) -> ConnectionInfo;

    /// Run a command, returning the affected-row count.
    async fn execute(&mut self, command: &Command) -> DbResult<u64>;

    /// Run a command and stream its rows. The stream holds the connection
    /// until dropped.
    async fn query<'a>(&'a mut self, command: &Command) -> DbResult<RowStream<'a>>;

    /// First column of the first row, or `Null` when there are no rows.
    async fn query_scalar(&mut self, command: &Command) -> DbResult<Value> {
        let mut rows = self.query(command).await?;
        match rows.next().await {
            Some(row) => Ok(row?.into_values().into_iter().next().unwrap_or(Value::Null)),
            None => Ok(Value::Null),
        }
    }
}

/// Creates unopened connections for one provider.
pub trait ConnectionFactory: Send + Sync {
    fn create(&self, connection_string: &str) -> DbResult<Box<dyn Connection>>;
}

impl<F> ConnectionFactory for F
where
    F: Fn(&str) -> DbResult<Box<dyn Connection>> + Send + Sync,
{
    fn create(&self, connection_string: &str) -> DbResult<Box<dyn Connection>> {
        self(connection_string)
    }
}

/// Wraps every freshly created connection (for instrumentation, retries
/// at the driver level, test doubles and the like).
pub trait ConnectionDecorator: Send + Sync {
    fn decorate(&self, connection: Box<dyn Connection>) -> Box<dyn Connection>;
}

impl<F> ConnectionDecorator for F
where
    F: Fn(Box<dyn Connection>) -> Box<dyn Connection> + Send + Sync,
{
    fn decorate(&self, connection: Box<dyn Connection>) -> Box<dyn Connection> {
        self(connection)
    }
}

/// Provider name -> connection factory. Names are case-insensitive.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, Arc<dyn ConnectionFactory>>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in providers enabled by crate features.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "postgres")]
        {
            let pg: Arc<dyn ConnectionFactory> = Arc::new(crate::postgres::PgConnectionFactory::default());
            registry.register_arc("postgres", pg.clone());
            registry.register_arc("postgresql", pg);
        }
        registry
    }

    pub fn register(&mut self, name: &str, factory: impl ConnectionFactory + 'static) -> &mut Self {
        self.register_arc(name, Arc::new(factory))
    }

    pub fn register_arc(&mut self, name: &str, factory: Arc<dyn ConnectionFactory>) -> &mut Self {
        self.factories.insert(name.to_ascii_lowercase(), factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get(&self, name: &str) -> DbResult<Arc<dyn ConnectionFactory>> {
        self.factories
            .get(&name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| DbError::Provider(format!("unknown provider '{name}'")))
    }

    /// Create an unopened connection through the named provider.
    pub fn create(&self, provider: &str, connection_string: &str) -> DbResult<Box<dyn Connection>> {
        self.get(provider)?.create(connection_string)
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

/// Strip `password=...` (key/value form) or the password part of a URL so
/// a connection string can be logged.
pub fn redact_connection_string(connection_string: &str) -> String {
    if let Some(scheme_end) = connection_string.find("://") {
        let rest = &connection_string[scheme_end + 3..];
        let authority_end = rest.find('/').unwrap_or(rest.len());
        if let Some(at) = rest[..authority_end].rfind('@') {
            let userinfo = &rest[..at];
            if let Some(colon) = userinfo.find(':') {
                return format!(
                    "{}{}:***{}",
                    &connection_string[..scheme_end + 3],
                    &userinfo[..colon],
                    &rest[at..]
                );
            }
        }
        return connection_string.to_string();
    }

    connection_string
        .split_whitespace()
        .map(|part| match part.split_once('=') {
            Some((key, _)) if key.eq_ignore_ascii_case("password") => format!("{key}=***"),
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullConnection;

    #[async_trait]
    impl Connection for NullConnection {
        async fn open(&mut self) -> DbResult<()> {
            Ok(())
        }

        async fn close(&mut self) -> DbResult<()> {
            Ok(())
        }

        fn info(&self) -> ConnectionInfo {
            ConnectionInfo::new("null", "")
        }

        async fn execute(&mut self, _command: &Command) -> DbResult<u64> {
            Ok(0)
        }

        async fn query<'a>(&'a mut self, _command: &Command) -> DbResult<RowStream<'a>> {
            Ok(RowStream::from_rows(Vec::new()))
        }
    }

    fn null_factory(_: &str) -> DbResult<Box<dyn Connection>> {
        Ok(Box::new(NullConnection))
    }

    #[test]
    fn registry_lookup_is_case_insensitive() {
        let mut registry = ProviderRegistry::new();
        registry.register("Null", null_factory);
        assert!(registry.contains("NULL"));
        assert!(registry.create("null", "whatever").is_ok());

        let err = registry.create("oracle", "x").err().unwrap();
        assert!(matches!(err, DbError::Provider(ref m) if m.contains("oracle")));
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn defaults_include_postgres() {
        let registry = ProviderRegistry::with_defaults();
        assert!(registry.contains("postgres"));
        assert!(registry.contains("PostgreSQL"));
    }

    #[tokio::test]
    async fn default_scalar_over_empty_result_is_null() {
        let mut conn = NullConnection;
        let cmd = Command {
            text: "SELECT 1 WHERE false".into(),
            parameters: Vec::new(),
            options: Default::default(),
        };
        assert_eq!(conn.query_scalar(&cmd).await.unwrap(), Value::Null);
    }

    #[test]
    fn redaction() {
        assert_eq!(
            redact_connection_string("postgres://app:s3cret@db:5432/main"),
            "postgres://app:***@db:5432/main"
        );
        assert_eq!(
            redact_connection_string("host=db user=app password=s3cret dbname=main"),
            "host=db user=app password=*** dbname=main"
        );
        assert_eq!(
            redact_connection_string("postgres://db/main"),
            "postgres://db/main"
        );
    }
}
