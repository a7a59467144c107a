//! The database facade.

use crate::command::{Command, CommandBuilder, CommandOptions, CommandSource, QueryOptions};
use crate::config::{DatabaseConfig, global};
use crate::connection::{Connection, ConnectionInfo, DEFAULT_PROVIDER};
use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::observer::DatabaseObserver;
use crate::param::ParameterFactory;
use crate::resolver::ConnectionSettings;
use crate::row::{Row, RowStream, Rows};
use crate::value::{FromValue, Value};
use futures_util::StreamExt;
use std::future::Future;
use std::time::Duration;

/// Lifecycle of a [`Database`]'s connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseState {
    /// No command has run yet; the connection is created but not opened.
    Unopened,
    Open,
    /// Terminal.
    Closed,
}

/// A lazily-opened connection plus the dialect and hooks used to build and
/// observe every command run on it.
///
/// ```ignore
/// use simpledb::{Database, template, named, list};
///
/// let mut db = Database::open_connection_string("postgres://app@localhost/app")?;
/// let n: i64 = db.query_scalar_as("SELECT count(*) FROM users").await?;
///
/// let rows = db
///     .query(template!(
///         "SELECT * FROM users WHERE org = {} AND id IN {}",
///         named("org", 7),
///         list(vec![1, 2, 3]).parenthesized(),
///     ))
///     .await?;
/// db.close().await?;
/// ```
pub struct Database {
    connection: Box<dyn Connection>,
    state: DatabaseState,
    config: DatabaseConfig,
}

impl Database {
    /// Open the connection registered under `name` in the process-wide resolver.
    pub fn open(name: &str) -> DbResult<Self> {
        Self::open_with_config(name, DatabaseConfig::default())
    }

    /// Open the connection registered under `name` in `config`'s resolver.
    pub fn open_with_config(name: &str, config: DatabaseConfig) -> DbResult<Self> {
        let settings = config.resolver.resolve(name)?;
        Self::from_settings(settings, config)
    }

    /// Open a connection string with the default provider.
    pub fn open_connection_string(connection_string: &str) -> DbResult<Self> {
        Self::open_with_provider(connection_string, DEFAULT_PROVIDER)
    }

    pub fn open_with_provider(connection_string: &str, provider: &str) -> DbResult<Self> {
        Self::from_settings(
            ConnectionSettings::new(connection_string, provider),
            DatabaseConfig::default(),
        )
    }

    pub fn from_settings(settings: ConnectionSettings, config: DatabaseConfig) -> DbResult<Self> {
        if settings.connection_string.trim().is_empty() {
            return Err(DbError::invalid_argument("connection string must not be empty"));
        }
        let mut connection = config
            .providers
            .create(&settings.provider, &settings.connection_string)?;
        if let Some(decorator) = &config.decorator {
            connection = decorator.decorate(connection);
        }
        Ok(Self::with_connection(connection, config))
    }

    /// Wrap an existing, unopened connection. The config's decorator is not
    /// applied.
    pub fn with_connection(connection: Box<dyn Connection>, config: DatabaseConfig) -> Self {
        Self {
            connection,
            state: DatabaseState::Unopened,
            config,
        }
    }

    pub fn state(&self) -> DatabaseState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == DatabaseState::Closed
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.config.dialect.as_ref()
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Close the connection. Closing again is a no-op.
    pub async fn close(&mut self) -> DbResult<()> {
        let was_open = self.state == DatabaseState::Open;
        self.state = DatabaseState::Closed;
        if was_open {
            #[cfg(feature = "tracing")]
            {
                let info = self.connection.info();
                tracing::debug!(target: "simpledb", provider = %info.provider, "closing connection");
            }
            self.connection.close().await?;
        }
        Ok(())
    }

    /// Build a command without running it or raising any event.
    pub fn command(&self, source: impl Into<CommandSource>, options: CommandOptions) -> DbResult<Command> {
        CommandBuilder::new(self.dialect()).build(source.into(), options)
    }

    /// Build a command with a custom parameter factory, without running it.
    pub fn command_with_factory(
        &self,
        source: impl Into<CommandSource>,
        options: CommandOptions,
        factory: &mut dyn ParameterFactory,
    ) -> DbResult<Command> {
        CommandBuilder::new(self.dialect()).build_with(source.into(), options, factory)
    }

    /// Run a command and return the affected-row count.
    pub async fn execute(&mut self, source: impl Into<CommandSource>) -> DbResult<u64> {
        self.execute_with(source, CommandOptions::default()).await
    }

    pub async fn execute_with(
        &mut self,
        source: impl Into<CommandSource>,
        options: CommandOptions,
    ) -> DbResult<u64> {
        let command = self.prepare(source.into(), options).await?;
        let timeout = self.timeout_for(&command);
        with_timeout(timeout, self.connection.execute(&command)).await
    }

    /// Run a command and buffer every row.
    pub async fn query(&mut self, source: impl Into<CommandSource>) -> DbResult<Vec<Row>> {
        self.query_with(source, QueryOptions::buffered())
            .await?
            .into_vec()
            .await
    }

    /// Run a command, buffering or streaming per `options.unbuffered`.
    ///
    /// A buffered query's timeout covers reading every row; a streaming
    /// query's timeout covers starting the query only.
    pub async fn query_with(
        &mut self,
        source: impl Into<CommandSource>,
        options: QueryOptions,
    ) -> DbResult<Rows<'_>> {
        let command = self.prepare(source.into(), options.command).await?;
        let timeout = self.timeout_for(&command);
        if options.unbuffered {
            let stream = with_timeout(timeout, self.connection.query(&command)).await?;
            Ok(Rows::Streaming(stream))
        } else {
            let connection = &mut self.connection;
            let rows = with_timeout(timeout, async move {
                connection.query(&command).await?.collect_rows().await
            })
            .await?;
            Ok(Rows::Buffered(rows))
        }
    }

    /// Run a command and stream its rows. The stream borrows the database
    /// until dropped.
    pub async fn query_stream(&mut self, source: impl Into<CommandSource>) -> DbResult<RowStream<'_>> {
        match self.query_with(source, QueryOptions::unbuffered()).await? {
            Rows::Streaming(stream) => Ok(stream),
            Rows::Buffered(rows) => Ok(RowStream::from_rows(rows)),
        }
    }

    /// First row, or `None`. Remaining rows are never read.
    pub async fn query_single(&mut self, source: impl Into<CommandSource>) -> DbResult<Option<Row>> {
        let mut stream = self.query_stream(source).await?;
        stream.next().await.transpose()
    }

    /// First column of the first row; `Null` when there are no rows.
    pub async fn query_scalar(&mut self, source: impl Into<CommandSource>) -> DbResult<Value> {
        self.query_scalar_with(source, CommandOptions::default()).await
    }

    pub async fn query_scalar_with(
        &mut self,
        source: impl Into<CommandSource>,
        options: CommandOptions,
    ) -> DbResult<Value> {
        let command = self.prepare(source.into(), options).await?;
        let timeout = self.timeout_for(&command);
        with_timeout(timeout, self.connection.query_scalar(&command)).await
    }

    /// [`query_scalar`](Self::query_scalar) converted to `T`. Use
    /// `Option<T>` to accept `NULL`.
    pub async fn query_scalar_as<T: FromValue>(&mut self, source: impl Into<CommandSource>) -> DbResult<T> {
        let value = self.query_scalar(source).await?;
        T::from_value(value)
    }

    /// Identity generated by the last insert on this connection.
    pub async fn last_insert_id(&mut self) -> DbResult<Value> {
        let sql = self.dialect().last_insert_id_sql().to_string();
        self.query_scalar(sql).await
    }

    /// Build the command, open the connection if needed, raise "command created".
    async fn prepare(&mut self, source: CommandSource, options: CommandOptions) -> DbResult<Command> {
        self.ensure_usable()?;
        let command = self.command(source, options)?;
        self.ensure_open().await?;
        self.notify(|o| o.command_created(&command));
        Ok(command)
    }

    fn ensure_usable(&self) -> DbResult<()> {
        if self.state == DatabaseState::Closed {
            return Err(DbError::InvalidOperation("database is closed".to_string()));
        }
        Ok(())
    }

    async fn ensure_open(&mut self) -> DbResult<()> {
        if self.state != DatabaseState::Unopened {
            return Ok(());
        }
        self.connection.open().await?;
        self.state = DatabaseState::Open;

        let info: ConnectionInfo = self.connection.info();
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "simpledb", provider = %info.provider, target_db = %info.target, "connection opened");
        self.notify(|o| o.connection_opened(&info));
        Ok(())
    }

    /// Instance observers first, then process-wide ones.
    fn notify(&self, event: impl Fn(&dyn DatabaseObserver)) {
        for observer in &self.config.observers {
            event(observer.as_ref());
        }
        for observer in &global::current().observers {
            event(observer.as_ref());
        }
    }

    fn timeout_for(&self, command: &Command) -> Option<Duration> {
        command.options.timeout.or(self.config.command_timeout)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("state", &self.state)
            .field("connection", &self.connection.info())
            .field("config", &self.config)
            .finish()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if self.state == DatabaseState::Open {
            // The connection's own Drop releases the socket.
            #[cfg(feature = "tracing")]
            tracing::debug!(target: "simpledb", "database dropped without close()");
        }
    }
}

async fn with_timeout<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = DbResult<T>>,
) -> DbResult<T> {
    match timeout {
        Some(duration) => tokio::time::timeout(duration, fut)
            .await
            .map_err(|_| DbError::Timeout(duration))?,
        None => fut.await,
    }
}
