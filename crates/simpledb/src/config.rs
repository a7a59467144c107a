//! Instance and process-wide configuration.

use crate::connection::{ConnectionDecorator, ProviderRegistry};
use crate::dialect::{Dialect, StandardDialect};
use crate::observer::DatabaseObserver;
use crate::resolver::{ConnectionStringResolver, MapResolver};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Process-wide defaults.
///
/// Read through [`global::current`] whenever a [`DatabaseConfig`] is
/// defaulted, and at event time for process-wide observers.
#[derive(Clone)]
pub struct GlobalConfig {
    pub dialect: Arc<dyn Dialect>,
    pub decorator: Option<Arc<dyn ConnectionDecorator>>,
    pub resolver: Arc<dyn ConnectionStringResolver>,
    pub providers: ProviderRegistry,
    pub observers: Vec<Arc<dyn DatabaseObserver>>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            dialect: Arc::new(StandardDialect::tsql()),
            decorator: None,
            resolver: Arc::new(MapResolver::new()),
            providers: ProviderRegistry::with_defaults(),
            observers: Vec::new(),
        }
    }
}

impl GlobalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dialect(mut self, dialect: impl Dialect + 'static) -> Self {
        self.dialect = Arc::new(dialect);
        self
    }

    pub fn decorator(mut self, decorator: impl ConnectionDecorator + 'static) -> Self {
        self.decorator = Some(Arc::new(decorator));
        self
    }

    pub fn resolver(mut self, resolver: impl ConnectionStringResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    pub fn observer(mut self, observer: impl DatabaseObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }
}

impl fmt::Debug for GlobalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalConfig")
            .field("dialect", &self.dialect)
            .field("decorator", &self.decorator.is_some())
            .field("resolver", &self.resolver)
            .field("providers", &self.providers)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// The process-wide [`GlobalConfig`] slot.
///
/// ```ignore
/// simpledb::global::install(
///     GlobalConfig::new()
///         .resolver(FileResolver::load("connections.toml")?)
///         .observer(TracingObserver::new()),
/// );
/// ```
pub mod global {
    use super::GlobalConfig;
    use std::sync::{Arc, OnceLock, PoisonError, RwLock};

    fn slot() -> &'static RwLock<Arc<GlobalConfig>> {
        static GLOBAL: OnceLock<RwLock<Arc<GlobalConfig>>> = OnceLock::new();
        GLOBAL.get_or_init(|| RwLock::new(Arc::new(GlobalConfig::default())))
    }

    /// Replace the process-wide configuration. Instances already constructed
    /// keep the snapshot they took.
    pub fn install(config: GlobalConfig) {
        *slot().write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }

    pub fn current() -> Arc<GlobalConfig> {
        slot().read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Restore the built-in defaults.
    pub fn reset() {
        install(GlobalConfig::default());
    }

    /// Apply `f` to a copy of the current configuration and install the result.
    pub fn update(f: impl FnOnce(GlobalConfig) -> GlobalConfig) {
        let mut guard = slot().write().unwrap_or_else(PoisonError::into_inner);
        let next = f(GlobalConfig::clone(&guard));
        *guard = Arc::new(next);
    }
}

/// Configuration of one [`Database`](crate::Database) instance.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub dialect: Arc<dyn Dialect>,
    pub observers: Vec<Arc<dyn DatabaseObserver>>,
    pub decorator: Option<Arc<dyn ConnectionDecorator>>,
    pub resolver: Arc<dyn ConnectionStringResolver>,
    pub providers: ProviderRegistry,
    /// Used when a command carries no timeout of its own.
    pub command_timeout: Option<Duration>,
}

impl Default for DatabaseConfig {
    /// Snapshot of the process-wide defaults, with no instance observers.
    fn default() -> Self {
        let global = global::current();
        Self {
            dialect: global.dialect.clone(),
            observers: Vec::new(),
            decorator: global.decorator.clone(),
            resolver: global.resolver.clone(),
            providers: global.providers.clone(),
            command_timeout: None,
        }
    }
}

impl DatabaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dialect(mut self, dialect: impl Dialect + 'static) -> Self {
        self.dialect = Arc::new(dialect);
        self
    }

    pub fn dialect_arc(mut self, dialect: Arc<dyn Dialect>) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn observer(mut self, observer: impl DatabaseObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn observer_arc(mut self, observer: Arc<dyn DatabaseObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn decorator(mut self, decorator: impl ConnectionDecorator + 'static) -> Self {
        self.decorator = Some(Arc::new(decorator));
        self
    }

    pub fn no_decorator(mut self) -> Self {
        self.decorator = None;
        self
    }

    pub fn resolver(mut self, resolver: impl ConnectionStringResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("dialect", &self.dialect)
            .field("observers", &self.observers.len())
            .field("decorator", &self.decorator.is_some())
            .field("resolver", &self.resolver)
            .field("providers", &self.providers)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}
