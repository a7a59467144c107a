//! Hooks into the facade's lifecycle: command creation and connection open.

use crate::command::Command;
use crate::connection::ConnectionInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Observer of facade events. Both methods default to no-ops.
///
/// Observers run synchronously on the calling task; a panicking observer
/// propagates to the caller.
pub trait DatabaseObserver: Send + Sync {
    /// A command is fully built and about to run.
    fn command_created(&self, _command: &Command) {}

    /// A database instance opened its connection (once per instance).
    fn connection_opened(&self, _info: &ConnectionInfo) {}
}

/// Fans events out to several observers, in insertion order.
#[derive(Clone, Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn DatabaseObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<O: DatabaseObserver + 'static>(mut self, observer: O) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn add_arc(mut self, observer: Arc<dyn DatabaseObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl DatabaseObserver for CompositeObserver {
    fn command_created(&self, command: &Command) {
        for observer in &self.observers {
            observer.command_created(command);
        }
    }

    fn connection_opened(&self, info: &ConnectionInfo) {
        for observer in &self.observers {
            observer.connection_opened(info);
        }
    }
}

/// Counts events.
#[derive(Debug, Default)]
pub struct StatsObserver {
    commands_created: AtomicU64,
    connections_opened: AtomicU64,
    parameters_bound: AtomicU64,
}

/// Snapshot of [`StatsObserver`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserverStats {
    pub commands_created: u64,
    pub connections_opened: u64,
    pub parameters_bound: u64,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ObserverStats {
        ObserverStats {
            commands_created: self.commands_created.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            parameters_bound: self.parameters_bound.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.commands_created.store(0, Ordering::Relaxed);
        self.connections_opened.store(0, Ordering::Relaxed);
        self.parameters_bound.store(0, Ordering::Relaxed);
    }
}

impl DatabaseObserver for StatsObserver {
    fn command_created(&self, command: &Command) {
        self.commands_created.fetch_add(1, Ordering::Relaxed);
        self.parameters_bound
            .fetch_add(command.parameters.len() as u64, Ordering::Relaxed);
    }

    fn connection_opened(&self, _info: &ConnectionInfo) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }
}

impl<O: DatabaseObserver + ?Sized> DatabaseObserver for Arc<O> {
    fn command_created(&self, command: &Command) {
        (**self).command_created(command);
    }

    fn connection_opened(&self, info: &ConnectionInfo) {
        (**self).connection_opened(info);
    }
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(feature = "tracing")]
pub use tracing_observer::TracingObserver;

#[cfg(feature = "tracing")]
mod tracing_observer {
    use super::{DatabaseObserver, truncate_sql_bytes};
    use crate::command::Command;
    use crate::connection::ConnectionInfo;
    use tracing::Level;

    /// Emits one `tracing` event per built command on target `simpledb.sql`,
    /// and one per opened connection on `simpledb.connection`.
    #[derive(Debug, Clone)]
    pub struct TracingObserver {
        pub level: Level,
        /// Truncate long SQL (in bytes, on a char boundary). `None` logs it whole.
        pub max_sql_length: Option<usize>,
    }

    impl Default for TracingObserver {
        fn default() -> Self {
            Self {
                level: Level::DEBUG,
                max_sql_length: Some(200),
            }
        }
    }

    impl TracingObserver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn max_sql_length(mut self, len: usize) -> Self {
            self.max_sql_length = Some(len);
            self
        }

        pub fn no_truncate(mut self) -> Self {
            self.max_sql_length = None;
            self
        }

        pub(crate) fn truncate_sql(&self, sql: &str) -> String {
            match self.max_sql_length {
                Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
                _ => sql.to_string(),
            }
        }
    }

    macro_rules! emit_at_level {
        ($level:expr, $($field:tt)*) => {
            match $level {
                Level::ERROR => tracing::error!($($field)*),
                Level::WARN => tracing::warn!($($field)*),
                Level::INFO => tracing::info!($($field)*),
                Level::DEBUG => tracing::debug!($($field)*),
                Level::TRACE => tracing::trace!($($field)*),
            }
        };
    }

    impl DatabaseObserver for TracingObserver {
        fn command_created(&self, command: &Command) {
            let sql = self.truncate_sql(&command.text);
            let timeout = command.options.timeout.map(|d| format!("{d:?}"));
            emit_at_level!(
                self.level,
                target: "simpledb.sql",
                param_count = command.parameters.len(),
                timeout = timeout.as_deref().unwrap_or("-"),
                sql = %sql,
            );
        }

        fn connection_opened(&self, info: &ConnectionInfo) {
            emit_at_level!(
                self.level,
                target: "simpledb.connection",
                provider = %info.provider,
                target_db = %info.target,
                "connection opened"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOptions;
    use crate::param::Parameter;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl DatabaseObserver for Recorder {
        fn command_created(&self, command: &Command) {
            self.events.lock().unwrap().push(format!("cmd:{}", command.text));
        }

        fn connection_opened(&self, info: &ConnectionInfo) {
            self.events.lock().unwrap().push(format!("open:{}", info.provider));
        }
    }

    fn command() -> Command {
        Command {
            text: "SELECT @0".into(),
            parameters: vec![Parameter::named("0", 1)],
            options: CommandOptions::default(),
        }
    }

    #[test]
    fn composite_preserves_order() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let composite = CompositeObserver::new()
            .add_arc(first.clone())
            .add(second.clone());
        assert_eq!(composite.len(), 2);

        composite.command_created(&command());
        composite.connection_opened(&ConnectionInfo::new("mock", "db"));

        for r in [&first, &second] {
            assert_eq!(*r.events.lock().unwrap(), vec!["cmd:SELECT @0", "open:mock"]);
        }
    }

    #[test]
    fn stats_count_events() {
        let stats = StatsObserver::new();
        stats.command_created(&command());
        stats.command_created(&command());
        stats.connection_opened(&ConnectionInfo::new("mock", "db"));
        assert_eq!(
            stats.stats(),
            ObserverStats {
                commands_created: 2,
                connections_opened: 1,
                parameters_bound: 2,
            }
        );
        stats.reset();
        assert_eq!(stats.stats(), ObserverStats::default());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("héllo", 2), "h");
        assert_eq!(truncate_sql_bytes("abc", 10), "abc");
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn tracing_observer_truncates() {
        let obs = TracingObserver::new().max_sql_length(6);
        assert_eq!(obs.truncate_sql("SELECT 1"), "SELECT...");
        assert_eq!(obs.clone().no_truncate().truncate_sql("SELECT 1"), "SELECT 1");
        obs.command_created(&command());
    }
}
