//! Process-wide configuration lives in its own test binary so no other test
//! observes the installed global observers.

mod common;

use common::{MockConnection, shared};
use simpledb::{
    Command, ConnectionInfo, Database, DatabaseConfig, DatabaseObserver, DbResult, GlobalConfig,
    StandardDialect, global,
};
use std::sync::{Arc, Mutex};

struct Tagged {
    tag: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl DatabaseObserver for Tagged {
    fn command_created(&self, command: &Command) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:command:{}", self.tag, command.text));
    }

    fn connection_opened(&self, _info: &ConnectionInfo) {
        self.log.lock().unwrap().push(format!("{}:opened", self.tag));
    }
}

#[tokio::test]
async fn instance_observers_run_before_global_ones() -> DbResult<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    global::install(
        GlobalConfig::new()
            .dialect(StandardDialect::postgres())
            .observer(Tagged {
                tag: "global",
                log: log.clone(),
            }),
    );

    // Defaults snapshot the installed dialect.
    let config = DatabaseConfig::default().observer(Tagged {
        tag: "instance",
        log: log.clone(),
    });
    assert_eq!(config.dialect.last_insert_id_sql(), "SELECT lastval()");

    let mut db = Database::with_connection(Box::new(MockConnection::new(shared())), config);
    db.execute("SELECT 1").await?;
    db.execute("SELECT 2").await?;

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "instance:opened",
            "global:opened",
            "instance:command:SELECT 1",
            "global:command:SELECT 1",
            "instance:command:SELECT 2",
            "global:command:SELECT 2",
        ]
    );

    global::reset();
    db.execute("SELECT 3").await?;
    assert_eq!(log.lock().unwrap().len(), 7);
    assert_eq!(log.lock().unwrap()[6], "instance:command:SELECT 3");
    Ok(())
}
