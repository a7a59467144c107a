#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::StreamExt;
use simpledb::{Command, Connection, ConnectionInfo, DbResult, Row, RowStream, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a [`MockConnection`] saw.
#[derive(Debug, Default)]
pub struct MockState {
    pub opens: usize,
    pub closes: usize,
    pub commands: Vec<Command>,
    pub rows_read: usize,
}

pub type Shared = Arc<Mutex<MockState>>;

pub fn shared() -> Shared {
    Arc::new(Mutex::new(MockState::default()))
}

/// In-memory connection returning canned rows.
pub struct MockConnection {
    state: Shared,
    columns: Arc<[String]>,
    rows: Vec<Vec<Value>>,
    affected: u64,
    delay: Option<Duration>,
}

impl MockConnection {
    pub fn new(state: Shared) -> Self {
        Self {
            state,
            columns: Arc::from(Vec::<String>::new()),
            rows: Vec::new(),
            affected: 0,
            delay: None,
        }
    }

    pub fn rows(mut self, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self.rows = rows;
        self
    }

    pub fn affected(mut self, n: u64) -> Self {
        self.affected = n;
        self
    }

    pub fn delay(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }

    async fn record(&mut self, command: &Command) {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        self.state.lock().unwrap().commands.push(command.clone());
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn open(&mut self) -> DbResult<()> {
        self.state.lock().unwrap().opens += 1;
        Ok(())
    }

    async fn close(&mut self) -> DbResult<()> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }

    fn info(&self) -> ConnectionInfo {
        ConnectionInfo::new("mock", "memory")
    }

    async fn execute(&mut self, command: &Command) -> DbResult<u64> {
        self.record(command).await;
        Ok(self.affected)
    }

    async fn query<'a>(&'a mut self, command: &Command) -> DbResult<RowStream<'a>> {
        self.record(command).await;
        let state = self.state.clone();
        let columns = self.columns.clone();
        let rows = self.rows.clone();
        let stream = futures_util::stream::iter(rows).map(move |values| {
            state.lock().unwrap().rows_read += 1;
            Row::new(columns.clone(), values)
        });
        Ok(RowStream::new(stream))
    }
}

/// Delegating wrapper that reports a different provider name.
pub struct Decorated(pub Box<dyn Connection>);

#[async_trait]
impl Connection for Decorated {
    async fn open(&mut self) -> DbResult<()> {
        self.0.open().await
    }

    async fn close(&mut self) -> DbResult<()> {
        self.0.close().await
    }

    fn info(&self) -> ConnectionInfo {
        ConnectionInfo::new(format!("decorated-{}", self.0.info().provider), self.0.info().target)
    }

    async fn execute(&mut self, command: &Command) -> DbResult<u64> {
        self.0.execute(command).await
    }

    async fn query<'a>(&'a mut self, command: &Command) -> DbResult<RowStream<'a>> {
        self.0.query(command).await
    }
}
