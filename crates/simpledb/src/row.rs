//! Dynamically-shaped result rows and row streams.

use crate::error::{DbError, DbResult};
use crate::value::{FromValue, Value};
use futures_core::Stream;
use futures_util::TryStreamExt;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// One result row: column names shared across the result set, plus values.
#[derive(Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row. `values` must line up with `columns`.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> DbResult<Self> {
        if columns.len() != values.len() {
            return Err(DbError::invalid_argument(format!(
                "row has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Value of the named column. Exact match first, then ASCII
    /// case-insensitive.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index_of(name).map(|i| &self.values[i])
    }

    pub fn get_by_ordinal(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Convert the named column to `T`.
    pub fn try_get<T: FromValue>(&self, name: &str) -> DbResult<T> {
        let value = self
            .get(name)
            .ok_or_else(|| DbError::decode(name, "no such column"))?;
        T::from_value(value.clone()).map_err(|e| DbError::decode(name, e.to_string()))
    }

    pub fn try_get_by_ordinal<T: FromValue>(&self, index: usize) -> DbResult<T> {
        let value = self
            .get_by_ordinal(index)
            .ok_or_else(|| DbError::decode(format!("#{index}"), "column index out of range"))?;
        let column = &self.columns[index];
        T::from_value(value.clone()).map_err(|e| DbError::decode(column.as_str(), e.to_string()))
    }

    /// `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(name)))
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// A forward-only stream of rows.
///
/// Type-erased so every connection returns the same stream type. Dropping
/// it releases the underlying cursor.
#[must_use]
pub struct RowStream<'a> {
    inner: Pin<Box<dyn Stream<Item = DbResult<Row>> + Send + 'a>>,
}

impl<'a> RowStream<'a> {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = DbResult<Row>> + Send + 'a,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// A stream over rows already in memory.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self::new(futures_util::stream::iter(rows.into_iter().map(Ok)))
    }

    /// Drain the stream into a vector, stopping at the first error.
    pub async fn collect_rows(self) -> DbResult<Vec<Row>> {
        self.try_collect().await
    }
}

impl Stream for RowStream<'_> {
    type Item = DbResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for RowStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStream").finish_non_exhaustive()
    }
}

/// Result of a query run with [`QueryOptions`](crate::QueryOptions): either
/// fully buffered or still streaming from the connection.
#[derive(Debug)]
pub enum Rows<'a> {
    Buffered(Vec<Row>),
    Streaming(RowStream<'a>),
}

impl<'a> Rows<'a> {
    pub fn is_buffered(&self) -> bool {
        matches!(self, Rows::Buffered(_))
    }

    /// Into a stream, whichever way the rows were fetched.
    pub fn into_stream(self) -> RowStream<'a> {
        match self {
            Rows::Buffered(rows) => RowStream::from_rows(rows),
            Rows::Streaming(stream) => stream,
        }
    }

    /// Into a vector, draining the stream if needed.
    pub async fn into_vec(self) -> DbResult<Vec<Row>> {
        match self {
            Rows::Buffered(rows) => Ok(rows),
            Rows::Streaming(stream) => stream.collect_rows().await,
        }
    }
}
