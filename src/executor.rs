//! Query execution seam between the protocol layer and a database backend.
//!
//! The protocol engine never talks to a database itself; it hands SQL text
//! to a [`QueryExecutor`] and relays whatever comes back. Implementations
//! own everything about statement execution: connections, transactions,
//! injection safety, type mapping. The one obligation the protocol layer
//! places on them is tolerating concurrent calls from independent
//! sessions, hence the `Send + Sync` bounds.

use thiserror::Error;

use crate::table::TabularResult;

/// Failure reported by a query backend.
///
/// The wire format carries a single human-readable message and no
/// structured code, so this mirrors that.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ExecutorError(pub String);

impl ExecutorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Turns SQL text into a [`TabularResult`] or a failure.
///
/// One executor instance is shared by every session on a server; the
/// protocol layer imposes no locking discipline on it.
pub trait QueryExecutor: Send + Sync {
    fn execute(&self, sql: &str) -> Result<TabularResult, ExecutorError>;
}

/// Executor that answers every query with the same canned result.
///
/// Stands in for a real backend in tests and demo deployments, the same
/// three-row `id`/`name`/`value` table regardless of the SQL it is given.
#[derive(Debug, Clone)]
pub struct FixtureExecutor {
    result: TabularResult,
}

impl FixtureExecutor {
    /// Fixture with the stock `id`/`name`/`value` rows.
    pub fn new() -> Self {
        let columns = vec!["id".to_string(), "name".to_string(), "value".to_string()];
        let rows = vec![
            vec![
                Some("1".to_string()),
                Some("test1".to_string()),
                Some("100".to_string()),
            ],
            vec![
                Some("2".to_string()),
                Some("test2".to_string()),
                Some("200".to_string()),
            ],
            vec![
                Some("3".to_string()),
                Some("test3".to_string()),
                Some("300".to_string()),
            ],
        ];
        Self {
            result: TabularResult::new(columns, rows),
        }
    }

    /// Fixture returning an arbitrary result instead of the stock rows.
    pub fn with_result(result: TabularResult) -> Self {
        Self { result }
    }
}

impl Default for FixtureExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryExecutor for FixtureExecutor {
    fn execute(&self, _sql: &str) -> Result<TabularResult, ExecutorError> {
        Ok(self.result.clone())
    }
}

/// Executor that rejects every query with a fixed message.
///
/// Used in tests to exercise the error path of the session loop.
#[derive(Debug, Clone)]
pub struct FailingExecutor {
    message: String,
}

impl FailingExecutor {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl QueryExecutor for FailingExecutor {
    fn execute(&self, _sql: &str) -> Result<TabularResult, ExecutorError> {
        Err(ExecutorError::new(self.message.clone()))
    }
}
