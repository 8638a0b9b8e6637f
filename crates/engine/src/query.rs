//! Query execution seam.
//!
//! The engine never talks to a data source itself. Callers hand it an
//! executor; whatever the executor reports on failure reaches the user
//! unchanged as [`MergeError::UpstreamQuery`].

use std::collections::HashMap;
use std::fmt;

use crate::error::MergeError;
use crate::result::ResultSet;

/// Failure reported by a data source. The message is shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError(pub String);

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for QueryError {}

impl From<QueryError> for MergeError {
    fn from(e: QueryError) -> Self {
        MergeError::UpstreamQuery(e.0)
    }
}

pub trait QueryExecutor {
    /// Run `query_text` against the connection and return its rows.
    fn execute(&self, connection_id: &str, query_text: &str) -> Result<ResultSet, QueryError>;

    /// Check that the connection is reachable. Defaults to success for
    /// executors with nothing to probe.
    fn test_connection(&self, _connection_id: &str) -> Result<(), QueryError> {
        Ok(())
    }
}

/// Executor answering from canned result sets keyed by `(connection, query)`.
/// Used by tests and for replaying captured results.
#[derive(Debug, Clone, Default)]
pub struct StaticExecutor {
    results: HashMap<(String, String), ResultSet>,
}

impl StaticExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(
        mut self,
        connection_id: impl Into<String>,
        query_text: impl Into<String>,
        result: ResultSet,
    ) -> Self {
        self.results.insert((connection_id.into(), query_text.into()), result);
        self
    }
}

impl QueryExecutor for StaticExecutor {
    fn execute(&self, connection_id: &str, query_text: &str) -> Result<ResultSet, QueryError> {
        self.results
            .get(&(connection_id.to_string(), query_text.to_string()))
            .cloned()
            .ok_or_else(|| {
                QueryError::new(format!(
                    "no result recorded for query {query_text:?} on connection {connection_id:?}"
                ))
            })
    }

    fn test_connection(&self, connection_id: &str) -> Result<(), QueryError> {
        if self.results.keys().any(|(c, _)| c == connection_id) {
            Ok(())
        } else {
            Err(QueryError::new(format!("unknown connection {connection_id:?}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_executor() {
        let exec = StaticExecutor::new().with_result("db", "SELECT 1", ResultSet::default());
        assert!(exec.execute("db", "SELECT 1").is_ok());
        assert!(exec.test_connection("db").is_ok());
        assert!(exec.test_connection("other").is_err());

        let err = exec.execute("db", "SELECT 2").unwrap_err();
        assert!(err.to_string().contains("SELECT 2"));
    }

    #[test]
    fn test_query_error_passes_through_verbatim() {
        let err: MergeError = QueryError::new("relation \"orders\" does not exist").into();
        assert_eq!(err.kind(), "upstream_query");
        assert_eq!(err.to_string(), "relation \"orders\" does not exist");
    }
}
