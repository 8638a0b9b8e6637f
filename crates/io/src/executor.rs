// File-backed query executor

use std::path::PathBuf;

use cellmerge_config::{ConnectionConfig, ConnectionKind, Settings};
use cellmerge_engine::{QueryError, QueryExecutor, ResultRow, ResultSet};

/// A parsed query: a table name and an optional column projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub table: String,
    /// `None` selects every column.
    pub columns: Option<Vec<String>>,
}

/// Parse query text. Accepted forms are a bare table name (`orders`) and
/// `SELECT <cols | *> FROM <table>`, keywords case-insensitive, with an
/// optional trailing `;`.
pub fn parse_query(text: &str) -> Result<TableQuery, QueryError> {
    let text = text.trim().trim_end_matches(';').trim();
    if text.is_empty() {
        return Err(QueryError::new("empty query"));
    }

    let lower = text.to_ascii_lowercase();
    if !lower.starts_with("select") || lower.len() > 6 && !lower.as_bytes()[6].is_ascii_whitespace() {
        return Ok(TableQuery {
            table: table_name(text)?,
            columns: None,
        });
    }

    let from = find_keyword(&lower, "from")
        .ok_or_else(|| QueryError::new(format!("syntax error: missing FROM in {text:?}")))?;
    let projection = text[6..from].trim();
    let table = text[from + 4..].trim();

    if projection.is_empty() {
        return Err(QueryError::new("syntax error: no columns selected"));
    }

    let columns = if projection == "*" {
        None
    } else {
        let cols: Vec<String> = projection
            .split(',')
            .map(|c| unquote(c.trim()).to_string())
            .collect();
        if cols.iter().any(String::is_empty) {
            return Err(QueryError::new(format!("syntax error: bad column list {projection:?}")));
        }
        Some(cols)
    };

    Ok(TableQuery {
        table: table_name(table)?,
        columns,
    })
}

/// Byte offset of a whitespace-delimited keyword in lowercased text.
fn find_keyword(lower: &str, keyword: &str) -> Option<usize> {
    let bytes = lower.as_bytes();
    lower.match_indices(keyword).map(|(i, _)| i).find(|&i| {
        let before = i == 0 || bytes[i - 1].is_ascii_whitespace();
        let after = bytes.get(i + keyword.len()).map_or(true, |b| b.is_ascii_whitespace());
        before && after
    })
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(s)
}

/// Table names map to file stems and may not leave the connection directory.
fn table_name(raw: &str) -> Result<String, QueryError> {
    let name = unquote(raw.trim());
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(name.to_string())
    } else {
        Err(QueryError::new(format!("invalid table name {raw:?}")))
    }
}

/// Answers queries from CSV or JSON files in each connection's directory.
#[derive(Debug, Clone, Default)]
pub struct FileExecutor {
    connections: Vec<ConnectionConfig>,
}

impl FileExecutor {
    pub fn new(connections: Vec<ConnectionConfig>) -> Self {
        Self { connections }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.connections.clone())
    }

    fn connection(&self, id: &str) -> Result<&ConnectionConfig, QueryError> {
        self.connections
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| QueryError::new(format!("unknown connection {id:?}")))
    }

    fn table_path(conn: &ConnectionConfig, table: &str) -> PathBuf {
        conn.path.join(format!("{table}.{}", conn.kind.extension()))
    }
}

impl QueryExecutor for FileExecutor {
    fn execute(&self, connection_id: &str, query_text: &str) -> Result<ResultSet, QueryError> {
        let conn = self.connection(connection_id)?;
        let query = parse_query(query_text)?;
        let path = Self::table_path(conn, &query.table);

        if !path.is_file() {
            return Err(QueryError::new(format!(
                "table {:?} does not exist in connection {:?}",
                query.table, conn.id
            )));
        }

        log::debug!("reading table {} for connection {:?}", path.display(), conn.id);
        let table = match conn.kind {
            ConnectionKind::Csv => crate::csv::read_result_set(&path),
            ConnectionKind::Json => crate::json::read_result_set(&path),
        }
        .map_err(|e| QueryError::new(e.to_string()))?;

        match query.columns {
            None => Ok(table),
            Some(columns) => project(table, &columns),
        }
    }

    fn test_connection(&self, connection_id: &str) -> Result<(), QueryError> {
        let conn = self.connection(connection_id)?;
        if conn.path.is_dir() {
            Ok(())
        } else {
            Err(QueryError::new(format!(
                "connection {:?}: directory {} not found",
                conn.id,
                conn.path.display()
            )))
        }
    }
}

fn project(table: ResultSet, columns: &[String]) -> Result<ResultSet, QueryError> {
    let positions = columns
        .iter()
        .map(|name| {
            table
                .columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| QueryError::new(format!("column {name:?} does not exist")))
        })
        .collect::<Result<Vec<usize>, QueryError>>()?;

    let rows = table
        .rows
        .iter()
        .map(|row| ResultRow::new(positions.iter().map(|&p| row.get(p).cloned()).collect()))
        .collect();

    Ok(ResultSet::new(columns.to_vec(), rows))
}
