//! Result column -> sheet column mapping.

use serde::{Deserialize, Serialize};

use crate::error::{MergeError, Result};
use crate::format::FormatKind;

/// Caller-supplied mapping. `destination_column` is signed so that a negative
/// value from the wire reaches validation instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    /// Result column name, or a zero-based position written as text.
    #[serde(alias = "queryColumn")]
    pub source_column: String,
    #[serde(alias = "sheetColumn")]
    pub destination_column: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatKind>,
}

impl ColumnMapping {
    pub fn new(source_column: impl Into<String>, destination_column: i64) -> Self {
        Self {
            source_column: source_column.into(),
            destination_column,
            format: None,
        }
    }

    pub fn with_format(mut self, format: FormatKind) -> Self {
        self.format = Some(format);
        self
    }
}

/// Mapping validated against a result set: both ends are concrete indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundMapping {
    pub source_index: usize,
    pub destination_column: u32,
    pub format: Option<FormatKind>,
}

/// Explicit mappings are returned verbatim. Without any, each result column is
/// mapped in order to `start_column + position` with no format.
pub fn resolve_mappings(
    explicit: &[ColumnMapping],
    result_columns: &[String],
    start_column: u32,
) -> Vec<ColumnMapping> {
    if !explicit.is_empty() {
        return explicit.to_vec();
    }

    result_columns
        .iter()
        .enumerate()
        .map(|(i, name)| ColumnMapping::new(name.clone(), i64::from(start_column) + i as i64))
        .collect()
}

/// Validate every mapping up front and resolve source columns to positions.
///
/// Source columns match result column names exactly (case-sensitive) and fall
/// back to a zero-based position. Destinations must lie in `0..max_columns`.
/// Two mappings may share a destination; the later one wins when written.
pub fn bind_mappings(
    mappings: &[ColumnMapping],
    result_columns: &[String],
    max_columns: u32,
) -> Result<Vec<BoundMapping>> {
    let mut bound: Vec<BoundMapping> = Vec::with_capacity(mappings.len());

    for mapping in mappings {
        let dest = mapping.destination_column;
        if dest < 0 {
            return Err(MergeError::InvalidMapping(format!(
                "destination column {dest} for {:?} is negative",
                mapping.source_column
            )));
        }
        if dest >= i64::from(max_columns) {
            return Err(MergeError::InvalidMapping(format!(
                "destination column {dest} for {:?} exceeds the {max_columns}-column limit",
                mapping.source_column
            )));
        }

        let source_index = resolve_source(&mapping.source_column, result_columns)?;

        if let Some(prev) = bound.iter().find(|b| i64::from(b.destination_column) == dest) {
            log::debug!(
                "column mapping collision: {:?} overwrites result column {} at destination {dest}",
                mapping.source_column,
                prev.source_index
            );
        }

        bound.push(BoundMapping {
            source_index,
            // Range-checked against max_columns above.
            destination_column: dest as u32,
            format: mapping.format,
        });
    }

    Ok(bound)
}

fn resolve_source(source: &str, result_columns: &[String]) -> Result<usize> {
    if let Some(i) = result_columns.iter().position(|c| c == source) {
        return Ok(i);
    }

    match source.trim().parse::<usize>() {
        Ok(i) if i < result_columns.len() => Ok(i),
        Ok(i) => Err(MergeError::InvalidMapping(format!(
            "source column position {i} is out of range ({} result columns)",
            result_columns.len()
        ))),
        Err(_) => Err(MergeError::InvalidMapping(format!(
            "source column {source:?} not found in result columns [{}]",
            result_columns.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::MAX_COLUMNS;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_auto_mapping_from_start_column() {
        let mappings = resolve_mappings(&[], &cols(&["name", "amount"]), 2);
        assert_eq!(
            mappings,
            vec![ColumnMapping::new("name", 2), ColumnMapping::new("amount", 3)]
        );
    }

    #[test]
    fn test_explicit_mappings_returned_verbatim() {
        let explicit = vec![
            ColumnMapping::new("amount", 7).with_format(FormatKind::Currency),
            ColumnMapping::new("nope", 0),
        ];
        assert_eq!(resolve_mappings(&explicit, &cols(&["name", "amount"]), 2), explicit);
    }

    #[test]
    fn test_bind_by_name_then_position() {
        let columns = cols(&["name", "1", "amount"]);
        let bound = bind_mappings(
            &[
                ColumnMapping::new("amount", 0),
                ColumnMapping::new("1", 1),
                ColumnMapping::new("0", 2),
            ],
            &columns,
            MAX_COLUMNS,
        )
        .unwrap();

        assert_eq!(bound[0].source_index, 2);
        // A column literally named "1" wins over position 1.
        assert_eq!(bound[1].source_index, 1);
        assert_eq!(bound[2].source_index, 0);
    }

    #[test]
    fn test_name_match_is_case_sensitive() {
        let err = bind_mappings(&[ColumnMapping::new("Amount", 0)], &cols(&["amount"]), MAX_COLUMNS)
            .unwrap_err();
        assert!(matches!(err, MergeError::InvalidMapping(_)));
    }

    #[test]
    fn test_rejects_bad_destinations() {
        let columns = cols(&["a"]);
        assert!(matches!(
            bind_mappings(&[ColumnMapping::new("a", -1)], &columns, MAX_COLUMNS),
            Err(MergeError::InvalidMapping(_))
        ));
        assert!(matches!(
            bind_mappings(&[ColumnMapping::new("a", 16_384)], &columns, MAX_COLUMNS),
            Err(MergeError::InvalidMapping(_))
        ));
        assert!(bind_mappings(&[ColumnMapping::new("a", 16_383)], &columns, MAX_COLUMNS).is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_position() {
        assert!(matches!(
            bind_mappings(&[ColumnMapping::new("3", 0)], &cols(&["a", "b"]), MAX_COLUMNS),
            Err(MergeError::InvalidMapping(_))
        ));
    }

    #[test]
    fn test_collisions_are_allowed() {
        let bound = bind_mappings(
            &[ColumnMapping::new("a", 4), ColumnMapping::new("b", 4)],
            &cols(&["a", "b"]),
            MAX_COLUMNS,
        )
        .unwrap();
        assert_eq!(bound.len(), 2);
    }

    #[test]
    fn test_legacy_wire_keys() {
        let mapping: ColumnMapping = serde_json::from_value(serde_json::json!({
            "queryColumn": "qty", "sheetColumn": 1, "format": "number"
        }))
        .unwrap();
        assert_eq!(mapping, ColumnMapping::new("qty", 1).with_format(FormatKind::Number));
    }
}
