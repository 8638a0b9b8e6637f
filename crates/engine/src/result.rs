//! Tabular query results handed to the merge writer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::grid::CellValue;

/// One result row, positionally aligned with [`ResultSet::columns`].
/// `None` is a null (or empty) value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultRow {
    pub values: Vec<Option<CellValue>>,
}

impl ResultRow {
    pub fn new(values: Vec<Option<CellValue>>) -> Self {
        Self { values }
    }

    /// Value at a position; out-of-range positions read as null.
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.values.get(index).and_then(Option::as_ref)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<ResultRow>) -> Self {
        Self { columns, rows }
    }

    /// Build from JSON objects keyed by column name. Column order is the
    /// order keys are first seen; rows missing a key read as null.
    pub fn from_json_objects(objects: &[Value]) -> Result<Self, String> {
        let mut columns: Vec<String> = Vec::new();
        for (i, obj) in objects.iter().enumerate() {
            let map = obj
                .as_object()
                .ok_or_else(|| format!("row {i}: expected object"))?;
            for key in map.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(objects.len());
        for (i, obj) in objects.iter().enumerate() {
            // Every entry was checked to be an object above.
            let Some(map) = obj.as_object() else { continue };
            let values = columns
                .iter()
                .map(|col| match map.get(col) {
                    Some(v) => CellValue::from_json(v)
                        .map_err(|e| format!("row {i}, column {col:?}: {e}")),
                    None => Ok(None),
                })
                .collect::<Result<Vec<_>, String>>()?;
            rows.push(ResultRow::new(values));
        }

        Ok(Self { columns, rows })
    }

    /// Build from named columns and positional JSON arrays.
    pub fn from_json_arrays(columns: Vec<String>, arrays: &[Value]) -> Result<Self, String> {
        let mut rows = Vec::with_capacity(arrays.len());
        for (i, arr) in arrays.iter().enumerate() {
            let items = arr
                .as_array()
                .ok_or_else(|| format!("row {i}: expected array"))?;
            let values = items
                .iter()
                .enumerate()
                .map(|(c, v)| CellValue::from_json(v).map_err(|e| format!("row {i}, position {c}: {e}")))
                .collect::<Result<Vec<_>, String>>()?;
            rows.push(ResultRow::new(values));
        }
        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_objects_align_to_first_seen_columns() {
        let rows = [
            json!({ "name": "a", "qty": 5 }),
            json!({ "qty": null, "extra": true }),
            json!({ "name": "", "qty": 7 }),
        ];
        let set = ResultSet::from_json_objects(&rows).unwrap();

        assert_eq!(set.columns, vec!["name", "qty", "extra"]);
        assert_eq!(set.rows[0].get(1), Some(&CellValue::from(5)));
        assert_eq!(set.rows[1].get(0), None);
        assert_eq!(set.rows[1].get(2), Some(&CellValue::Bool(true)));
        assert_eq!(set.rows[2].get(0), None);
        assert_eq!(set.rows[2].get(9), None);
    }

    #[test]
    fn test_non_scalar_values_rejected() {
        let err = ResultSet::from_json_objects(&[json!({ "tags": ["a"] })]).unwrap_err();
        assert!(err.contains("tags"), "{err}");
        assert!(ResultSet::from_json_objects(&[json!(1)]).is_err());
    }

    #[test]
    fn test_arrays() {
        let set = ResultSet::from_json_arrays(
            vec!["a".into(), "b".into()],
            &[json!([1, "x"]), json!([null])],
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.rows[0].get(1), Some(&CellValue::from("x")));
        assert_eq!(set.rows[1].get(1), None);
    }
}
