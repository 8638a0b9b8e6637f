// JSON snapshots and JSON tables

use std::fs;
use std::path::Path;

use cellmerge_engine::{ResultSet, WorkbookSnapshot};
use serde_json::Value;

use crate::csv::read_file_as_utf8;
use crate::error::IoError;

pub fn read_snapshot(path: &Path) -> Result<WorkbookSnapshot, IoError> {
    let content = read_file_as_utf8(path)?;
    snapshot_from_str(&content)
}

pub fn snapshot_from_str(content: &str) -> Result<WorkbookSnapshot, IoError> {
    Ok(serde_json::from_str(content)?)
}

/// Write a snapshot as pretty-printed JSON. Key order is preserved.
pub fn write_snapshot(path: &Path, snapshot: &WorkbookSnapshot) -> Result<(), IoError> {
    let mut json = serde_json::to_string_pretty(snapshot)?;
    json.push('\n');
    fs::write(path, json).map_err(|e| IoError::file(path, e))
}

/// Read a JSON table: either an array of row objects, or
/// `{"columns": [...], "rows": [[...], ...]}`.
pub fn read_result_set(path: &Path) -> Result<ResultSet, IoError> {
    let content = read_file_as_utf8(path)?;
    result_set_from_str(&content)
}

pub fn result_set_from_str(content: &str) -> Result<ResultSet, IoError> {
    let value: Value = serde_json::from_str(content)?;
    result_set_from_value(&value)
}

pub fn result_set_from_value(value: &Value) -> Result<ResultSet, IoError> {
    match value {
        Value::Array(objects) => ResultSet::from_json_objects(objects).map_err(IoError::Json),
        Value::Object(map) => {
            let columns = map
                .get("columns")
                .and_then(Value::as_array)
                .ok_or_else(|| IoError::Json("table object needs a \"columns\" array".into()))?
                .iter()
                .map(|c| {
                    c.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| IoError::Json(format!("column name {c} is not a string")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let rows = match map.get("rows") {
                None => &[][..],
                Some(Value::Array(rows)) => rows.as_slice(),
                Some(_) => return Err(IoError::Json("\"rows\" must be an array".into())),
            };
            ResultSet::from_json_arrays(columns, rows).map_err(IoError::Json)
        }
        _ => Err(IoError::Json("expected an array of rows or a {columns, rows} object".into())),
    }
}
