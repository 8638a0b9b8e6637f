//! Merge Protocol — request/response wire format
//!
//! Defines the JSON bodies exchanged between a calling UI (or server
//! endpoint) and the merge engine, plus the handler that turns a request
//! into a response.
//!
//! # Usage
//!
//! ```ignore
//! use cellmerge_protocol::{handle_merge, MergeRequest};
//!
//! let request: MergeRequest = serde_json::from_str(&body)?;
//! let response = handle_merge(&request, &executor, &MergeSettings::default())?;
//! println!("{}", serde_json::to_string(&response)?);
//! ```

use serde::{Deserialize, Serialize};

use cellmerge_engine::{
    col_to_index, merge, resolve_mappings, ColumnMapping, MergeError, MergePlan, MergeSettings,
    QueryExecutor, WorkbookSnapshot,
};

/// Current protocol version. Increment for breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// =============================================================================
// Request
// =============================================================================

/// A merge request. Rows and columns are zero-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub snapshot: WorkbookSnapshot,
    pub connection_id: String,
    pub query_text: String,
    /// Destination row of the first result row.
    #[serde(default)]
    pub data_start_row: u32,
    pub sheet_id: String,
    /// Explicit mappings. When empty, result columns are laid out in order
    /// from `start_column`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub column_mappings: Vec<ColumnMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_column: Option<StartColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_template_row: Option<u32>,
}

/// First destination column for auto-mapping: an index or column letters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StartColumn {
    Index(u32),
    Letters(String),
}

impl StartColumn {
    /// Zero-based column index. Digit strings are read as an index, anything
    /// else as column letters.
    pub fn resolve(&self) -> Result<u32, MergeError> {
        match self {
            Self::Index(i) => Ok(*i),
            Self::Letters(s) => {
                let s = s.trim();
                if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                    s.parse()
                        .map_err(|_| MergeError::InvalidAddress(format!("start column {s:?} is out of range")))
                } else {
                    col_to_index(s)
                }
            }
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResponse {
    pub snapshot: WorkbookSnapshot,
    /// Number of result rows merged.
    pub row_count: usize,
}

/// Error body. `error` is the message shown to the user as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

impl From<&MergeError> for ErrorResponse {
    fn from(e: &MergeError) -> Self {
        Self {
            error: e.to_string(),
            kind: e.kind().to_string(),
        }
    }
}

// =============================================================================
// Handler
// =============================================================================

/// Run the request's query once and merge the result into its snapshot.
///
/// The sheet and start column are checked before the query runs, so a
/// request that cannot succeed never reaches the data source.
pub fn handle_merge(
    request: &MergeRequest,
    executor: &dyn QueryExecutor,
    settings: &MergeSettings,
) -> Result<MergeResponse, MergeError> {
    request.snapshot.sheet(&request.sheet_id)?;
    let start_column = match &request.start_column {
        Some(sc) => sc.resolve()?,
        None => 0,
    };

    log::info!(
        "executing query on connection {:?} for sheet {:?}",
        request.connection_id,
        request.sheet_id
    );
    let result = executor.execute(&request.connection_id, &request.query_text)?;
    log::debug!("query returned {} rows, columns [{}]", result.len(), result.columns.join(", "));

    let plan = MergePlan {
        sheet_id: request.sheet_id.clone(),
        mappings: resolve_mappings(&request.column_mappings, &result.columns, start_column),
        start_row: request.data_start_row,
        template_row: request.style_template_row,
    };
    let outcome = merge(&request.snapshot, &plan, &result, settings)?;

    Ok(MergeResponse {
        snapshot: outcome.snapshot,
        row_count: outcome.rows_merged,
    })
}

/// Like [`handle_merge`], but always yields a JSON body: the response on
/// success, an [`ErrorResponse`] otherwise.
pub fn respond(
    request: &MergeRequest,
    executor: &dyn QueryExecutor,
    settings: &MergeSettings,
) -> Result<serde_json::Value, serde_json::Error> {
    match handle_merge(request, executor, settings) {
        Ok(response) => serde_json::to_value(response),
        Err(e) => {
            log::warn!("merge failed ({}): {e}", e.kind());
            serde_json::to_value(ErrorResponse::from(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellmerge_engine::{CellValue, ResultSet, SheetSnapshot, StaticExecutor};
    use serde_json::json;

    fn request_json() -> serde_json::Value {
        json!({
            "snapshot": {
                "id": "wb",
                "sheetOrder": ["s1"],
                "sheets": { "s1": { "id": "s1", "name": "Sheet1", "cellData": {} } }
            },
            "connectionId": "db",
            "queryText": "SELECT name, qty FROM orders",
            "dataStartRow": 1,
            "sheetId": "s1",
            "startColumn": "B"
        })
    }

    fn executor() -> StaticExecutor {
        let result = ResultSet::from_json_objects(&[
            json!({ "name": "bolt", "qty": 5 }),
            json!({ "name": "nut", "qty": null }),
        ])
        .unwrap();
        StaticExecutor::new().with_result("db", "SELECT name, qty FROM orders", result)
    }

    #[test]
    fn test_start_column_forms() {
        assert_eq!(StartColumn::Index(3).resolve().unwrap(), 3);
        assert_eq!(StartColumn::Letters("AD".into()).resolve().unwrap(), 29);
        assert_eq!(StartColumn::Letters("2".into()).resolve().unwrap(), 2);
        assert!(StartColumn::Letters("B2".into()).resolve().is_err());

        let parsed: StartColumn = serde_json::from_value(json!(4)).unwrap();
        assert_eq!(parsed, StartColumn::Index(4));
        let parsed: StartColumn = serde_json::from_value(json!("c")).unwrap();
        assert_eq!(parsed.resolve().unwrap(), 2);
    }

    #[test]
    fn test_handle_merge_auto_maps_from_start_column() {
        let request: MergeRequest = serde_json::from_value(request_json()).unwrap();
        let response = handle_merge(&request, &executor(), &MergeSettings::default()).unwrap();

        assert_eq!(response.row_count, 2);
        let grid = &response.snapshot.sheet("s1").unwrap().cell_data;
        assert_eq!(grid.value(1, 1), Some(&CellValue::from("bolt")));
        assert_eq!(grid.value(1, 2), Some(&CellValue::from(5)));
        assert_eq!(grid.value(2, 1), Some(&CellValue::from("nut")));
        assert!(grid.get(2, 2).is_none());
    }

    #[test]
    fn test_response_wire_shape() {
        let request: MergeRequest = serde_json::from_value(request_json()).unwrap();
        let body = respond(&request, &executor(), &MergeSettings::default()).unwrap();
        assert_eq!(body["rowCount"], json!(2));
        assert_eq!(body["snapshot"]["sheets"]["s1"]["cellData"]["1"]["1"]["v"], json!("bolt"));
    }

    #[test]
    fn test_upstream_failure_is_verbatim_error_body() {
        let mut value = request_json();
        value["queryText"] = json!("SELECT * FROM missing");
        let request: MergeRequest = serde_json::from_value(value).unwrap();

        let body = respond(&request, &executor(), &MergeSettings::default()).unwrap();
        assert_eq!(body["kind"], json!("upstream_query"));
        assert!(body["error"].as_str().unwrap().contains("SELECT * FROM missing"));
    }

    #[test]
    fn test_unknown_sheet_fails_before_query() {
        let mut value = request_json();
        value["sheetId"] = json!("nope");
        let request: MergeRequest = serde_json::from_value(value).unwrap();

        // Empty executor: reaching it would report upstream_query instead.
        let err = handle_merge(&request, &StaticExecutor::new(), &MergeSettings::default()).unwrap_err();
        assert_eq!(err.kind(), "sheet_not_found");
    }

    #[test]
    fn test_legacy_mapping_keys() {
        let mut value = request_json();
        value["columnMappings"] = json!([{ "queryColumn": "qty", "sheetColumn": 0, "format": "number" }]);
        let request: MergeRequest = serde_json::from_value(value).unwrap();
        let response = handle_merge(&request, &executor(), &MergeSettings::default()).unwrap();

        let cell = response.snapshot.sheet("s1").unwrap().cell_data.get(1, 0).unwrap().clone();
        assert_eq!(cell.v, Some(CellValue::from(5)));
        assert_eq!(cell.s, Some(json!({ "n": { "pattern": "#,##0.00" } })));
    }

    #[test]
    fn test_request_roundtrips_unknown_snapshot_keys() {
        let mut sheet = SheetSnapshot::new("s1", "Sheet1");
        sheet.extra.insert("zoomRatio".into(), json!(1.5));
        let mut snapshot = WorkbookSnapshot::single_sheet("wb", sheet);
        snapshot.extra.insert("locale".into(), json!("enUS"));

        let request = MergeRequest {
            snapshot,
            connection_id: "db".into(),
            query_text: "SELECT name, qty FROM orders".into(),
            data_start_row: 0,
            sheet_id: "s1".into(),
            column_mappings: vec![],
            start_column: None,
            style_template_row: None,
        };
        let response = handle_merge(&request, &executor(), &MergeSettings::default()).unwrap();
        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["snapshot"]["locale"], json!("enUS"));
        assert_eq!(body["snapshot"]["sheets"]["s1"]["zoomRatio"], json!(1.5));
    }
}
