// End-to-end: request body -> file-backed executor -> response body.

use std::fs;

use cellmerge_config::Settings;
use cellmerge_engine::{MergeSettings, WorkbookSnapshot};
use cellmerge_io::FileExecutor;
use cellmerge_protocol::{handle_merge, respond, MergeRequest};
use serde_json::{json, Value};

fn fixtures() -> (tempfile::TempDir, FileExecutor) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("sales.csv"),
        "region,amount,share\nNorth,1200.5,0.25\nSouth,,0.75\nEast,300,\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("people.json"),
        r#"{"columns": ["name", "joined"], "rows": [["Ada", "2024-01-02"], ["Grace", null]]}"#,
    )
    .unwrap();

    let toml = format!(
        "[[connections]]\nid = \"csv\"\nkind = \"csv\"\npath = {:?}\n\n[[connections]]\nid = \"json\"\nkind = \"json\"\npath = {:?}\n",
        dir.path().to_str().unwrap(),
        dir.path().to_str().unwrap()
    );
    let settings = Settings::from_toml(&toml).unwrap();
    let executor = FileExecutor::from_settings(&settings);
    (dir, executor)
}

fn request(body: Value) -> MergeRequest {
    serde_json::from_value(body).unwrap()
}

fn snapshot() -> Value {
    json!({
        "id": "wb",
        "sheetOrder": ["report"],
        "sheets": { "report": {
            "id": "report",
            "name": "Report",
            "cellData": {
                "0": {
                    "0": { "v": "Region", "s": "hdr" },
                    "1": { "v": "Amount", "s": "money" },
                    "2": { "v": "Share" }
                }
            }
        } },
        "styles": { "hdr": { "bl": 1 }, "money": { "ff": "Arial" } }
    })
}

#[test]
fn csv_merge_with_formats_and_style_template() {
    let (_dir, executor) = fixtures();
    let req = request(json!({
        "snapshot": snapshot(),
        "connectionId": "csv",
        "queryText": "SELECT region, amount, share FROM sales",
        "dataStartRow": 1,
        "sheetId": "report",
        "styleTemplateRow": 0,
        "columnMappings": [
            { "sourceColumn": "region", "destinationColumn": 0 },
            { "sourceColumn": "amount", "destinationColumn": 1, "format": "currency" },
            { "sourceColumn": "share", "destinationColumn": 2, "format": "percentage" }
        ]
    }));

    let response = handle_merge(&req, &executor, &MergeSettings::default()).unwrap();
    assert_eq!(response.row_count, 3);

    let body = serde_json::to_value(&response).unwrap();
    let cells = &body["snapshot"]["sheets"]["report"]["cellData"];
    assert_eq!(cells["1"]["0"], json!({ "v": "North", "s": "hdr" }));
    assert_eq!(cells["1"]["1"], json!({ "v": 1200.5, "s": "money-currency" }));
    assert_eq!(cells["1"]["2"], json!({ "v": 0.25, "s": { "n": { "pattern": "0.00%" } } }));
    assert!(cells["2"].get("1").is_none());
    assert!(cells["3"].get("2").is_none());

    let styles = &body["snapshot"]["styles"];
    assert_eq!(styles["money-currency"], json!({ "ff": "Arial", "n": { "pattern": "$#,##0.00" } }));
    assert_eq!(styles["money"], json!({ "ff": "Arial" }));

    // No counts declared: defaults grown to cover row 3 and column 2.
    let sheet = &body["snapshot"]["sheets"]["report"];
    assert_eq!(sheet["rowCount"], json!(1000));
    assert_eq!(sheet["columnCount"], json!(20));
}

#[test]
fn json_table_auto_mapped_from_letters() {
    let (_dir, executor) = fixtures();
    let req = request(json!({
        "snapshot": snapshot(),
        "connectionId": "json",
        "queryText": "people",
        "dataStartRow": 5,
        "sheetId": "report",
        "startColumn": "D"
    }));

    let response = handle_merge(&req, &executor, &MergeSettings::default()).unwrap();
    let grid = &response.snapshot.sheet("report").unwrap().cell_data;
    assert_eq!(grid.value(5, 3).map(|v| v.raw_display()), Some("Ada".to_string()));
    assert_eq!(grid.value(5, 4).map(|v| v.raw_display()), Some("2024-01-02".to_string()));
    assert_eq!(grid.value(6, 3).map(|v| v.raw_display()), Some("Grace".to_string()));
    assert!(grid.get(6, 4).is_none());

    // Original header row untouched.
    let original: WorkbookSnapshot = serde_json::from_value(snapshot()).unwrap();
    assert_eq!(
        response.snapshot.sheet("report").unwrap().cell_data.row(0),
        original.sheet("report").unwrap().cell_data.row(0)
    );
}

#[test]
fn failures_become_error_bodies() {
    let (_dir, executor) = fixtures();

    let cases = [
        (json!({ "connectionId": "nope", "queryText": "sales" }), "upstream_query"),
        (json!({ "connectionId": "csv", "queryText": "SELECT price FROM sales" }), "upstream_query"),
        (json!({ "connectionId": "csv", "queryText": "sales", "startColumn": "1A" }), "invalid_address"),
        (
            json!({ "connectionId": "csv", "queryText": "sales",
                    "columnMappings": [{ "sourceColumn": "amount", "destinationColumn": -1 }] }),
            "invalid_mapping",
        ),
        (json!({ "connectionId": "csv", "queryText": "sales", "sheetId": "other" }), "sheet_not_found"),
    ];

    for (overrides, kind) in cases {
        let mut body = json!({
            "snapshot": snapshot(),
            "dataStartRow": 1,
            "sheetId": "report"
        });
        for (k, v) in overrides.as_object().unwrap() {
            body[k] = v.clone();
        }
        let out = respond(&request(body), &executor, &MergeSettings::default()).unwrap();
        assert_eq!(out["kind"], json!(kind), "{out}");
        assert!(out["error"].as_str().is_some_and(|e| !e.is_empty()));
        assert!(out.get("snapshot").is_none());
    }
}
