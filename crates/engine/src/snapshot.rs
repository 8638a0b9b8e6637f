//! Workbook and sheet snapshots as exported by the host spreadsheet engine.
//!
//! Only the fields the merge engine needs are typed; everything else the
//! rendering surface put in the snapshot is kept in `extra` and written back
//! unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::bounds::{compute_bounds, GridBounds, GrowthPolicy};
use crate::error::{MergeError, Result};
use crate::grid::SparseGrid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSnapshot {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cell_data: SparseGrid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_count: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SheetSnapshot {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cell_data: SparseGrid::new(),
            row_count: None,
            column_count: None,
            extra: Map::new(),
        }
    }

    pub fn bounds(&self) -> Option<GridBounds> {
        compute_bounds(&self.cell_data)
    }

    /// Grow declared dimensions to cover all populated cells plus the policy
    /// margins. Counts only ever increase; an empty sheet is left as is.
    /// Returns whether either count changed.
    pub fn grow_to_fit(&mut self, policy: &GrowthPolicy) -> bool {
        let Some(bounds) = self.bounds() else {
            return false;
        };

        let rows = self.row_count.unwrap_or(policy.default_row_count);
        let cols = self.column_count.unwrap_or(policy.default_column_count);
        let new_rows = GrowthPolicy::grown(rows, bounds.max_row, policy.row_margin);
        let new_cols = GrowthPolicy::grown(cols, bounds.max_col, policy.column_margin);

        let changed = Some(new_rows) != self.row_count || Some(new_cols) != self.column_count;
        self.row_count = Some(new_rows);
        self.column_count = Some(new_cols);
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbookSnapshot {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub sheet_order: Vec<String>,
    #[serde(default)]
    pub sheets: BTreeMap<String, SheetSnapshot>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkbookSnapshot {
    /// Workbook holding just `sheet`, which is also first in `sheetOrder`.
    pub fn single_sheet(id: impl Into<String>, sheet: SheetSnapshot) -> Self {
        let sheet_id = sheet.id.clone();
        let mut sheets = BTreeMap::new();
        sheets.insert(sheet_id.clone(), sheet);
        Self {
            id: id.into(),
            sheet_order: vec![sheet_id],
            sheets,
            extra: Map::new(),
        }
    }

    pub fn sheet(&self, sheet_id: &str) -> Result<&SheetSnapshot> {
        self.sheets
            .get(sheet_id)
            .ok_or_else(|| MergeError::SheetNotFound(sheet_id.to_string()))
    }

    pub fn sheet_mut(&mut self, sheet_id: &str) -> Result<&mut SheetSnapshot> {
        self.sheets
            .get_mut(sheet_id)
            .ok_or_else(|| MergeError::SheetNotFound(sheet_id.to_string()))
    }

    pub fn first_sheet_id(&self) -> Option<&str> {
        self.sheet_order.first().map(String::as_str)
    }

    /// The workbook-level style table (`styles`), created if missing.
    /// `None` when the snapshot carries a `styles` key that is not an object.
    pub fn styles_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.extra
            .entry("styles")
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
    }

    pub fn styles(&self) -> Option<&Map<String, Value>> {
        self.extra.get("styles").and_then(Value::as_object)
    }
}
