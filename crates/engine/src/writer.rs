//! Merge query results into a workbook snapshot.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::MAX_COLUMNS;
use crate::bounds::GrowthPolicy;
use crate::error::{MergeError, Result};
use crate::format::StyleComposer;
use crate::grid::Cell;
use crate::mapping::{bind_mappings, ColumnMapping};
use crate::result::ResultSet;
use crate::snapshot::WorkbookSnapshot;

/// Where and how one result set is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePlan {
    pub sheet_id: String,
    pub mappings: Vec<ColumnMapping>,
    /// Destination row of the first result row (0-based).
    pub start_row: u32,
    /// Row whose per-column styles are copied onto every written cell.
    pub template_row: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSettings {
    pub growth: GrowthPolicy,
    /// Destination columns at or above this are rejected.
    pub max_columns: u32,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            growth: GrowthPolicy::default(),
            max_columns: MAX_COLUMNS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub snapshot: WorkbookSnapshot,
    /// Result rows processed (including rows whose values were all null).
    pub rows_merged: usize,
    pub cells_written: usize,
}

/// Merge `result` into a copy of `snapshot`.
///
/// Everything that can fail is checked before the copy is touched, so an
/// error leaves no partial write anywhere. Null and empty values are skipped
/// and whatever was at that position stays. Sheets other than
/// `plan.sheet_id` are carried over unchanged.
pub fn merge(
    snapshot: &WorkbookSnapshot,
    plan: &MergePlan,
    result: &ResultSet,
    settings: &MergeSettings,
) -> Result<MergeOutcome> {
    let sheet = snapshot.sheet(&plan.sheet_id)?;
    let bound = bind_mappings(&plan.mappings, &result.columns, settings.max_columns)?;

    if let Some(last_offset) = result.rows.len().checked_sub(1) {
        let last_row = u64::from(plan.start_row) + last_offset as u64;
        if last_row > u64::from(u32::MAX) {
            return Err(MergeError::InvalidMapping(format!(
                "{} rows starting at row {} exceed the addressable row range",
                result.rows.len(),
                plan.start_row
            )));
        }
    }

    log::info!(
        "merging {} rows x {} columns into sheet {:?} at row {}",
        result.rows.len(),
        bound.len(),
        plan.sheet_id,
        plan.start_row
    );

    // Captured before writing: the template row may lie inside the write region.
    let template_styles: HashMap<u32, Value> = plan
        .template_row
        .and_then(|r| sheet.cell_data.row(r))
        .map(|cols| {
            cols.iter()
                .filter_map(|(&col, cell)| cell.s.clone().map(|s| (col, s)))
                .collect()
        })
        .unwrap_or_default();

    let styles_table = snapshot.styles();
    let table_usable = snapshot.extra.get("styles").map_or(true, Value::is_object);
    let mut composer = if table_usable {
        StyleComposer::new()
    } else {
        StyleComposer::inline_only()
    };

    let mut out = snapshot.clone();
    let target = out.sheet_mut(&plan.sheet_id)?;

    let mut cells_written = 0usize;
    let mut skipped = 0usize;

    for (offset, row) in result.rows.iter().enumerate() {
        // Range-checked above.
        let dest_row = plan.start_row + offset as u32;

        for mapping in &bound {
            let Some(value) = row.get(mapping.source_index).filter(|v| !v.is_empty()) else {
                skipped += 1;
                continue;
            };

            let style = composer.compose(
                template_styles.get(&mapping.destination_column),
                mapping.format,
                styles_table,
            );
            if target
                .cell_data
                .set(dest_row, mapping.destination_column, Cell::with_style(value.clone(), style))
            {
                cells_written += 1;
            }
        }
    }

    if cells_written > 0 && target.grow_to_fit(&settings.growth) {
        log::debug!(
            "sheet {:?} grown to {} rows x {} columns",
            plan.sheet_id,
            target.row_count.unwrap_or_default(),
            target.column_count.unwrap_or_default()
        );
    }

    if composer.has_pending() {
        // table_usable guarantees an object table here.
        if let Some(table) = out.styles_mut() {
            composer.commit(table);
        }
    }

    log::debug!("merge wrote {cells_written} cells, skipped {skipped} null values");

    Ok(MergeOutcome {
        snapshot: out,
        rows_merged: result.rows.len(),
        cells_written,
    })
}
