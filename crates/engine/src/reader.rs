//! Pull linear value sequences out of a snapshot for axis/series use.

use crate::address::{parse_range, RangeSpec};
use crate::error::{MergeError, Result};
use crate::grid::{CellValue, SparseGrid};
use crate::snapshot::{SheetSnapshot, WorkbookSnapshot};

/// Read `range.start.col` for each row of the range, top to bottom.
///
/// Absent cells append nothing (no placeholder), so the result may be shorter
/// than the row span. Chart consumers rely on this to avoid phantom points.
pub fn extract_column(grid: &SparseGrid, range: &RangeSpec) -> Vec<CellValue> {
    let col = range.start.col;
    (range.start.row..=range.end.row)
        .filter_map(|row| grid.value(row, col).cloned())
        .collect()
}

/// Resolve the sheet to read from.
///
/// An explicit id must exist. Without one the first entry of `sheetOrder` is
/// used; other sheets are never picked implicitly.
pub fn resolve_sheet<'a>(
    workbook: &'a WorkbookSnapshot,
    sheet_id: Option<&str>,
) -> Result<&'a SheetSnapshot> {
    match sheet_id {
        Some(id) => workbook.sheet(id),
        None => {
            let first = workbook
                .first_sheet_id()
                .ok_or_else(|| MergeError::SheetNotFound("workbook has no sheets in sheetOrder".into()))?;
            workbook.sheet(first)
        }
    }
}

/// Resolve a sheet, parse `range_text`, and extract its first column.
pub fn extract_range(
    workbook: &WorkbookSnapshot,
    sheet_id: Option<&str>,
    range_text: &str,
) -> Result<Vec<CellValue>> {
    let range = parse_range(range_text)?;
    let sheet = resolve_sheet(workbook, sheet_id)?;
    Ok(extract_column(&sheet.cell_data, &range))
}
