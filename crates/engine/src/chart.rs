//! Axis/series data for chart previews.

use serde::{Deserialize, Serialize};

use crate::address::{parse_range, RangeSpec};
use crate::error::Result;
use crate::grid::CellValue;
use crate::reader::{extract_column, resolve_sheet};
use crate::snapshot::WorkbookSnapshot;

/// Ranges a chart reads, e.g. `{"xAxis": "A1:A10", "series": ["B1:B10"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataRange {
    pub x_axis: String,
    #[serde(default)]
    pub series: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub x_axis: Vec<CellValue>,
    pub series: Vec<Vec<CellValue>>,
}

/// Extract the axis and every series. All ranges are parsed before any read,
/// so one malformed range fails the whole call.
pub fn extract_chart_data(
    workbook: &WorkbookSnapshot,
    sheet_id: Option<&str>,
    ranges: &ChartDataRange,
) -> Result<ChartData> {
    let x_range = parse_range(&ranges.x_axis)?;
    let series_ranges = ranges
        .series
        .iter()
        .map(|s| parse_range(s))
        .collect::<Result<Vec<RangeSpec>>>()?;

    let grid = &resolve_sheet(workbook, sheet_id)?.cell_data;

    Ok(ChartData {
        x_axis: extract_column(grid, &x_range),
        series: series_ranges.iter().map(|r| extract_column(grid, r)).collect(),
    })
}
