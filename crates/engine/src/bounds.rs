//! Populated extent of a sparse grid, and the sheet growth policy built on it.

use serde::{Deserialize, Serialize};

use crate::grid::SparseGrid;

/// Largest populated row and column. A grid with no cells has no bounds
/// (`None`), which is distinct from a single cell at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    pub max_row: u32,
    pub max_col: u32,
}

/// Scan present keys only. Row entries with no columns do not count.
pub fn compute_bounds(grid: &SparseGrid) -> Option<GridBounds> {
    let mut bounds: Option<GridBounds> = None;

    for (row, cols) in grid.row_entries() {
        // Column maps are ordered, so the last key is the row's maximum.
        let Some((&last_col, _)) = cols.iter().next_back() else {
            continue;
        };
        bounds = Some(match bounds {
            None => GridBounds { max_row: row, max_col: last_col },
            Some(b) => GridBounds {
                max_row: b.max_row.max(row),
                max_col: b.max_col.max(last_col),
            },
        });
    }

    bounds
}

/// How declared sheet dimensions grow to cover content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthPolicy {
    /// Blank rows kept below the last populated row.
    pub row_margin: u32,
    /// Blank columns kept right of the last populated column.
    pub column_margin: u32,
    /// Assumed `rowCount` when a sheet does not declare one.
    pub default_row_count: u32,
    /// Assumed `columnCount` when a sheet does not declare one.
    pub default_column_count: u32,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self {
            row_margin: 100,
            column_margin: 10,
            default_row_count: 1000,
            default_column_count: 20,
        }
    }
}

impl GrowthPolicy {
    /// New declared count for one axis. Never smaller than `current`.
    pub fn grown(current: u32, max_index: u32, margin: u32) -> u32 {
        let needed = max_index.saturating_add(1).saturating_add(margin);
        current.max(needed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, CellValue};

    #[test]
    fn test_empty_grid_has_no_bounds() {
        assert_eq!(compute_bounds(&SparseGrid::new()), None);
    }

    #[test]
    fn test_origin_cell_is_not_empty() {
        let mut grid = SparseGrid::new();
        grid.set(0, 0, Cell::new(CellValue::from("x")));
        assert_eq!(compute_bounds(&grid), Some(GridBounds { max_row: 0, max_col: 0 }));
    }

    #[test]
    fn test_non_contiguous_keys() {
        let mut grid = SparseGrid::new();
        grid.set(2, 40, Cell::new(CellValue::from(1)));
        grid.set(9000, 3, Cell::new(CellValue::from(2)));
        assert_eq!(
            compute_bounds(&grid),
            Some(GridBounds { max_row: 9000, max_col: 40 })
        );
    }

    #[test]
    fn test_empty_row_maps_are_ignored() {
        let grid: SparseGrid =
            serde_json::from_value(serde_json::json!({ "0": { "1": { "v": 1 } }, "50": {} })).unwrap();
        assert_eq!(compute_bounds(&grid), Some(GridBounds { max_row: 0, max_col: 1 }));
    }

    #[test]
    fn test_grown_never_shrinks() {
        assert_eq!(GrowthPolicy::grown(5, 20, 0), 21);
        assert_eq!(GrowthPolicy::grown(500, 20, 100), 500);
        assert_eq!(GrowthPolicy::grown(0, 2, 100), 103);
        assert_eq!(GrowthPolicy::grown(0, u32::MAX, 100), u32::MAX);
    }
}
