//! `cellmerge-engine`: merges tabular query results into spreadsheet snapshots.
//!
//! Pure crate: takes a parsed workbook snapshot and a result set, returns a
//! new snapshot. Query execution sits behind [`QueryExecutor`]; no file or
//! network IO happens here.

pub mod address;
pub mod bounds;
pub mod chart;
pub mod error;
pub mod format;
pub mod grid;
pub mod mapping;
pub mod query;
pub mod reader;
pub mod result;
pub mod snapshot;
pub mod writer;

pub use address::{col_to_index, index_to_col, parse_cell_ref, parse_range, CellCoord, RangeSpec, MAX_COLUMNS};
pub use bounds::{compute_bounds, GridBounds, GrowthPolicy};
pub use chart::{extract_chart_data, ChartData, ChartDataRange};
pub use error::MergeError;
pub use format::{FormatKind, StyleComposer};
pub use grid::{Cell, CellValue, SparseGrid};
pub use mapping::{bind_mappings, resolve_mappings, BoundMapping, ColumnMapping};
pub use query::{QueryError, QueryExecutor, StaticExecutor};
pub use reader::{extract_column, extract_range, resolve_sheet};
pub use result::{ResultRow, ResultSet};
pub use snapshot::{SheetSnapshot, WorkbookSnapshot};
pub use writer::{merge, MergeOutcome, MergePlan, MergeSettings};
