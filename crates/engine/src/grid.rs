//! Sparse cell storage in the rendering surface's `cellData` shape.
//!
//! `cellData[row][col] = {v, s}`. Absent keys mean empty, never zero.

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::address::CellCoord;

/// Scalar cell value. Numbers keep their JSON representation (`5` stays `5`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl CellValue {
    /// Convert a JSON scalar. `null` and `""` are empty (`Ok(None)`); arrays and
    /// objects are rejected.
    pub fn from_json(value: &Value) -> Result<Option<Self>, String> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(Self::Bool(*b))),
            Value::Number(n) => Ok(Some(Self::Number(n.clone()))),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => Ok(Some(Self::Text(s.clone()))),
            Value::Array(_) | Value::Object(_) => {
                Err(format!("non-scalar value {value}"))
            }
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Text(s) => Value::String(s.clone()),
        }
    }

    /// True for values that must never be stored (`""`).
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Plain display text, no number formatting applied.
    pub fn raw_display(&self) -> String {
        match self {
            Self::Bool(b) => if *b { "TRUE".into() } else { "FALSE".into() },
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Cell as stored by the rendering surface. Keys other than `v`/`s` are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<CellValue>,
    /// Opaque style reference (style id or inline style object).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self { v: Some(value), s: None, extra: Map::new() }
    }

    pub fn with_style(value: CellValue, style: Option<Value>) -> Self {
        Self { v: Some(value), s: style, extra: Map::new() }
    }

    /// The stored value, treating `""` as absent.
    pub fn value(&self) -> Option<&CellValue> {
        self.v.as_ref().filter(|v| !v.is_empty())
    }
}

/// Row index -> column index -> cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SparseGrid {
    rows: BTreeMap<u32, BTreeMap<u32, Cell>>,
}

// Keys are read as strings and parsed: snapshots carry `#[serde(flatten)]`
// extras, and buffered content does not coerce string keys to integers.
impl<'de> Deserialize<'de> for SparseGrid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: BTreeMap<String, BTreeMap<String, Cell>> = BTreeMap::deserialize(deserializer)?;

        let mut rows = BTreeMap::new();
        for (row_key, cols) in raw {
            let row = parse_index::<D::Error>(&row_key)?;
            let mut parsed = BTreeMap::new();
            for (col_key, cell) in cols {
                parsed.insert(parse_index::<D::Error>(&col_key)?, cell);
            }
            rows.insert(row, parsed);
        }
        Ok(Self { rows })
    }
}

fn parse_index<E: de::Error>(key: &str) -> Result<u32, E> {
    key.parse()
        .map_err(|_| E::custom(format!("invalid cell index {key:?}")))
}

impl SparseGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a grid from dense rows, skipping empty values. Rows and columns
    /// past the `u32` index range are dropped.
    pub fn from_rows(rows: &[Vec<Option<CellValue>>]) -> Self {
        let mut grid = Self::new();
        for (r, row) in (0..=u32::MAX).zip(rows) {
            for (c, value) in (0..=u32::MAX).zip(row) {
                if let Some(value) = value {
                    grid.set(r, c, Cell::new(value.clone()));
                }
            }
        }
        grid
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&Cell> {
        self.rows.get(&row).and_then(|cols| cols.get(&col))
    }

    /// The cell's value if the cell exists and holds one.
    pub fn value(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.get(row, col).and_then(Cell::value)
    }

    /// Insert a cell. Cells without a value are refused so that an empty
    /// cell stays indistinguishable from an absent one; returns whether the
    /// cell was stored.
    pub fn set(&mut self, row: u32, col: u32, cell: Cell) -> bool {
        if cell.value().is_none() {
            return false;
        }
        self.rows.entry(row).or_default().insert(col, cell);
        true
    }

    pub fn remove(&mut self, row: u32, col: u32) -> Option<Cell> {
        let cols = self.rows.get_mut(&row)?;
        let removed = cols.remove(&col);
        if cols.is_empty() {
            self.rows.remove(&row);
        }
        removed
    }

    /// Columns present in one row.
    pub fn row(&self, row: u32) -> Option<&BTreeMap<u32, Cell>> {
        self.rows.get(&row)
    }

    /// All present cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &Cell)> {
        self.rows.iter().flat_map(|(&row, cols)| {
            cols.iter().map(move |(&col, cell)| (CellCoord::new(row, col), cell))
        })
    }

    /// Row keys and their column maps, including rows with no columns.
    pub(crate) fn row_entries(&self) -> impl Iterator<Item = (u32, &BTreeMap<u32, Cell>)> {
        self.rows.iter().map(|(&row, cols)| (row, cols))
    }

    pub fn cell_count(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    /// Dense copy for tabular export. Missing rows are empty vectors and
    /// trailing empty cells are trimmed.
    pub fn to_rows(&self) -> Vec<Vec<Option<CellValue>>> {
        let Some(bounds) = crate::bounds::compute_bounds(self) else {
            return Vec::new();
        };

        let mut out = vec![Vec::new(); bounds.max_row as usize + 1];
        for (coord, cell) in self.iter() {
            let Some(value) = cell.value() else { continue };
            let row = &mut out[coord.row as usize];
            if row.len() <= coord.col as usize {
                row.resize(coord.col as usize + 1, None);
            }
            row[coord.col as usize] = Some(value.clone());
        }
        for row in &mut out {
            while matches!(row.last(), Some(None)) {
                row.pop();
            }
        }
        out
    }
}
