//! A1-style address resolution.
//!
//! Columns are base-26 letter sequences (`A` = 0, `Z` = 25, `AA` = 26).
//! Rows are 1-based in text and 0-based internally.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MergeError, Result};

/// Practical column ceiling of the host spreadsheet engine (`XFD`).
pub const MAX_COLUMNS: u32 = 16_384;

/// Zero-based cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", index_to_col(self.col), u64::from(self.row) + 1)
    }
}

/// Inclusive rectangular range. `start <= end` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeSpec {
    pub start: CellCoord,
    pub end: CellCoord,
}

impl RangeSpec {
    pub fn new(start: CellCoord, end: CellCoord) -> Result<Self> {
        if start.row > end.row || start.col > end.col {
            return Err(MergeError::InvalidAddress(format!(
                "range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn row_span(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn col_span(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        (self.start.row..=self.end.row).contains(&coord.row)
            && (self.start.col..=self.end.col).contains(&coord.col)
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl std::str::FromStr for RangeSpec {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self> {
        parse_range(s)
    }
}

/// Convert column letters to a 0-based index. Case-insensitive.
pub fn col_to_index(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(MergeError::InvalidAddress("empty column letters".into()));
    }

    let too_large = || MergeError::InvalidAddress(format!("column {letters:?} is too large"));

    // The bijective value of the letters of `u32::MAX` is `u32::MAX + 1`.
    let mut value: u64 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(MergeError::InvalidAddress(format!(
                "invalid character {c:?} in column {letters:?}"
            )));
        }
        let digit = u64::from(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        value = value * 26 + digit;
        if value > u64::from(u32::MAX) + 1 {
            return Err(too_large());
        }
    }

    u32::try_from(value - 1).map_err(|_| too_large())
}

/// Convert a 0-based column index to letters. Total over all `u32`.
pub fn index_to_col(index: u32) -> String {
    let mut letters = Vec::new();
    let mut c = u64::from(index);
    loop {
        letters.push(b'A' + (c % 26) as u8);
        if c < 26 {
            break;
        }
        c = c / 26 - 1;
    }
    letters.reverse();
    // Only ASCII letters were pushed.
    letters.into_iter().map(char::from).collect()
}

/// Parse a single cell reference like `"B7"` or `"aa100"`.
pub fn parse_cell_ref(s: &str) -> Result<CellCoord> {
    let split = s
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(s.len());
    let (col_str, row_str) = s.split_at(split);

    if col_str.is_empty() {
        return Err(MergeError::InvalidAddress(format!("missing column in {s:?}")));
    }
    if row_str.is_empty() {
        return Err(MergeError::InvalidAddress(format!("missing row in {s:?}")));
    }
    if !row_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(MergeError::InvalidAddress(format!("invalid row in {s:?}")));
    }

    let col = col_to_index(col_str)?;
    let row: u32 = row_str
        .parse()
        .map_err(|_| MergeError::InvalidAddress(format!("row out of range in {s:?}")))?;
    if row == 0 {
        return Err(MergeError::InvalidAddress(format!("row must be at least 1 in {s:?}")));
    }

    Ok(CellCoord::new(row - 1, col))
}

/// Parse `"<COL><ROW>:<COL><ROW>"` into a range. Reversed bounds are rejected, not swapped.
pub fn parse_range(s: &str) -> Result<RangeSpec> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| MergeError::InvalidAddress(format!("missing ':' in range {s:?}")))?;
    RangeSpec::new(parse_cell_ref(start)?, parse_cell_ref(end)?)
}

/// Format a coordinate as an A1 reference.
pub fn coord_to_a1(row: u32, col: u32) -> String {
    CellCoord::new(row, col).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_col_to_index() {
        assert_eq!(col_to_index("A").unwrap(), 0);
        assert_eq!(col_to_index("Z").unwrap(), 25);
        assert_eq!(col_to_index("AA").unwrap(), 26);
        assert_eq!(col_to_index("az").unwrap(), 51);
        assert_eq!(col_to_index("ZZ").unwrap(), 701);
        assert_eq!(col_to_index("AAA").unwrap(), 702);
        assert_eq!(col_to_index("XFD").unwrap(), MAX_COLUMNS - 1);
    }

    #[test]
    fn test_col_to_index_rejects_bad_input() {
        assert!(matches!(col_to_index(""), Err(MergeError::InvalidAddress(_))));
        assert!(matches!(col_to_index("A1"), Err(MergeError::InvalidAddress(_))));
        assert!(matches!(col_to_index("É"), Err(MergeError::InvalidAddress(_))));
        assert!(matches!(col_to_index("ZZZZZZZZ"), Err(MergeError::InvalidAddress(_))));
    }

    #[test]
    fn test_index_to_col() {
        assert_eq!(index_to_col(0), "A");
        assert_eq!(index_to_col(25), "Z");
        assert_eq!(index_to_col(26), "AA");
        assert_eq!(index_to_col(702), "AAA");
        assert_eq!(index_to_col(16_383), "XFD");
        // Above the engine ceiling it still produces letters.
        assert_eq!(index_to_col(16_384), "XFE");
        assert_eq!(index_to_col(u32::MAX), "MWLQKWV");
    }

    #[test]
    fn test_roundtrip_at_index_limit() {
        assert_eq!(col_to_index(&index_to_col(u32::MAX)).unwrap(), u32::MAX);
        assert_eq!(col_to_index("mwlqkwv").unwrap(), u32::MAX);
        assert!(matches!(col_to_index("MWLQKWW"), Err(MergeError::InvalidAddress(_))));
        assert!(matches!(col_to_index("AAAAAAAA"), Err(MergeError::InvalidAddress(_))));
    }

    #[test]
    fn test_roundtrip_engine_columns() {
        for i in 0..MAX_COLUMNS {
            assert_eq!(col_to_index(&index_to_col(i)).unwrap(), i, "roundtrip failed for {i}");
        }
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1").unwrap(), CellCoord::new(0, 0));
        assert_eq!(parse_cell_ref("b7").unwrap(), CellCoord::new(6, 1));
        assert_eq!(parse_cell_ref("AA100").unwrap(), CellCoord::new(99, 26));
        assert!(parse_cell_ref("A0").is_err());
        assert!(parse_cell_ref("A").is_err());
        assert!(parse_cell_ref("12").is_err());
        assert!(parse_cell_ref("A-1").is_err());
        assert!(parse_cell_ref("A1B").is_err());
    }

    #[test]
    fn test_parse_range() {
        let range = parse_range("A1:C10").unwrap();
        assert_eq!(range.start, CellCoord::new(0, 0));
        assert_eq!(range.end, CellCoord::new(9, 2));
        assert_eq!(range.row_span(), 10);
        assert_eq!(range.col_span(), 3);
        assert_eq!(range.to_string(), "A1:C10");
    }

    #[test]
    fn test_parse_range_rejects_reversed_and_malformed() {
        assert!(matches!(parse_range("A10:A1"), Err(MergeError::InvalidAddress(_))));
        assert!(matches!(parse_range("C1:A1"), Err(MergeError::InvalidAddress(_))));
        assert!(matches!(parse_range("A1"), Err(MergeError::InvalidAddress(_))));
        assert!(matches!(parse_range("A0:A3"), Err(MergeError::InvalidAddress(_))));
        assert!(matches!(parse_range(":A3"), Err(MergeError::InvalidAddress(_))));
    }

    #[test]
    fn test_single_cell_range() {
        let range: RangeSpec = "D4:D4".parse().unwrap();
        assert!(range.contains(CellCoord::new(3, 3)));
        assert!(!range.contains(CellCoord::new(3, 4)));
    }

    proptest! {
        #[test]
        fn prop_index_roundtrip(i in any::<u32>()) {
            prop_assert_eq!(col_to_index(&index_to_col(i)).unwrap(), i);
        }

        #[test]
        fn prop_letters_roundtrip(letters in "[A-Za-z]{1,5}") {
            let index = col_to_index(&letters).unwrap();
            prop_assert_eq!(index_to_col(index), letters.to_ascii_uppercase());
        }
    }
}
