// CSV/TSV tables: query results in, grid import/export

use std::io::Read;
use std::path::Path;

use cellmerge_engine::{CellValue, ResultRow, ResultSet, SparseGrid};
use serde_json::Number;

use crate::error::IoError;

/// Read a CSV file as a result set. The first record names the columns.
pub fn read_result_set(path: &Path) -> Result<ResultSet, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    result_set_from_str(&content, delimiter)
}

pub fn result_set_from_str(content: &str, delimiter: u8) -> Result<ResultSet, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        // Short records read as trailing nulls; extra fields are dropped.
        let values = (0..columns.len())
            .map(|i| record.get(i).and_then(type_field))
            .collect();
        rows.push(ResultRow::new(values));
    }

    Ok(ResultSet::new(columns, rows))
}

/// Import a CSV file into a sparse grid, one record per row. Empty fields
/// leave no cell.
pub fn import_grid(path: &Path) -> Result<SparseGrid, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows: Vec<Vec<Option<CellValue>>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(type_field).collect());
    }

    Ok(SparseGrid::from_rows(&rows))
}

/// Write the grid's populated extent as CSV. Rows with no cells are written
/// as empty records so row positions survive.
pub fn export_grid(grid: &SparseGrid, path: &Path, delimiter: u8) -> Result<(), IoError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    for row in grid.to_rows() {
        let record: Vec<String> = row
            .iter()
            .map(|v| v.as_ref().map(CellValue::raw_display).unwrap_or_default())
            .collect();
        if record.is_empty() {
            writer.write_record([""])?;
        } else {
            writer.write_record(&record)?;
        }
    }

    writer.flush().map_err(|e| IoError::file(path, e))?;
    Ok(())
}

/// Type a raw CSV field. Empty is null; integers, decimals and booleans are
/// typed; everything else is text. Integers with a leading zero (`"007"`)
/// stay text.
pub fn type_field(field: &str) -> Option<CellValue> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.eq_ignore_ascii_case("true") {
        return Some(CellValue::Bool(true));
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Some(CellValue::Bool(false));
    }

    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let leading_zero = digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.");
    if !leading_zero {
        if let Ok(i) = trimmed.parse::<i64>() {
            return Some(CellValue::Number(Number::from(i)));
        }
        if digits.starts_with(|c: char| c.is_ascii_digit()) {
            if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
                return Some(CellValue::Number(n));
            }
        }
    }

    Some(CellValue::Text(field.to_string()))
}

const DELIMITER_CANDIDATES: [u8; 4] = [b'\t', b';', b',', b'|'];

/// Guess the delimiter of a table from its first ten lines. Falls back to `,`.
///
/// A candidate must split the header into at least two fields. It scores the
/// header's field count times the number of sampled lines with that count;
/// ties go to the earlier candidate in `DELIMITER_CANDIDATES`.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content.lines().take(10).collect();

    let mut best = (b',', 0usize);
    for delim in DELIMITER_CANDIDATES {
        let widths: Vec<usize> = sample.iter().map(|line| field_count(line, delim)).collect();
        let header = match widths.first() {
            Some(&n) if n > 1 => n,
            _ => continue,
        };
        let score = header * widths.iter().filter(|&&n| n == header).count();
        if score > best.1 {
            best = (delim, score);
        }
    }
    best.0
}

/// Fields on one line, honoring quotes. Unparseable lines count as one field.
fn field_count(line: &str, delimiter: u8) -> usize {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    match reader.records().next() {
        Some(Ok(record)) => record.len(),
        _ => 1,
    }
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path).map_err(|e| IoError::file(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| IoError::file(path, e))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            log::debug!("{} is not UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
            Ok(decoded.into_owned())
        }
    }
}
