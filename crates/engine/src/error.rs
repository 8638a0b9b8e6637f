use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// Malformed column letters, cell reference, or range text.
    InvalidAddress(String),
    /// Referenced sheet id is absent from the workbook.
    SheetNotFound(String),
    /// Destination column out of range, or source column unresolvable.
    InvalidMapping(String),
    /// Failure reported by the query executor, passed through verbatim.
    UpstreamQuery(String),
}

impl MergeError {
    /// Stable machine-readable name, used in error bodies and exit-code mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAddress(_) => "invalid_address",
            Self::SheetNotFound(_) => "sheet_not_found",
            Self::InvalidMapping(_) => "invalid_mapping",
            Self::UpstreamQuery(_) => "upstream_query",
        }
    }
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress(msg) => write!(f, "invalid address: {msg}"),
            Self::SheetNotFound(id) => write!(f, "sheet not found: {id}"),
            Self::InvalidMapping(msg) => write!(f, "invalid column mapping: {msg}"),
            // Upstream messages are shown to the user unchanged.
            Self::UpstreamQuery(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for MergeError {}

pub type Result<T> = std::result::Result<T, MergeError>;
