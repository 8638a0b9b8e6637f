//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Description                                        |
//! |------|----------------------------------------------------|
//! | 0    | Success                                            |
//! | 1    | General error (unspecified)                        |
//! | 2    | Usage error (bad args, bad config, bad request)    |
//! | 3    | Invalid address (column letters, cell ref, range)  |
//! | 4    | Sheet not found                                    |
//! | 5    | Invalid column mapping                             |
//! | 6    | Upstream query failure                             |
//! | 7    | File I/O (missing file, malformed snapshot/table)  |

use cellmerge_engine::MergeError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, invalid settings, malformed request body.
pub const EXIT_USAGE: u8 = 2;

/// Malformed column letters, cell reference, or range.
pub const EXIT_ADDRESS: u8 = 3;

/// Referenced sheet id is not in the workbook.
pub const EXIT_SHEET_NOT_FOUND: u8 = 4;

/// Destination column out of range, or source column unresolvable.
pub const EXIT_MAPPING: u8 = 5;

/// The data source reported a failure.
pub const EXIT_UPSTREAM: u8 = 6;

/// Reading or writing a file failed.
pub const EXIT_IO: u8 = 7;

/// Map a merge error to its exit code.
pub fn merge_exit_code(err: &MergeError) -> u8 {
    match err {
        MergeError::InvalidAddress(_) => EXIT_ADDRESS,
        MergeError::SheetNotFound(_) => EXIT_SHEET_NOT_FOUND,
        MergeError::InvalidMapping(_) => EXIT_MAPPING,
        MergeError::UpstreamQuery(_) => EXIT_UPSTREAM,
    }
}
