// File I/O operations

pub mod csv;
pub mod error;
pub mod executor;
pub mod json;

pub use error::IoError;
pub use executor::{parse_query, FileExecutor, TableQuery};
pub use json::{read_snapshot, write_snapshot};
