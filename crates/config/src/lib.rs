// Configuration loading

pub mod settings;

pub use settings::{ConfigError, ConnectionConfig, ConnectionKind, MergeDefaults, Settings};
