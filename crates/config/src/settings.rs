use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cellmerge_engine::{GrowthPolicy, MergeSettings, MAX_COLUMNS};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse(String),
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Parse(msg) => write!(f, "settings parse error: {msg}"),
            Self::Validation(msg) => write!(f, "invalid settings: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Merge defaults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeDefaults {
    pub row_margin: u32,
    pub column_margin: u32,
    pub default_row_count: u32,
    pub default_column_count: u32,
    pub max_columns: u32,
}

impl Default for MergeDefaults {
    fn default() -> Self {
        let growth = GrowthPolicy::default();
        Self {
            row_margin: growth.row_margin,
            column_margin: growth.column_margin,
            default_row_count: growth.default_row_count,
            default_column_count: growth.default_column_count,
            max_columns: MAX_COLUMNS,
        }
    }
}

impl MergeDefaults {
    pub fn merge_settings(&self) -> MergeSettings {
        MergeSettings {
            growth: GrowthPolicy {
                row_margin: self.row_margin,
                column_margin: self.column_margin,
                default_row_count: self.default_row_count,
                default_column_count: self.default_column_count,
            },
            max_columns: self.max_columns,
        }
    }
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Csv,
    Json,
}

impl ConnectionKind {
    /// File extension of the tables this connection serves.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A named data source: a directory of `<table>.<ext>` files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub id: String,
    pub kind: ConnectionKind,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ConnectionConfig {
    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub merge: MergeDefaults,
    pub connections: Vec<ConnectionConfig>,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cellmerge")
            .join("settings.toml")
    }

    /// Load the default settings file, falling back to defaults when it is
    /// missing or unusable. Problems are logged, not returned.
    pub fn load_or_default() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::from_path(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Load an explicit settings file. Any failure is an error.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_toml(&contents)?;

        // Relative connection paths are relative to the settings file.
        if let Some(base) = path.parent() {
            for conn in &mut settings.connections {
                if conn.path.is_relative() {
                    conn.path = base.join(&conn.path);
                }
            }
        }

        log::info!(
            "loaded settings from {} ({} connections)",
            path.display(),
            settings.connections.len()
        );
        Ok(settings)
    }

    /// Parse from TOML and validate.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.merge.max_columns == 0 {
            return Err(ConfigError::Validation("merge.max_columns must be greater than 0".into()));
        }

        for (i, conn) in self.connections.iter().enumerate() {
            if conn.id.trim().is_empty() {
                return Err(ConfigError::Validation(format!("connection #{} has an empty id", i + 1)));
            }
            if conn.path.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "connection '{}' has an empty path",
                    conn.id
                )));
            }
            if self.connections[..i].iter().any(|c| c.id == conn.id) {
                return Err(ConfigError::Validation(format!(
                    "duplicate connection id '{}'",
                    conn.id
                )));
            }
        }

        Ok(())
    }

    pub fn connection(&self, id: &str) -> Option<&ConnectionConfig> {
        self.connections.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());

        let merge = settings.merge.merge_settings();
        assert_eq!(merge.growth.row_margin, 100);
        assert_eq!(merge.growth.column_margin, 10);
        assert_eq!(merge.growth.default_row_count, 1000);
        assert_eq!(merge.growth.default_column_count, 20);
        assert_eq!(merge.max_columns, 16_384);
    }

    #[test]
    fn test_parse_full() {
        let settings = Settings::from_toml(
            r#"
[merge]
row_margin = 5
max_columns = 100

[[connections]]
id = "sales"
kind = "csv"
path = "/data/sales"
name = "Sales exports"

[[connections]]
id = "crm"
kind = "json"
path = "/data/crm"
"#,
        )
        .unwrap();

        assert_eq!(settings.merge.row_margin, 5);
        assert_eq!(settings.merge.column_margin, 10);
        assert_eq!(settings.merge.max_columns, 100);
        assert_eq!(settings.connections.len(), 2);
        assert_eq!(settings.connection("sales").unwrap().display_name(), "Sales exports");
        assert_eq!(settings.connection("crm").unwrap().display_name(), "crm");
        assert_eq!(settings.connection("crm").unwrap().kind, ConnectionKind::Json);
        assert!(settings.connection("nope").is_none());
    }

    #[test]
    fn test_validation_errors() {
        let dup = r#"
[[connections]]
id = "a"
kind = "csv"
path = "/x"

[[connections]]
id = "a"
kind = "json"
path = "/y"
"#;
        assert!(matches!(Settings::from_toml(dup), Err(ConfigError::Validation(_))));

        let empty_path = "[[connections]]\nid = \"a\"\nkind = \"csv\"\npath = \"\"\n";
        assert!(matches!(Settings::from_toml(empty_path), Err(ConfigError::Validation(_))));

        assert!(matches!(
            Settings::from_toml("[merge]\nmax_columns = 0\n"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            Settings::from_toml("[[connections]]\nid = \"a\"\nkind = \"xlsx\"\npath = \"/x\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_path_resolves_relative_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[[connections]]\nid = \"local\"\nkind = \"csv\"\npath = \"data\"\n").unwrap();

        let settings = Settings::from_path(&path).unwrap();
        assert_eq!(settings.connections[0].path, dir.path().join("data"));
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::from_path(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
