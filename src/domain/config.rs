use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for a records directory.
///
/// Stored as `config.toml` in the data directory. Every field has a default,
/// so a missing or empty file yields [`Config::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Prefix of exported backup file names.
    ///
    /// Backups are named `<prefix>_Backup_<YYYY-MM-DD>.json`.
    export_prefix: String,

    /// File name of the auto-saved snapshot, relative to the data directory.
    snapshot_file: String,

    /// Whether to populate an empty data directory with the seed dataset on
    /// first use.
    pub seed_on_first_run: bool,

    /// Address that expiry alert emails are composed for.
    pub alert_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            export_prefix: default_export_prefix(),
            snapshot_file: default_snapshot_file(),
            seed_on_first_run: true,
            alert_email: None,
        }
    }
}

/// Error returned when a configuration file cannot be read or written.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read or written.
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid configuration TOML.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads the configuration, falling back to the defaults if the file is
    /// missing or invalid.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::debug!("Failed to load config from {}: {e}", path.display());
            Self::default()
        })
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the prefix used for exported backup file names.
    #[must_use]
    pub fn export_prefix(&self) -> &str {
        &self.export_prefix
    }

    /// Sets the export prefix. Blank prefixes are ignored.
    ///
    /// Returns `true` if the prefix was changed.
    pub fn set_export_prefix(&mut self, prefix: &str) -> bool {
        let prefix = prefix.trim();
        if prefix.is_empty() || prefix == self.export_prefix {
            false
        } else {
            self.export_prefix = prefix.to_string();
            true
        }
    }

    /// Returns the snapshot file name.
    #[must_use]
    pub fn snapshot_file(&self) -> &str {
        &self.snapshot_file
    }
}

fn default_export_prefix() -> String {
    "SAHER".to_string()
}

fn default_snapshot_file() -> String {
    "records.json".to_string()
}

const fn default_true() -> bool {
    true
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_export_prefix")]
        export_prefix: String,

        #[serde(default = "default_snapshot_file")]
        snapshot_file: String,

        #[serde(default = "default_true")]
        seed_on_first_run: bool,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        alert_email: Option<String>,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                export_prefix,
                snapshot_file,
                seed_on_first_run,
                alert_email,
            } => Self {
                export_prefix,
                snapshot_file,
                seed_on_first_run,
                alert_email,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            export_prefix: config.export_prefix,
            snapshot_file: config.snapshot_file,
            seed_on_first_run: config.seed_on_first_run,
            alert_email: config.alert_email,
        }
    }
}
