use crate::error::{CliError, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileLoggingConfig {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileResourcesConfig {
    pub folder: Option<String>,
    #[serde(rename = "lookup-tables")]
    pub lookup_tables: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileExportConfig {
    pub sort: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileOptimizerConfig {
    #[serde(rename = "max-fanout")]
    pub max_fanout: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub logging: Option<FileLoggingConfig>,
    pub resources: Option<FileResourcesConfig>,
    pub export: Option<FileExportConfig>,
    pub optimizer: Option<FileOptimizerConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// `config.toml` in the per-user configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "pdkit", "pdkit").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
