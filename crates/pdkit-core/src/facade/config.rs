use crate::engine::optimizer::DEFAULT_MAX_FANOUT;
use thiserror::Error;

pub const DEFAULT_RESOURCE_FOLDER: &str = "resources";
pub const DEFAULT_LOOKUP_TABLES: [&str; 2] = ["POWV9.dat", "POST9.dat"];

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for {parameter}: {reason}")]
    Invalid {
        parameter: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacadeConfig {
    /// Name of the folder holding the lookup tables, searched near the executable.
    pub resource_folder: String,
    /// Files that must all be present in the resource folder.
    pub lookup_tables: Vec<String>,
    pub max_fanout: usize,
    /// Whether `write_verilog` sorts its output when the command does not say.
    pub deterministic_exports: bool,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            resource_folder: DEFAULT_RESOURCE_FOLDER.to_string(),
            lookup_tables: DEFAULT_LOOKUP_TABLES.iter().map(|s| s.to_string()).collect(),
            max_fanout: DEFAULT_MAX_FANOUT,
            deterministic_exports: false,
        }
    }
}

impl FacadeConfig {
    /// Checks the values a hand-assembled config may get wrong.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resource_folder.is_empty() || self.resource_folder.contains('/') {
            return Err(ConfigError::Invalid {
                parameter: "resource_folder",
                reason: format!(
                    "'{}' must be a single, non-empty folder name",
                    self.resource_folder
                ),
            });
        }
        if self.lookup_tables.is_empty() {
            return Err(ConfigError::MissingParameter("lookup_tables"));
        }
        if let Some(bad) = self
            .lookup_tables
            .iter()
            .find(|f| f.is_empty() || f.contains('/'))
        {
            return Err(ConfigError::Invalid {
                parameter: "lookup_tables",
                reason: format!("'{}' is not a plain file name", bad),
            });
        }
        if self.max_fanout == 0 {
            return Err(ConfigError::Invalid {
                parameter: "max_fanout",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FacadeConfigBuilder {
    resource_folder: Option<String>,
    lookup_tables: Option<Vec<String>>,
    max_fanout: Option<usize>,
    deterministic_exports: Option<bool>,
}

impl FacadeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource_folder(mut self, folder: impl Into<String>) -> Self {
        self.resource_folder = Some(folder.into());
        self
    }
    pub fn lookup_tables(mut self, files: Vec<String>) -> Self {
        self.lookup_tables = Some(files);
        self
    }
    pub fn max_fanout(mut self, max: usize) -> Self {
        self.max_fanout = Some(max);
        self
    }
    pub fn deterministic_exports(mut self, sorted: bool) -> Self {
        self.deterministic_exports = Some(sorted);
        self
    }

    pub fn build(self) -> Result<FacadeConfig, ConfigError> {
        let defaults = FacadeConfig::default();
        let config = FacadeConfig {
            resource_folder: self.resource_folder.unwrap_or(defaults.resource_folder),
            lookup_tables: self.lookup_tables.unwrap_or(defaults.lookup_tables),
            max_fanout: self.max_fanout.unwrap_or(defaults.max_fanout),
            deterministic_exports: self
                .deterministic_exports
                .unwrap_or(defaults.deterministic_exports),
        };
        config.validate()?;
        Ok(config)
    }
}
