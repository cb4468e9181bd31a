use pdkit::facade::config::{DEFAULT_LOOKUP_TABLES, DEFAULT_RESOURCE_FOLDER};
use pdkit::engine::optimizer::DEFAULT_MAX_FANOUT;

pub struct DefaultsConfig {
    pub log_level: String,
    pub resource_folder: String,
    pub lookup_tables: Vec<String>,
    pub max_fanout: usize,
    pub sort_exports: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            resource_folder: DEFAULT_RESOURCE_FOLDER.to_string(),
            lookup_tables: DEFAULT_LOOKUP_TABLES.iter().map(|s| s.to_string()).collect(),
            max_fanout: DEFAULT_MAX_FANOUT,
            sort_exports: false,
        }
    }
}
