use pdkit::facade::FacadeConfig;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug)]
pub struct AppConfig {
    pub log_level: LevelFilter,
    pub log_file: Option<PathBuf>,
    pub facade: FacadeConfig,
}
