use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::AppConfig;
use crate::cli::Cli;
use crate::error::{CliError, Result};
use crate::logging;
use pdkit::facade::FacadeConfigBuilder;
use std::path::PathBuf;

/// Merges command-line flags over the configuration file over the built-in defaults.
///
/// An explicit `--config` must exist; the per-user default file is optional.
pub fn build_config(cli: &Cli) -> Result<AppConfig> {
    let file_config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => match FileConfig::default_path() {
            Some(path) if path.is_file() => FileConfig::from_file(&path)?,
            _ => FileConfig::default(),
        },
    };
    merge(cli, file_config, DefaultsConfig::default())
}

fn merge(cli: &Cli, mut file_config: FileConfig, defaults: DefaultsConfig) -> Result<AppConfig> {
    let logging_file = file_config.logging.take().unwrap_or_default();
    let level_name = logging_file.level.unwrap_or(defaults.log_level);
    let configured = logging::parse_level(&level_name).ok_or_else(|| {
        CliError::Config(format!(
            "Unknown log level '{}'. Expected one of off, error, warn, info, debug, trace.",
            level_name
        ))
    })?;
    let log_level = logging::level_filter(cli.verbose, cli.quiet, configured);
    let log_file: Option<PathBuf> = cli.log_file.clone().or(logging_file.file);

    let resources = file_config.resources.take().unwrap_or_default();
    let export = file_config.export.take().unwrap_or_default();
    let optimizer = file_config.optimizer.take().unwrap_or_default();

    let facade = FacadeConfigBuilder::new()
        .resource_folder(resources.folder.unwrap_or(defaults.resource_folder))
        .lookup_tables(resources.lookup_tables.unwrap_or(defaults.lookup_tables))
        .max_fanout(optimizer.max_fanout.unwrap_or(defaults.max_fanout))
        .deterministic_exports(export.sort.unwrap_or(defaults.sort_exports))
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        log_level,
        log_file,
        facade,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tracing_subscriber::filter::LevelFilter;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn file(content: &str) -> FileConfig {
        FileConfig::from_toml(content).unwrap()
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let config = merge(&cli(&["pdkit", "commands"]), FileConfig::default(), DefaultsConfig::default())
            .unwrap();
        assert_eq!(config.log_level, LevelFilter::WARN);
        assert_eq!(config.log_file, None);
        assert_eq!(config.facade.resource_folder, "resources");
        assert_eq!(config.facade.max_fanout, 20);
        assert!(!config.facade.deterministic_exports);
    }

    #[test]
    fn file_values_override_defaults_and_flags_override_the_file() {
        let content = r#"
            [logging]
            level = "info"
            file = "from-file.log"
            [export]
            sort = true
            [optimizer]
            max-fanout = 8
        "#;
        let config = merge(&cli(&["pdkit", "commands"]), file(content), DefaultsConfig::default())
            .unwrap();
        assert_eq!(config.log_level, LevelFilter::INFO);
        assert_eq!(config.log_file, Some(PathBuf::from("from-file.log")));
        assert!(config.facade.deterministic_exports);
        assert_eq!(config.facade.max_fanout, 8);

        let flags = cli(&["pdkit", "-vv", "--log-file", "flag.log", "commands"]);
        let config = merge(&flags, file(content), DefaultsConfig::default()).unwrap();
        assert_eq!(config.log_level, LevelFilter::DEBUG);
        assert_eq!(config.log_file, Some(PathBuf::from("flag.log")));
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        let bad_level = merge(
            &cli(&["pdkit", "commands"]),
            file("[logging]\nlevel = \"loud\"\n"),
            DefaultsConfig::default(),
        );
        assert!(matches!(bad_level, Err(CliError::Config(_))));

        let bad_fanout = merge(
            &cli(&["pdkit", "commands"]),
            file("[optimizer]\nmax-fanout = 0\n"),
            DefaultsConfig::default(),
        );
        assert!(matches!(bad_fanout, Err(CliError::Config(_))));
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let args = cli(&["pdkit", "-c", missing.to_str().unwrap(), "commands"]);
        assert!(matches!(build_config(&args), Err(CliError::Io(_))));
    }
}
