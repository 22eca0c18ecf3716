use crate::error::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "obras.toml";
const ENV_PREFIX: &str = "OBRAS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub reports_dir: PathBuf,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("obras.db"),
            reports_dir: PathBuf::from("."),
            log_level: "info".to_string(),
        }
    }
}

/// Overrides coming from the command line; they win over file and env
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub reports_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// File (optional) → `OBRAS_*` environment → command line
pub fn load(overrides: Overrides) -> Result<AppConfig> {
    let config_path = overrides
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut settings = from_sources(&config_path, config::Environment::with_prefix(ENV_PREFIX))?;

    if let Some(database_path) = overrides.database_path {
        settings.database_path = database_path;
    }
    if let Some(reports_dir) = overrides.reports_dir {
        settings.reports_dir = reports_dir;
    }
    if let Some(log_level) = overrides.log_level {
        settings.log_level = log_level;
    }

    Ok(settings)
}

fn from_sources(config_path: &Path, env: config::Environment) -> Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from(config_path).required(false))
        .add_source(env)
        .build()?
        .try_deserialize()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::new()))
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = from_sources(&dir.path().join("missing.toml"), no_env()).unwrap();
        assert_eq!(settings, AppConfig::default());
    }

    #[test]
    fn test_file_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "database_path = \"/tmp/obras-test.db\"").unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();
        file.flush().unwrap();

        let settings = from_sources(file.path(), no_env()).unwrap();

        assert_eq!(settings.database_path, PathBuf::from("/tmp/obras-test.db"));
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.reports_dir, PathBuf::from("."));
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "reports_dir = \"desde-archivo\"").unwrap();
        file.flush().unwrap();

        let env = config::Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::from([(
            "OBRAS_REPORTS_DIR".to_string(),
            "desde-env".to_string(),
        )])));

        let settings = from_sources(file.path(), env).unwrap();
        assert_eq!(settings.reports_dir, PathBuf::from("desde-env"));
    }

    #[test]
    fn test_command_line_wins() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load(Overrides {
            config: Some(dir.path().join("missing.toml")),
            database_path: Some(PathBuf::from("cli.db")),
            reports_dir: None,
            log_level: Some("warn".to_string()),
        })
        .unwrap();

        assert_eq!(settings.database_path, PathBuf::from("cli.db"));
        assert_eq!(settings.log_level, "warn");
    }
}
