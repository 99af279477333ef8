//! Runtime configuration: built-in defaults, then an optional YAML file
//! named by `MOTEL_CONFIG`, then `MOTEL_*` environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

pub const CONFIG_PATH_VAR: &str = "MOTEL_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub cors_origin: String,
    /// Where links in tenant notifications point
    pub client_base_url: String,
    pub utc_offset_hours: i32,
    pub scheduler_poll_secs: u64,
    pub scheduler_batch: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            database_url: "sqlite:motel.db".to_string(),
            cors_origin: "http://localhost:8080".to_string(),
            client_base_url: "http://localhost:8080".to_string(),
            utc_offset_hours: 7,
            scheduler_poll_secs: 5,
            scheduler_batch: 20,
        }
    }
}

impl AppConfig {
    /// Configuration for this process
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Defaults overlaid with the fields present in a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `MOTEL_*` overrides. Values that do not parse are logged and ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("MOTEL_BIND_ADDR") {
            self.bind_addr = value;
        }
        if let Some(value) = lookup("MOTEL_DATABASE_URL") {
            self.database_url = value;
        }
        if let Some(value) = lookup("MOTEL_CORS_ORIGIN") {
            self.cors_origin = value;
        }
        if let Some(value) = lookup("MOTEL_CLIENT_BASE_URL") {
            self.client_base_url = value;
        }
        override_parsed(&lookup, "MOTEL_UTC_OFFSET_HOURS", &mut self.utc_offset_hours);
        override_parsed(&lookup, "MOTEL_SCHEDULER_POLL_SECS", &mut self.scheduler_poll_secs);
        override_parsed(&lookup, "MOTEL_SCHEDULER_BATCH", &mut self.scheduler_batch);
    }
}

fn override_parsed<F, T>(lookup: &F, name: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(name) {
        match raw.trim().parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => warn!("Ignoring {}={:?}: not a valid value", name, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_yaml_file_overrides_some_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "bind_addr: 0.0.0.0:8000\nscheduler_batch: 50").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.scheduler_batch, 50);
        assert_eq!(config.database_url, "sqlite:motel.db");
        assert_eq!(config.utc_offset_hours, 7);
    }

    #[test]
    fn test_missing_or_broken_file_is_an_error() {
        assert!(AppConfig::from_file(Path::new("/nonexistent/motel.yaml")).is_err());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "scheduler_batch: [not, a, number]").unwrap();
        assert!(AppConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides_skip_invalid_numbers() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("MOTEL_DATABASE_URL", "sqlite::memory:"),
            ("MOTEL_UTC_OFFSET_HOURS", "8"),
            ("MOTEL_SCHEDULER_POLL_SECS", "soon"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.utc_offset_hours, 8);
        assert_eq!(config.scheduler_poll_secs, 5);
        assert_eq!(config.cors_origin, "http://localhost:8080");
    }
}
