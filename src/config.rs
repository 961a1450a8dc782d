//! Layered configuration: defaults < TOML file < environment < command line.
//!
//! The file is the first existing one of: an explicit path, `$CATALOG_CONFIG`,
//! `<user config dir>/catalog.toml`, `./catalog.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "catalog.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Names of the collections the repositories work on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionNames {
    pub videos: String,
    pub channels: String,
    pub admin_channels: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self { videos: "video".into(), channels: "channel".into(), admin_channels: "adm_channel".into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub dir: Option<PathBuf>,
    pub level: Option<String>,
    pub retention: Option<u32>,
    /// A log4rs YAML file; replaces the built-in rolling setup when present.
    pub config: Option<PathBuf>,
}

impl LogSettings {
    /// Where the rolling logs go. A level without a directory still logs, under
    /// [`default_log_dir`]; with neither set logging stays off.
    pub fn effective_dir(&self) -> Option<PathBuf> {
        match (&self.dir, &self.level) {
            (Some(dir), _) => Some(dir.clone()),
            (None, Some(_)) => Some(default_log_dir()),
            (None, None) => None,
        }
    }
}

/// `<user data dir>/catalog/logs`, or `./logs` when the platform has none.
pub fn default_log_dir() -> PathBuf {
    dirs_next::data_local_dir().map_or_else(|| PathBuf::from("logs"), |d| d.join("catalog").join("logs"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Snapshot file backing the store. `None` keeps everything in memory.
    pub store_path: Option<PathBuf>,
    pub default_limit: u64,
    pub collections: CollectionNames,
    pub log: LogSettings,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { store_path: None, default_limit: 10, collections: CollectionNames::default(), log: LogSettings::default() }
    }
}

/// Overrides taken from the command line; `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub store_path: Option<PathBuf>,
    pub default_limit: Option<u64>,
    pub log_level: Option<String>,
}

impl CatalogConfig {
    /// Load from the process environment and the usual file locations.
    ///
    /// # Errors
    /// Fails when a config file exists but cannot be read or parsed, or an
    /// environment override holds an invalid value.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(explicit, |key| std::env::var(key).ok())
    }

    /// Like [`CatalogConfig::load`] with a custom environment lookup.
    ///
    /// # Errors
    /// See [`CatalogConfig::load`].
    pub fn load_with<F>(explicit: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match explicit {
            // an explicit path must exist
            Some(p) => Self::from_file(p)?,
            None => match candidate_paths(&env).into_iter().find(|p| p.is_file()) {
                Some(p) => Self::from_file(&p)?,
                None => Self::default(),
            },
        };
        cfg.apply_env(&env)?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns an error if `path` cannot be read or is not valid TOML for this layout.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let cfg = toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        log::debug!("loaded config from {}", path.display());
        Ok(cfg)
    }

    fn apply_env<F>(&mut self, env: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(s) = env("CATALOG_STORE").filter(|s| !s.is_empty()) {
            self.store_path = Some(PathBuf::from(s));
        }
        if let Some(s) = env("CATALOG_DEFAULT_LIMIT") {
            self.default_limit = parse_limit("CATALOG_DEFAULT_LIMIT", &s)?;
        }
        if let Some(s) = env("CATALOG_VIDEO_COLLECTION").filter(|s| !s.is_empty()) {
            self.collections.videos = s;
        }
        if let Some(s) = env("CATALOG_CHANNEL_COLLECTION").filter(|s| !s.is_empty()) {
            self.collections.channels = s;
        }
        if let Some(s) = env("CATALOG_LOG_DIR") {
            self.log.dir = Some(PathBuf::from(s));
        }
        if let Some(s) = env("CATALOG_LOG_LEVEL") {
            self.log.level = Some(s);
        }
        if let Some(s) = env("CATALOG_LOG_RETENTION") {
            let n = s.trim().parse().map_err(|_| ConfigError::InvalidValue { key: "CATALOG_LOG_RETENTION", value: s.clone() })?;
            self.log.retention = Some(n);
        }
        if let Some(s) = env("CATALOG_LOG_CONFIG") {
            self.log.config = Some(PathBuf::from(s));
        }
        Ok(())
    }

    /// Apply the command-line layer.
    ///
    /// # Errors
    /// `InvalidValue` for a zero page limit.
    pub fn apply_cli(&mut self, cli: &CliOverrides) -> Result<(), ConfigError> {
        if let Some(p) = &cli.store_path {
            self.store_path = Some(p.clone());
        }
        if let Some(limit) = cli.default_limit {
            if limit == 0 {
                return Err(ConfigError::InvalidValue { key: "limit", value: "0".into() });
            }
            self.default_limit = limit;
        }
        if let Some(level) = &cli.log_level {
            self.log.level = Some(level.clone());
        }
        Ok(())
    }
}

fn parse_limit(key: &'static str, s: &str) -> Result<u64, ConfigError> {
    match s.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue { key, value: s.to_string() }),
    }
}

fn candidate_paths<F>(env: &F) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let mut paths = Vec::new();
    if let Some(p) = env("CATALOG_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Some(dir) = dirs_next::config_dir() {
        paths.push(dir.join(CONFIG_FILE_NAME));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join(CONFIG_FILE_NAME));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |k| map.get(k).cloned()
    }

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "default_limit = 25\n[collections]\nvideos = \"videos_v2\"\n");
        let cfg = CatalogConfig::load_with(Some(path.as_path()), env_of(&[])).unwrap();
        assert_eq!(cfg.default_limit, 25);
        assert_eq!(cfg.collections.videos, "videos_v2");
        assert_eq!(cfg.collections.channels, "channel");
    }

    #[test]
    fn precedence_is_cli_then_env_then_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "store_path = \"from-file.bson\"\ndefault_limit = 25\n");
        let env = env_of(&[("CATALOG_STORE", "from-env.bson"), ("CATALOG_DEFAULT_LIMIT", "40")]);
        let mut cfg = CatalogConfig::load_with(Some(path.as_path()), env).unwrap();
        assert_eq!(cfg.store_path.as_deref(), Some(Path::new("from-env.bson")));
        assert_eq!(cfg.default_limit, 40);

        cfg.apply_cli(&CliOverrides { store_path: Some("from-cli.bson".into()), ..CliOverrides::default() })
            .unwrap();
        assert_eq!(cfg.store_path.as_deref(), Some(Path::new("from-cli.bson")));
        assert_eq!(cfg.default_limit, 40);
    }

    #[test]
    fn config_env_var_points_at_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "default_limit = 5\n");
        let env = env_of(&[("CATALOG_CONFIG", path.to_str().unwrap())]);
        assert_eq!(CatalogConfig::load_with(None, env).unwrap().default_limit, 5);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CatalogConfig::load_with(Some(dir.path().join("absent.toml").as_path()), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn zero_limit_is_rejected_everywhere() {
        let err = CatalogConfig::load_with(None, env_of(&[("CATALOG_CONFIG", "/nonexistent/catalog.toml"), ("CATALOG_DEFAULT_LIMIT", "0")]));
        assert!(matches!(err, Err(ConfigError::InvalidValue { .. })));
        let mut cfg = CatalogConfig::default();
        assert!(cfg.apply_cli(&CliOverrides { default_limit: Some(0), ..CliOverrides::default() }).is_err());
    }

    #[test]
    fn log_level_alone_turns_on_default_directory() {
        let mut cfg = CatalogConfig::default();
        assert_eq!(cfg.log.effective_dir(), None);
        cfg.apply_cli(&CliOverrides { log_level: Some("debug".into()), ..CliOverrides::default() }).unwrap();
        assert_eq!(cfg.log.effective_dir(), Some(default_log_dir()));
        cfg.log.dir = Some(PathBuf::from("/var/log/catalog"));
        assert_eq!(cfg.log.effective_dir(), Some(PathBuf::from("/var/log/catalog")));
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "default_limit = \"many\"\n");
        match CatalogConfig::load_with(Some(path.as_path()), env_of(&[])) {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected {other:?}"),
        }
    }
}
