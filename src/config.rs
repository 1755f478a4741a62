use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::Deserialize;

use crate::cache::CacheStore;
use crate::error::PrefetchError;

pub const DEFAULT_CONFIG_FILE: &str = "tts-prefetch.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Optional config file. Every key can also be set from the command line;
/// flags win over the file, the file wins over defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub refetch: Option<bool>,
    #[serde(default)]
    pub ignore_content_type: Option<bool>,
    #[serde(default)]
    pub dry_run: Option<bool>,
    #[serde(default)]
    pub gamedata_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    pub refetch: bool,
    pub ignore_content_type: bool,
    pub dry_run: bool,
    pub gamedata_dir: Utf8PathBuf,
    pub timeout: Duration,
    pub user_agent: String,
}

/// CLI-level settings layered on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub refetch: bool,
    pub ignore_content_type: bool,
    pub dry_run: bool,
    pub gamedata_dir: Option<Utf8PathBuf>,
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the config file. The default file is optional; an explicitly
    /// given path must exist.
    pub fn load(path: Option<&str>) -> Result<ConfigFile, PrefetchError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ConfigFile::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| PrefetchError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| PrefetchError::ConfigParse(err.to_string()))
    }

    pub fn resolve(
        config: ConfigFile,
        overrides: Overrides,
    ) -> Result<ResolvedOptions, PrefetchError> {
        let gamedata_dir = match overrides.gamedata_dir.or(config.gamedata_dir) {
            Some(dir) => dir,
            None => CacheStore::default_root()?,
        };
        let timeout_seconds = overrides
            .timeout_seconds
            .or(config.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let user_agent = overrides
            .user_agent
            .or(config.user_agent)
            .unwrap_or_else(default_user_agent);

        Ok(ResolvedOptions {
            refetch: overrides.refetch || config.refetch.unwrap_or(false),
            ignore_content_type: overrides.ignore_content_type
                || config.ignore_content_type.unwrap_or(false),
            dry_run: overrides.dry_run || config.dry_run.unwrap_or(false),
            gamedata_dir,
            timeout: Duration::from_secs(timeout_seconds),
            user_agent,
        })
    }
}

pub fn default_user_agent() -> String {
    format!("tts-prefetch/{}", env!("CARGO_PKG_VERSION"))
}
