//! Application-level configuration loading: admin allow-list, storage location and timings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{auth::StaticAdminList, dao::models::ExternalId};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_BUZZER_CONFIG_PATH";
/// Comma-separated admin ids merged into the configured allow-list.
const ADMIN_IDS_ENV: &str = "DEFAULT_ADMIN_IDS";
/// Snapshot location override; an empty value keeps everything in memory.
const DATA_PATH_ENV: &str = "DATA_PATH";
const DEFAULT_DATA_PATH: &str = "data/quiz-buzzer.json";
const DEFAULT_REGISTRATION_TTL: Duration = Duration::from_secs(600);
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    admin_ids: Vec<ExternalId>,
    data_path: Option<PathBuf>,
    registration_ttl: Duration,
    port: u16,
}

impl AppConfig {
    /// Load the configuration file, then apply environment overrides.
    pub fn load() -> Self {
        let path = resolve_config_path();
        Self::from_file(path).with_env(|key| env::var(key).ok())
    }

    fn from_file(path: PathBuf) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        admins = app_config.admin_ids.len(),
                        "loaded configuration file"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Apply overrides read through `lookup` (the process environment in production).
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ADMIN_IDS_ENV) {
            for id in parse_admin_ids(&raw) {
                if !self.admin_ids.contains(&id) {
                    self.admin_ids.push(id);
                }
            }
        }
        if let Some(raw) = lookup(DATA_PATH_ENV) {
            let trimmed = raw.trim();
            self.data_path = (!trimmed.is_empty()).then(|| PathBuf::from(trimmed));
        }
        if let Some(port) = lookup("PORT")
            .or_else(|| lookup("SERVER_PORT"))
            .and_then(|value| value.trim().parse::<u16>().ok())
        {
            self.port = port;
        }
        self
    }

    /// Ids allowed to run admin actions.
    pub fn admin_ids(&self) -> &[ExternalId] {
        &self.admin_ids
    }

    /// Allow-list built from [`Self::admin_ids`].
    pub fn admin_authority(&self) -> StaticAdminList {
        StaticAdminList::new(self.admin_ids.iter().copied())
    }

    /// Where the store snapshot lives; `None` keeps data in memory only.
    pub fn data_path(&self) -> Option<&PathBuf> {
        self.data_path.as_ref()
    }

    /// How long a started registration waits for the team name.
    pub fn registration_ttl(&self) -> Duration {
        self.registration_ttl
    }

    /// HTTP listening port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admin_ids: Vec::new(),
            data_path: Some(PathBuf::from(DEFAULT_DATA_PATH)),
            registration_ttl: DEFAULT_REGISTRATION_TTL,
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    admin_ids: Vec<ExternalId>,
    #[serde(default)]
    data_path: Option<PathBuf>,
    #[serde(default)]
    registration_ttl_secs: Option<u64>,
    #[serde(default)]
    port: Option<u16>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            admin_ids: value.admin_ids,
            data_path: value.data_path.or(defaults.data_path),
            registration_ttl: value
                .registration_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.registration_ttl),
            port: value.port.unwrap_or(defaults.port),
        }
    }
}

/// Parse a comma-separated list of ids, skipping blanks and logging invalid entries.
pub fn parse_admin_ids(raw: &str) -> Vec<ExternalId> {
    raw.split(',')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .filter_map(|chunk| match chunk.parse::<ExternalId>() {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(value = chunk, error = %err, "ignoring invalid admin id");
                None
            }
        })
        .collect()
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
