// src/state.rs
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::errors::RideResult;
use crate::services::{
    my_rides_service::MyRidesService,
    ride_poller::RidePoller,
    rides_backend::{BackendConfig, HttpRidesBackend, RidesBackend},
    snapshot_cache::{CacheConfig, SnapshotCache},
};
use crate::utils::status_vocabulary::StatusVocabulary;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a positive number of seconds, got '{value}'")]
    InvalidSeconds { var: &'static str, value: String },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

pub struct AppState {
    pub my_rides_service: Arc<MyRidesService>,
    pub ride_poller: RidePoller,
    pub snapshot_cache: Arc<SnapshotCache>,
    pub config: AppConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub backend_base_url: String,
    pub backend_timeout: Duration,
    pub poll_interval: Duration,
    pub snapshot_ttl_seconds: u64,
    pub status_vocabulary_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            backend_base_url: "http://localhost:5000/api".to_string(),
            backend_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(10),
            snapshot_ttl_seconds: 300,
            status_vocabulary_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let text = |var: &'static str, default: String| -> Result<String, ConfigError> {
            match lookup(var) {
                Some(value) if value.trim().is_empty() => Err(ConfigError::Empty { var }),
                Some(value) => Ok(value.trim().to_string()),
                None => Ok(default),
            }
        };
        let seconds = |var: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(var) {
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or(ConfigError::InvalidSeconds { var, value }),
                None => Ok(default),
            }
        };

        Ok(Self {
            bind_addr: text("BIND_ADDR", defaults.bind_addr)?,
            backend_base_url: text("BACKEND_BASE_URL", defaults.backend_base_url)?,
            backend_timeout: Duration::from_secs(seconds(
                "BACKEND_TIMEOUT_SECS",
                defaults.backend_timeout.as_secs(),
            )?),
            poll_interval: Duration::from_secs(seconds(
                "POLL_INTERVAL_SECS",
                defaults.poll_interval.as_secs(),
            )?),
            snapshot_ttl_seconds: seconds("SNAPSHOT_TTL_SECS", defaults.snapshot_ttl_seconds)?,
            status_vocabulary_path: lookup("STATUS_VOCABULARY_PATH")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

impl AppState {
    pub fn new(config: AppConfig) -> RideResult<Self> {
        let vocabulary = match &config.status_vocabulary_path {
            Some(path) => StatusVocabulary::load(path)?,
            None => {
                tracing::info!("STATUS_VOCABULARY_PATH not set, using built-in status vocabulary");
                StatusVocabulary::builtin()
            }
        };

        let backend: Arc<dyn RidesBackend> = Arc::new(HttpRidesBackend::new(BackendConfig {
            base_url: config.backend_base_url.clone(),
            timeout: config.backend_timeout,
            ..Default::default()
        })?);

        Ok(Self::with_backend(config, backend, vocabulary))
    }

    pub fn with_backend(
        config: AppConfig,
        backend: Arc<dyn RidesBackend>,
        vocabulary: StatusVocabulary,
    ) -> Self {
        let snapshot_cache = Arc::new(SnapshotCache::new(CacheConfig {
            default_ttl_seconds: config.snapshot_ttl_seconds,
            enabled: true,
        }));

        let my_rides_service = Arc::new(MyRidesService::new(
            backend,
            snapshot_cache.clone(),
            Arc::new(vocabulary),
        ));
        let ride_poller = RidePoller::new(my_rides_service.clone(), config.poll_interval);

        Self {
            my_rides_service,
            ride_poller,
            snapshot_cache,
            config,
        }
    }
}
