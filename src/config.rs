use serde::Deserialize;
use std::time::Duration;

use crate::settlement::SweepScheduleConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub sweep_enabled: bool,
    pub sweep_interval_secs: u64,
    pub request_timeout_secs: u64,
    /// Comma separated; empty allows any origin
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::default().try_parsing(true))
    }

    fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .set_default("bind_address", "0.0.0.0:8080")?
            .set_default("db_max_connections", 20)?
            .set_default("db_min_connections", 2)?
            .set_default("db_acquire_timeout_secs", 30)?
            .set_default("sweep_enabled", true)?
            .set_default("sweep_interval_secs", 300)?
            .set_default("request_timeout_secs", 30)?
            .set_default("cors_allowed_origins", "")?
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    pub fn sweep_schedule(&self) -> SweepScheduleConfig {
        SweepScheduleConfig {
            enabled: self.sweep_enabled,
            interval: Duration::from_secs(self.sweep_interval_secs.max(1)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect()
    }
}
