use std::{fs, time::Duration};

use serde::Deserialize;

use crate::coordinator::FanOutConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    #[serde(default = "default_max_concurrent_meters")]
    pub max_concurrent_meters: usize,
    /// Per-meter record-source timeout; absent means wait indefinitely.
    pub meter_timeout_ms: Option<u64>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_meters: default_max_concurrent_meters(),
            meter_timeout_ms: None,
        }
    }
}

impl AggregationConfig {
    pub fn fan_out(&self) -> FanOutConfig {
        FanOutConfig {
            max_concurrent_meters: self.max_concurrent_meters,
            meter_timeout: self.meter_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_lot_pause_ms")]
    pub lot_pause_ms: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            lot_pause_ms: default_lot_pause_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub import: ImportConfig,
    pub metrics: Option<MetricsConfig>,
}

fn default_max_concurrent_meters() -> usize {
    16
}

fn default_batch_size() -> usize {
    4000
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_lot_pause_ms() -> u64 {
    500
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("CONSUMPTION_CONFIG").unwrap_or_else(|_| "consumption-config.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [database]
            uri = "postgres://localhost/power_consumption"
            max_connections = 4
            "#,
        )
        .unwrap();

        assert_eq!(cfg.database.max_connections, 4);
        assert_eq!(cfg.aggregation.max_concurrent_meters, 16);
        assert!(cfg.aggregation.fan_out().meter_timeout.is_none());
        assert_eq!(cfg.import.batch_size, 4000);
        assert_eq!(cfg.import.lot_pause_ms, 500);
        assert!(cfg.metrics.is_none());
    }

    #[test]
    fn full_config_round_trips_into_fan_out() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [database]
            uri = "postgres://db/power"
            max_connections = 10

            [aggregation]
            max_concurrent_meters = 4
            meter_timeout_ms = 1500

            [import]
            batch_size = 100
            max_retries = 3
            retry_backoff_ms = 10
            lot_pause_ms = 0

            [metrics]
            bind_addr = "127.0.0.1:9100"
            "#,
        )
        .unwrap();

        let fan_out = cfg.aggregation.fan_out();
        assert_eq!(fan_out.max_concurrent_meters, 4);
        assert_eq!(fan_out.meter_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(cfg.import.max_retries, 3);
        assert_eq!(cfg.metrics.unwrap().bind_addr, "127.0.0.1:9100");
    }

    #[test]
    fn missing_database_section_is_an_error() {
        assert!(AppConfig::from_toml_str("[aggregation]\nmax_concurrent_meters = 2\n").is_err());
    }
}
