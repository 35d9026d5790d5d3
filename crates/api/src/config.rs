//! Runtime configuration.
//!
//! Layers, later wins:
//! 1. Defaults in code
//! 2. `config/<BOTICA_ENVIRONMENT>.toml` (optional)
//! 3. Environment variables, `BOTICA__` prefix and `__` separators
//!    (`BOTICA__SERVER__PORT=9000`, `BOTICA__PRICING__SCALES=sin_escala,6+1`)

use std::time::Duration;

use config::{Environment, File};
use serde::Deserialize;
use thiserror::Error;

use botica_pricing::{DEFAULT_SCALE_CODES, PricingError, ScaleTable};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("pricing.scales: {0}")]
    Scales(#[from] PricingError),

    #[error("{key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub pricing: PricingConfig,
    pub restock: RestockConfig,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Accepted scale codes, in display order.
    pub scales: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestockConfig {
    pub match_threshold: f64,
    pub suggester_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub max_conflict_retries: u32,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("BOTICA_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default(
                "pricing.scales",
                DEFAULT_SCALE_CODES
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>(),
            )?
            .set_default("restock.match_threshold", 0.75)?
            .set_default("restock.suggester_timeout_ms", 500)?
            .set_default("ledger.max_conflict_retries", 8)?
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(
                Environment::with_prefix("BOTICA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("pricing.scales"),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configuration the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scale_table()?;

        let threshold = self.restock.match_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid {
                key: "restock.match_threshold",
                reason: format!("must be within [0, 1], got {threshold}"),
            });
        }
        if self.restock.suggester_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "restock.suggester_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn scale_table(&self) -> Result<ScaleTable, ConfigError> {
        Ok(ScaleTable::from_codes(&self.pricing.scales)?)
    }

    pub fn suggester_timeout(&self) -> Duration {
        Duration::from_millis(self.restock.suggester_timeout_ms)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            pricing: PricingConfig {
                scales: DEFAULT_SCALE_CODES.iter().map(|c| c.to_string()).collect(),
            },
            restock: RestockConfig {
                match_threshold: 0.75,
                suggester_timeout_ms: 500,
            },
            ledger: LedgerConfig {
                max_conflict_retries: 8,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.scale_table().unwrap().plans().len(), DEFAULT_SCALE_CODES.len());
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn malformed_scale_fails_validation() {
        let mut config = Config::default();
        config.pricing.scales.push("10+x".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Scales(_))));
    }

    #[test]
    fn duplicate_scale_fails_validation() {
        let mut config = Config::default();
        config.pricing.scales.push("5+1".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Scales(_))));
    }

    #[test]
    fn threshold_and_timeout_are_checked() {
        let mut config = Config::default();
        config.restock.match_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "restock.match_threshold",
                ..
            })
        ));

        let mut config = Config::default();
        config.restock.suggester_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "restock.suggester_timeout_ms",
                ..
            })
        ));
    }
}
