use crate::domain::{CostingMethod, Decimal};
use std::collections::HashMap;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_addr: IpAddr,
    /// Used when a request does not name a costing method.
    pub default_costing_method: CostingMethod,
    /// Used when a request does not supply an expense rate.
    pub default_annual_expense_rate: Decimal,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::from([127, 0, 0, 1]),
            default_costing_method: CostingMethod::MovingAverage,
            default_annual_expense_rate: Decimal::ZERO,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let bind_addr = env_map
            .get("BIND_ADDR")
            .map(|s| s.as_str())
            .unwrap_or("127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "BIND_ADDR".to_string(),
                    "must be an IP address".to_string(),
                )
            })?;

        let default_costing_method = env_map
            .get("DEFAULT_COSTING_METHOD")
            .map(|s| s.as_str())
            .unwrap_or("moving_average")
            .parse::<CostingMethod>()
            .map_err(|e| ConfigError::InvalidValue("DEFAULT_COSTING_METHOD".to_string(), e))?;

        let default_annual_expense_rate = Decimal::from_str_canonical(
            env_map
                .get("DEFAULT_ANNUAL_EXPENSE_RATE")
                .map(|s| s.as_str())
                .unwrap_or("0"),
        )
        .map_err(|_| {
            ConfigError::InvalidValue(
                "DEFAULT_ANNUAL_EXPENSE_RATE".to_string(),
                "must be a decimal number".to_string(),
            )
        })?;

        if default_annual_expense_rate.is_negative() {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_ANNUAL_EXPENSE_RATE".to_string(),
                "must be non-negative".to_string(),
            ));
        }

        Ok(Config {
            port,
            bind_addr,
            default_costing_method,
            default_annual_expense_rate,
        })
    }
}
