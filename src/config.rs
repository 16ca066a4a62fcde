use crate::api::bybit::format_number;
use crate::error::BotError;
use crate::Result;
use chrono::Duration;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Thresholds applied by the position guard
#[derive(Debug, Clone, PartialEq)]
pub struct GuardThresholds {
    /// Block all new orders once this many positions are open
    pub max_open_positions: usize,
    /// Minimum age of the existing position before another may be opened
    pub position_cooldown: Duration,
    /// Minimum time since the last close before a new position may be opened
    pub close_cooldown: Duration,
}

impl Default for GuardThresholds {
    fn default() -> Self {
        Self {
            max_open_positions: 2,
            position_cooldown: Duration::hours(3),
            close_cooldown: Duration::seconds(120),
        }
    }
}

/// Per-cycle trading parameters injected into the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSettings {
    pub symbol: String,
    pub quantity: f64,
    /// Exchange kline interval ("1", "5", "60", "D", ...)
    pub interval: String,
    /// Number of bars requested per cycle
    pub limit: usize,
    pub leverage: u32,
}

/// Which Bybit deployment the keys belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BybitEnvironment {
    /// Demo trading on the mainnet account (api-demo.bybit.com)
    #[default]
    Demo,
    Testnet,
    Mainnet,
}

impl FromStr for BybitEnvironment {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "demo" => Ok(BybitEnvironment::Demo),
            "testnet" => Ok(BybitEnvironment::Testnet),
            "mainnet" => Ok(BybitEnvironment::Mainnet),
            other => Err(BotError::Config(format!(
                "unknown BYBIT_ENV '{}', expected demo, testnet or mainnet",
                other
            ))),
        }
    }
}

impl fmt::Display for BybitEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BybitEnvironment::Demo => write!(f, "demo"),
            BybitEnvironment::Testnet => write!(f, "testnet"),
            BybitEnvironment::Mainnet => write!(f, "mainnet"),
        }
    }
}

#[derive(Clone)]
pub struct ExchangeCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeCredentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Fully validated bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub credentials: ExchangeCredentials,
    pub environment: BybitEnvironment,
    pub cycle: CycleSettings,
    pub guard: GuardThresholds,
    pub poll_interval: std::time::Duration,
}

/// Flat settings as they appear in the config file and environment
#[derive(Debug, Deserialize)]
struct RawSettings {
    bybit_api_key: Option<String>,
    bybit_api_secret: Option<String>,
    bybit_env: String,
    trading_symbol: String,
    trade_quantity: f64,
    trading_interval: String,
    trading_limit: usize,
    leverage: u32,
    poll_interval_secs: u64,
    max_open_positions: usize,
    position_cooldown_secs: i64,
    close_cooldown_secs: i64,
}

impl BotConfig {
    /// Load from defaults, an optional TOML file, then process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Same as [`BotConfig::load`] but reads variables from `env` instead of the process
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("bybit_env", "demo")?
            .set_default("trading_symbol", "BTCUSDT")?
            .set_default("trade_quantity", 0.03)?
            .set_default("trading_interval", "1")?
            .set_default("trading_limit", 100)?
            .set_default("leverage", 10)?
            .set_default("poll_interval_secs", 2)?
            .set_default("max_open_positions", 2)?
            .set_default("position_cooldown_secs", 3 * 3600)?
            .set_default("close_cooldown_secs", 120)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }

        let raw: RawSettings = builder
            .add_source(Environment::default().try_parsing(true).source(env))
            .build()?
            .try_deserialize()?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSettings) -> Result<Self> {
        let credentials = match (raw.bybit_api_key, raw.bybit_api_secret) {
            (Some(api_key), Some(api_secret))
                if !api_key.trim().is_empty() && !api_secret.trim().is_empty() =>
            {
                ExchangeCredentials {
                    api_key,
                    api_secret,
                }
            }
            _ => {
                return Err(BotError::Config(
                    "API keys not found. Set BYBIT_API_KEY and BYBIT_API_SECRET".to_string(),
                ))
            }
        };

        let config = Self {
            credentials,
            environment: raw.bybit_env.parse()?,
            cycle: CycleSettings {
                symbol: raw.trading_symbol.trim().to_uppercase(),
                quantity: raw.trade_quantity,
                interval: raw.trading_interval.trim().to_string(),
                limit: raw.trading_limit,
                leverage: raw.leverage,
            },
            guard: GuardThresholds {
                max_open_positions: raw.max_open_positions,
                position_cooldown: Duration::seconds(raw.position_cooldown_secs),
                close_cooldown: Duration::seconds(raw.close_cooldown_secs),
            },
            poll_interval: std::time::Duration::from_secs(raw.poll_interval_secs),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let cycle = &self.cycle;

        if cycle.symbol.is_empty() {
            return Err(BotError::Config("trading symbol is empty".to_string()));
        }
        if !cycle.quantity.is_finite() || cycle.quantity <= 0.0 {
            return Err(BotError::Config(format!(
                "trade quantity must be positive, got {}",
                cycle.quantity
            )));
        }
        if format_number(cycle.quantity) == "0" {
            return Err(BotError::Config(format!(
                "trade quantity {} rounds to zero at 8 decimal places",
                cycle.quantity
            )));
        }
        if cycle.interval.is_empty() {
            return Err(BotError::Config("trading interval is empty".to_string()));
        }
        if cycle.limit == 0 {
            return Err(BotError::Config("trading limit must be at least 1".to_string()));
        }
        if cycle.leverage == 0 {
            return Err(BotError::Config("leverage must be at least 1".to_string()));
        }
        if self.guard.max_open_positions == 0 {
            return Err(BotError::Config(
                "max open positions must be at least 1".to_string(),
            ));
        }
        if self.guard.position_cooldown < Duration::zero()
            || self.guard.close_cooldown < Duration::zero()
        {
            return Err(BotError::Config("cool-downs cannot be negative".to_string()));
        }
        if self.poll_interval.is_zero() {
            return Err(BotError::Config("poll interval must be non-zero".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn with_credentials(extra: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        let mut pairs = vec![("BYBIT_API_KEY", "key"), ("BYBIT_API_SECRET", "secret")];
        pairs.extend_from_slice(extra);
        env(&pairs)
    }

    #[test]
    fn test_defaults() {
        let config = BotConfig::load_with_env(None, with_credentials(&[])).unwrap();

        assert_eq!(config.cycle.symbol, "BTCUSDT");
        assert_eq!(config.cycle.quantity, 0.03);
        assert_eq!(config.cycle.interval, "1");
        assert_eq!(config.cycle.limit, 100);
        assert_eq!(config.cycle.leverage, 10);
        assert_eq!(config.guard, GuardThresholds::default());
        assert_eq!(config.poll_interval, std::time::Duration::from_secs(2));
        assert_eq!(config.environment, BybitEnvironment::Demo);
    }

    #[test]
    fn test_missing_credentials_is_fatal() {
        let result = BotConfig::load_with_env(None, env(&[("TRADING_SYMBOL", "ETHUSDT")]));
        assert!(matches!(result, Err(BotError::Config(msg)) if msg.contains("BYBIT_API_KEY")));
    }

    #[test]
    fn test_blank_secret_is_fatal() {
        let result = BotConfig::load_with_env(
            None,
            env(&[("BYBIT_API_KEY", "key"), ("BYBIT_API_SECRET", "  ")]),
        );
        assert!(matches!(result, Err(BotError::Config(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let config = BotConfig::load_with_env(
            None,
            with_credentials(&[
                ("TRADING_SYMBOL", "ethusdt"),
                ("TRADE_QUANTITY", "0.5"),
                ("TRADING_INTERVAL", "5"),
                ("TRADING_LIMIT", "200"),
                ("LEVERAGE", "3"),
                ("MAX_OPEN_POSITIONS", "1"),
                ("POSITION_COOLDOWN_SECS", "600"),
                ("CLOSE_COOLDOWN_SECS", "60"),
                ("BYBIT_ENV", "Mainnet"),
            ]),
        )
        .unwrap();

        assert_eq!(config.cycle.symbol, "ETHUSDT");
        assert_eq!(config.cycle.quantity, 0.5);
        assert_eq!(config.cycle.interval, "5");
        assert_eq!(config.cycle.limit, 200);
        assert_eq!(config.cycle.leverage, 3);
        assert_eq!(config.guard.max_open_positions, 1);
        assert_eq!(config.guard.position_cooldown, Duration::minutes(10));
        assert_eq!(config.guard.close_cooldown, Duration::seconds(60));
        assert_eq!(config.environment, BybitEnvironment::Mainnet);
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        let result = BotConfig::load_with_env(None, with_credentials(&[("TRADE_QUANTITY", "0")]));
        assert!(matches!(result, Err(BotError::Config(msg)) if msg.contains("quantity")));
    }

    #[test]
    fn test_rejects_quantity_that_rounds_to_zero() {
        let result =
            BotConfig::load_with_env(None, with_credentials(&[("TRADE_QUANTITY", "0.000000001")]));
        assert!(matches!(result, Err(BotError::Config(msg)) if msg.contains("rounds to zero")));

        let config =
            BotConfig::load_with_env(None, with_credentials(&[("TRADE_QUANTITY", "0.00000001")]))
                .unwrap();
        assert_eq!(config.cycle.quantity, 0.00000001);
    }

    #[test]
    fn test_environment_selector() {
        let config =
            BotConfig::load_with_env(None, with_credentials(&[("BYBIT_ENV", "testnet")])).unwrap();
        assert_eq!(config.environment, BybitEnvironment::Testnet);

        let result = BotConfig::load_with_env(None, with_credentials(&[("BYBIT_ENV", "paper")]));
        assert!(matches!(result, Err(BotError::Config(msg)) if msg.contains("BYBIT_ENV")));
    }

    #[test]
    fn test_rejects_zero_leverage() {
        let result = BotConfig::load_with_env(None, with_credentials(&[("LEVERAGE", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_credentials_are_redacted_in_debug() {
        let config = BotConfig::load_with_env(None, with_credentials(&[])).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret\""));
        assert!(printed.contains("<redacted>"));
    }
}
