use dotenv::dotenv;
use std::env;
use thiserror::Error;

const INSTRUMENT: &str = "ORDERBOOK_INSTRUMENT";
const CAPACITY: &str = "ORDERBOOK_CAPACITY";
const LOG: &str = "ORDERBOOK_LOG";

const DEFAULT_INSTRUMENT: &str = "DEFAULT";
const DEFAULT_CAPACITY: usize = 1024;
const DEFAULT_LOG: &str = "info";

/// Errors raised while loading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to parse environment variable {key}: {value:?} is not a valid order capacity")]
    InvalidCapacity { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Symbol of the instrument the book trades, used to label logs.
    pub instrument: String,
    /// Resting orders the book can hold before its storage grows.
    pub order_capacity: usize,
    /// `tracing_subscriber::EnvFilter` directive for the binary.
    pub log_filter: String,
}

impl Config {
    /// Reads configuration from the process environment after loading any `.env` file.
    pub fn try_from_env() -> Result<Config, ConfigError> {
        // Load .env file
        dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from any key/value source; missing keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let instrument = lookup(INSTRUMENT)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_INSTRUMENT.to_string());

        let order_capacity = match lookup(CAPACITY) {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidCapacity { key: CAPACITY, value })?,
            None => DEFAULT_CAPACITY,
        };

        let log_filter = lookup(LOG).unwrap_or_else(|| DEFAULT_LOG.to_string());

        Ok(Config {
            instrument,
            order_capacity,
            log_filter,
        })
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            instrument: DEFAULT_INSTRUMENT.to_string(),
            order_capacity: DEFAULT_CAPACITY,
            log_filter: DEFAULT_LOG.to_string(),
        }
    }
}
