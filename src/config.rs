use crate::constants::*;
use crate::models::{Currency, HomeCurrencies};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: String,
    pub data_path: String,
    pub rate_staleness_hours: u64,
    pub rate_fetch_timeout_secs: u64,
    pub primary_rate_url: String,
    pub secondary_rate_url: String,
    pub party_a_name: String,
    pub party_b_name: String,
    pub homes: HomeCurrencies,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort(String),
    InvalidNumber(&'static str, String),
    InvalidCurrency(&'static str, String),
    InvalidPartyName(&'static str),
    DuplicatePartyName(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort(port) => {
                write!(f, "Invalid port number: {}", port)
            }
            ConfigError::InvalidNumber(var, value) => {
                write!(f, "{} must be a positive integer, got '{}'", var, value)
            }
            ConfigError::InvalidCurrency(var, value) => {
                write!(f, "{} is not a supported currency: '{}'", var, value)
            }
            ConfigError::InvalidPartyName(var) => {
                write!(f, "{} cannot be empty", var)
            }
            ConfigError::DuplicatePartyName(name) => {
                write!(f, "Both parties are named '{}'", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn positive_number(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::InvalidNumber(var, raw)),
        },
    }
}

fn currency(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: &str,
) -> Result<Currency, ConfigError> {
    let raw = lookup(var).unwrap_or_else(|| default.to_string());
    raw.parse()
        .map_err(|_| ConfigError::InvalidCurrency(var, raw.clone()))
}

fn party_name(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: &str,
) -> Result<String, ConfigError> {
    let name = lookup(var).unwrap_or_else(|| default.to_string());
    if name.trim().is_empty() {
        return Err(ConfigError::InvalidPartyName(var));
    }
    Ok(name.trim().to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("SERVER_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = lookup("SERVER_PORT").unwrap_or_else(|| DEFAULT_PORT.to_string());
        let data_path = lookup("DATA_PATH").unwrap_or_else(|| DEFAULT_DATA_PATH.to_string());

        // Validate port is a valid number
        if port.parse::<u16>().is_err() {
            return Err(ConfigError::InvalidPort(port));
        }

        let rate_staleness_hours = positive_number(
            &lookup,
            "RATE_STALENESS_HOURS",
            DEFAULT_RATE_STALENESS_HOURS,
        )?;
        let rate_fetch_timeout_secs = positive_number(
            &lookup,
            "RATE_FETCH_TIMEOUT_SECS",
            DEFAULT_RATE_FETCH_TIMEOUT_SECS,
        )?;

        let primary_rate_url =
            lookup("RATE_PRIMARY_URL").unwrap_or_else(|| DEFAULT_PRIMARY_RATE_URL.to_string());
        let secondary_rate_url =
            lookup("RATE_SECONDARY_URL").unwrap_or_else(|| DEFAULT_SECONDARY_RATE_URL.to_string());

        let homes = HomeCurrencies {
            party_a: currency(&lookup, "PARTY_A_HOME", DEFAULT_PARTY_A_HOME)?,
            party_b: currency(&lookup, "PARTY_B_HOME", DEFAULT_PARTY_B_HOME)?,
        };

        let party_a_name = party_name(&lookup, "PARTY_A_NAME", DEFAULT_PARTY_A_NAME)?;
        let party_b_name = party_name(&lookup, "PARTY_B_NAME", DEFAULT_PARTY_B_NAME)?;
        if party_a_name.eq_ignore_ascii_case(&party_b_name) {
            return Err(ConfigError::DuplicatePartyName(party_b_name));
        }

        Ok(Config {
            host,
            port,
            data_path,
            rate_staleness_hours,
            rate_fetch_timeout_secs,
            primary_rate_url,
            secondary_rate_url,
            party_a_name,
            party_b_name,
            homes,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ledger_path(&self) -> PathBuf {
        Path::new(&self.data_path).join(LEDGER_FILE_NAME)
    }

    pub fn rates_path(&self) -> PathBuf {
        Path::new(&self.data_path).join(RATES_FILE_NAME)
    }

    pub fn rate_staleness(&self) -> time::Duration {
        time::Duration::hours(self.rate_staleness_hours as i64)
    }

    pub fn rate_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.rate_fetch_timeout_secs)
    }
}
