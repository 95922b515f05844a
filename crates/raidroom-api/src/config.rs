//! Server configuration read from the process environment.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use raidroom_oracle::OracleSettings;
use raidroom_oracle::client::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use raidroom_session::application::config::RoomConfig;

use crate::error::AppError;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3001;

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen host.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Oracle endpoint settings.
    pub oracle: OracleSettings,
    /// Room timing.
    pub room: RoomConfig,
    /// Optional YAML/JSON boss template overriding the built-in one.
    pub boss_template_path: Option<PathBuf>,
    /// OTLP collector endpoint; span export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns a variable's
    /// value or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("ORACLE_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("ORACLE_API_KEY environment variable must be set".to_string())
            })?;

        let oracle = OracleSettings {
            base_url: lookup("ORACLE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: lookup("ORACLE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };

        let defaults = RoomConfig::default();
        let turn_seconds: u32 = parse_or(&lookup, "TURN_SECONDS", defaults.turn_seconds)?;
        if turn_seconds == 0 {
            return Err(AppError::Config(
                "TURN_SECONDS must be greater than zero".to_string(),
            ));
        }
        let room = RoomConfig {
            turn_seconds,
            phase_pause: seconds_or(&lookup, "PHASE_PAUSE_SECS", defaults.phase_pause)?,
            reset_delay: seconds_or(&lookup, "RESET_DELAY_SECS", defaults.reset_delay)?,
            oracle_timeout: seconds_or(&lookup, "ORACLE_TIMEOUT_SECS", defaults.oracle_timeout)?,
            ..defaults
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            oracle,
            room,
            boss_template_path: lookup("BOSS_TEMPLATE_PATH").map(PathBuf::from),
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
                .filter(|endpoint| !endpoint.trim().is_empty()),
        })
    }

    /// The `host:port` listen address.
    #[must_use]
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, F>(lookup: &F, name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{name} must be a valid number: {e}"))),
        None => Ok(default),
    }
}

fn seconds_or<F>(lookup: &F, name: &str, default: Duration) -> Result<Duration, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, name, default.as_secs()).map(Duration::from_secs)
}
