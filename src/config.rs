use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::constants;

// Environment variable names. The API key keeps the name the hosted service's
// own tooling expects; everything app-specific is prefixed with SALUS_.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const API_BASE_URL_VAR: &str = "SALUS_API_BASE_URL";
pub const MODEL_VAR: &str = "SALUS_MODEL";
pub const POLL_DEADLINE_SECS_VAR: &str = "SALUS_POLL_DEADLINE_SECS";
pub const POLL_INTERVAL_MS_VAR: &str = "SALUS_POLL_INTERVAL_MS";
pub const POLL_MAX_INTERVAL_MS_VAR: &str = "SALUS_POLL_MAX_INTERVAL_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set; export it or add it to a .env file")]
    MissingKey(&'static str),
    #[error("{name} must be a positive integer, got `{value}`")]
    InvalidNumber { name: &'static str, value: String },
}

/// How the turn executor waits on a remote run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Give up on a run that has not reached a terminal status by this point.
    pub deadline: Duration,
    /// Delay before the second status check; doubles on each subsequent check.
    pub initial_interval: Duration,
    /// Upper bound on the backoff delay.
    pub max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(60),
            initial_interval: Duration::from_millis(200),
            max_interval: Duration::from_secs(2),
        }
    }
}

/// Runtime configuration, read from the environment with defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base_url: String,
    pub model: String,
    pub poll: PollPolicy,
}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Same as [`Config::from_env`], but with an explicit variable source so
    /// tests don't have to mutate the process environment.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingKey(API_KEY_VAR))?;

        let api_base_url = lookup(API_BASE_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| constants::DEFAULT_API_BASE_URL.to_string());

        let model = lookup(MODEL_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| constants::DEFAULT_MODEL.to_string());

        let defaults = PollPolicy::default();
        let poll = PollPolicy {
            deadline: parse_duration(&lookup, POLL_DEADLINE_SECS_VAR, Duration::from_secs)?
                .unwrap_or(defaults.deadline),
            initial_interval: parse_duration(&lookup, POLL_INTERVAL_MS_VAR, Duration::from_millis)?
                .unwrap_or(defaults.initial_interval),
            max_interval: parse_duration(&lookup, POLL_MAX_INTERVAL_MS_VAR, Duration::from_millis)?
                .unwrap_or(defaults.max_interval),
        };

        Ok(Self {
            api_key,
            api_base_url,
            model,
            poll,
        })
    }
}

fn parse_duration<F>(
    lookup: &F,
    name: &'static str,
    to_duration: fn(u64) -> Duration,
) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => {
            let parsed = value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber {
                    name,
                    value: value.clone(),
                })?;
            if parsed == 0 {
                return Err(ConfigError::InvalidNumber { name, value });
            }
            Ok(Some(to_duration(parsed)))
        }
    }
}
