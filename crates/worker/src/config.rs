use std::str::FromStr;
use std::time::Duration;

use review_core::completion::DEFAULT_COMPLETION_CHANNEL;

use crate::WorkerSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Standalone worker configuration loaded from environment variables.
///
/// | Env Var                   | Default             |
/// |---------------------------|---------------------|
/// | `DATABASE_URL`            | (required)          |
/// | `COMPLETION_CHANNEL`      | `contract_results`  |
/// | `RESULT_TTL_SECS`         | `1800`              |
/// | `JOB_LEASE_SECS`          | `300`               |
/// | `WORKER_POLL_INTERVAL_MS` | `1000` (positive)   |
/// | `WORKER_NAME`             | `worker-<pid>`      |
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub completion_channel: String,
    pub result_ttl_secs: u64,
    pub job_lease_secs: u64,
    pub poll_interval_ms: u64,
    pub name: String,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            completion_channel: std::env::var("COMPLETION_CHANNEL")
                .unwrap_or_else(|_| DEFAULT_COMPLETION_CHANNEL.into()),
            result_ttl_secs: parse_env("RESULT_TTL_SECS", 1800)?,
            job_lease_secs: parse_env("JOB_LEASE_SECS", 300)?,
            poll_interval_ms: parse_nonzero_env("WORKER_POLL_INTERVAL_MS", 1000)?,
            name: std::env::var("WORKER_NAME")
                .unwrap_or_else(|_| format!("worker-{}", std::process::id())),
        })
    }

    pub fn job_lease(&self) -> Duration {
        Duration::from_secs(self.job_lease_secs)
    }

    pub fn settings(&self) -> WorkerSettings {
        WorkerSettings {
            name: self.name.clone(),
            result_ttl: Duration::from_secs(self.result_ttl_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => parse_value(key, value),
        Err(_) => Ok(default),
    }
}

fn parse_nonzero_env(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(value) => parse_nonzero(key, value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

/// Zero would make the claim loop's interval timer panic.
fn parse_nonzero(key: &'static str, value: String) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = parse_nonzero("WORKER_POLL_INTERVAL_MS", "0".into()).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { key: "WORKER_POLL_INTERVAL_MS", .. }));
        assert_eq!(err.to_string(), "WORKER_POLL_INTERVAL_MS has an invalid value '0'");
    }

    #[test]
    fn poll_interval_parses_trimmed_positive_values() {
        assert_eq!(parse_nonzero("WORKER_POLL_INTERVAL_MS", " 250 ".into()).unwrap(), 250);

        let lease: u64 = parse_value("JOB_LEASE_SECS", "60".into()).unwrap();
        assert_eq!(lease, 60);
    }
}
