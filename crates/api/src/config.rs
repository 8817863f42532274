use std::str::FromStr;
use std::time::Duration;

use review_core::completion::DEFAULT_COMPLETION_CHANNEL;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. Without a
/// `DATABASE_URL` the server runs on in-memory backends with an embedded
/// worker, which is only meaningful as a single process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Not applied to the
    /// live-subscribe stream.
    pub request_timeout_secs: u64,
    /// How long to wait for background tasks after the listener closes.
    pub shutdown_timeout_secs: u64,
    /// PostgreSQL connection string; `None` selects in-memory backends.
    pub database_url: Option<String>,
    /// Lifetime of stored results (default: `1800`).
    pub result_ttl_secs: u64,
    /// Upper bound on a live-subscribe wait (default: `900`).
    pub subscribe_timeout_secs: u64,
    /// Completion bus channel name.
    pub completion_channel: String,
    /// Run a worker inside the API process.
    pub embedded_worker: bool,
    /// Interval between expired-result purges (default: `300`, must be
    /// positive).
    pub result_purge_interval_secs: u64,
    /// Work queue lease for claimed jobs (default: `300`).
    pub job_lease_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                    |
    /// |------------------------------|----------------------------|
    /// | `HOST`                       | `0.0.0.0`                  |
    /// | `PORT`                       | `3000`                     |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `30`                       |
    /// | `DATABASE_URL`               | unset                      |
    /// | `RESULT_TTL_SECS`            | `1800`                     |
    /// | `SUBSCRIBE_TIMEOUT_SECS`     | `900`                      |
    /// | `COMPLETION_CHANNEL`         | `contract_results`         |
    /// | `EMBEDDED_WORKER`            | `true` without a database  |
    /// | `RESULT_PURGE_INTERVAL_SECS` | `300`                      |
    /// | `JOB_LEASE_SECS`             | `300`                      |
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let embedded_worker = parse_env("EMBEDDED_WORKER", database_url.is_none())?;

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_env("PORT", 3000)?,
            cors_origins,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: parse_env("SHUTDOWN_TIMEOUT_SECS", 30)?,
            database_url,
            result_ttl_secs: parse_env("RESULT_TTL_SECS", 1800)?,
            subscribe_timeout_secs: parse_env("SUBSCRIBE_TIMEOUT_SECS", 900)?,
            completion_channel: std::env::var("COMPLETION_CHANNEL")
                .unwrap_or_else(|_| DEFAULT_COMPLETION_CHANNEL.into()),
            embedded_worker,
            result_purge_interval_secs: parse_nonzero_env("RESULT_PURGE_INTERVAL_SECS", 300)?,
            job_lease_secs: parse_env("JOB_LEASE_SECS", 300)?,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }

    pub fn subscribe_timeout(&self) -> Duration {
        Duration::from_secs(self.subscribe_timeout_secs)
    }

    pub fn result_purge_interval(&self) -> Duration {
        Duration::from_secs(self.result_purge_interval_secs)
    }

    pub fn job_lease(&self) -> Duration {
        Duration::from_secs(self.job_lease_secs)
    }
}

fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => parse_value(key, value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

/// Like [`parse_env`] for values that drive a timer interval, where zero
/// is rejected.
fn parse_nonzero_env(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(value) => parse_nonzero(key, value),
        Err(_) => Ok(default),
    }
}

fn parse_nonzero(key: &'static str, value: String) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_trimmed_values() {
        let port: u16 = parse_value("PORT", " 8080 ".into()).unwrap();
        assert_eq!(port, 8080);

        let flag: bool = parse_value("EMBEDDED_WORKER", "false".into()).unwrap();
        assert!(!flag);
    }

    #[test]
    fn invalid_value_names_the_key() {
        let err = parse_value::<u64>("RESULT_TTL_SECS", "soon".into()).unwrap_err();

        assert_matches!(err, ConfigError::Invalid { key: "RESULT_TTL_SECS", .. });
        assert_eq!(err.to_string(), "RESULT_TTL_SECS has an invalid value 'soon'");
    }

    #[test]
    fn zero_purge_interval_is_rejected() {
        let err = parse_nonzero("RESULT_PURGE_INTERVAL_SECS", "0".into()).unwrap_err();

        assert_matches!(err, ConfigError::Invalid { key: "RESULT_PURGE_INTERVAL_SECS", .. });
    }

    #[test]
    fn positive_purge_interval_is_accepted() {
        assert_eq!(parse_nonzero("RESULT_PURGE_INTERVAL_SECS", " 60 ".into()).unwrap(), 60);
        assert_matches!(
            parse_nonzero("RESULT_PURGE_INTERVAL_SECS", "-1".into()),
            Err(ConfigError::Invalid { .. })
        );
    }
}
