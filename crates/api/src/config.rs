use std::str::FromStr;

use crate::auth::jwt::JwtConfig;

/// Errors raised while loading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long to wait for in-flight requests after a shutdown signal
    /// (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Interval between WebSocket pings (default: `30`).
    pub ws_heartbeat_interval_secs: u64,
    /// Deadline for a single WebSocket write (default: `10`).
    pub ws_write_timeout_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                    |
    /// |------------------------------|----------------------------|
    /// | `HOST`                       | `0.0.0.0`                  |
    /// | `PORT`                       | `8080`                     |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `30`                       |
    /// | `WS_HEARTBEAT_INTERVAL_SECS` | `30`                       |
    /// | `WS_WRITE_TIMEOUT_SECS`      | `10`                       |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = env_or("PORT", 8080u16)?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30)?,
            ws_heartbeat_interval_secs: positive(
                "WS_HEARTBEAT_INTERVAL_SECS",
                env_or("WS_HEARTBEAT_INTERVAL_SECS", 30)?,
            )?,
            ws_write_timeout_secs: positive(
                "WS_WRITE_TIMEOUT_SECS",
                env_or("WS_WRITE_TIMEOUT_SECS", 10)?,
            )?,
            jwt: JwtConfig::from_env()?,
        })
    }
}

/// Read and parse `var`, falling back to `default` when it is unset.
pub(crate) fn env_or<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            })
        }
        Err(_) => Ok(default),
    }
}

fn positive(var: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_values_name_the_variable() {
        std::env::set_var("POLYCHAT_TEST_PORT", "not-a-port");
        let err = env_or::<u16>("POLYCHAT_TEST_PORT", 1).unwrap_err();
        assert!(err.to_string().contains("POLYCHAT_TEST_PORT"));
        std::env::remove_var("POLYCHAT_TEST_PORT");
    }

    #[test]
    fn unset_values_use_the_default() {
        assert_eq!(env_or("POLYCHAT_TEST_UNSET_VAR", 42u64).unwrap(), 42);
    }

    #[test]
    fn zero_intervals_are_rejected() {
        assert!(positive("WS_WRITE_TIMEOUT_SECS", 0).is_err());
        assert_eq!(positive("WS_WRITE_TIMEOUT_SECS", 10).unwrap(), 10);
    }
}
