//! Server configuration, read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Base URL daemons and agents use to reach the control plane.
    pub access_url: String,
    /// Quiet period after an acquire finds nothing. Zero disables it.
    pub acquire_debounce: Duration,
    pub git_auth_providers: Vec<String>,
    /// Whether the deployment is licensed for advanced template scheduling.
    pub schedule_entitled: bool,
    pub redis_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            access_url: "http://localhost:8080".to_string(),
            acquire_debounce: Duration::from_secs(1),
            git_auth_providers: Vec::new(),
            schedule_entitled: false,
            redis_url: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("PROVD_LISTEN_ADDR") {
            config.listen_addr = value
                .parse()
                .map_err(|e: std::net::AddrParseError| invalid("PROVD_LISTEN_ADDR", &value, e))?;
        }
        if let Some(value) = lookup("PROVD_ACCESS_URL") {
            config.access_url = value;
        }
        if let Some(value) = lookup("PROVD_ACQUIRE_DEBOUNCE_MS") {
            let ms: u64 = value
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid("PROVD_ACQUIRE_DEBOUNCE_MS", &value, e))?;
            config.acquire_debounce = Duration::from_millis(ms);
        }
        if let Some(value) = lookup("PROVD_GIT_AUTH_PROVIDERS") {
            config.git_auth_providers = value
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = lookup("PROVD_SCHEDULE_ENTITLED") {
            config.schedule_entitled = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => return Err(invalid("PROVD_SCHEDULE_ENTITLED", &value, "expected true or false")),
            };
        }
        config.redis_url = lookup("REDIS_URL").filter(|url| !url.is_empty());

        Ok(config)
    }

    pub fn with_access_url(mut self, url: impl Into<String>) -> Self {
        self.access_url = url.into();
        self
    }

    pub fn with_acquire_debounce(mut self, debounce: Duration) -> Self {
        self.acquire_debounce = debounce;
        self
    }

    pub fn with_git_auth_providers<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.git_auth_providers = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_schedule_entitled(mut self, entitled: bool) -> Self {
        self.schedule_entitled = entitled;
        self
    }
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
