use crate::payload::DEFAULT_MAX_PAYLOAD_BYTES;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5555";
pub const DEFAULT_UPDATE_PATH: &str = "/update";
pub const DEFAULT_PUSH_PATH: &str = "/ws/";
pub const DEFAULT_POLL_SECS: u64 = 10;
pub const DEFAULT_RECONNECT_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid server url '{url}': {reason}")]
    InvalidServer { url: String, reason: String },
    #[error("{name} must be an absolute path, got '{value}'")]
    RelativePath { name: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub server: Url,
    pub update_path: String,
    pub push_path: String,
    pub poll_interval: Duration,
    pub reconnect_delay: Duration,
    pub request_timeout: Duration,
    pub push_enabled: bool,
    pub max_payload_bytes: usize,
}

impl SyncConfig {
    pub fn new(server: Url) -> Self {
        Self {
            server,
            update_path: DEFAULT_UPDATE_PATH.to_string(),
            push_path: DEFAULT_PUSH_PATH.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            push_enabled: true,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.update_path.starts_with('/') {
            return Err(ConfigError::RelativePath {
                name: "update path",
                value: self.update_path.clone(),
            });
        }
        if !self.push_path.starts_with('/') {
            return Err(ConfigError::RelativePath {
                name: "push path",
                value: self.push_path.clone(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("poll interval"));
        }
        if self.reconnect_delay.is_zero() {
            return Err(ConfigError::ZeroDuration("reconnect delay"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("request timeout"));
        }
        Ok(())
    }

    pub fn update_url(&self) -> Result<Url, ConfigError> {
        self.server
            .join(&self.update_path)
            .map_err(|err| ConfigError::InvalidServer {
                url: self.server.to_string(),
                reason: err.to_string(),
            })
    }

    /// `ws://` for plain servers, `wss://` for secure ones. `None` when the
    /// server scheme has no push counterpart.
    pub fn push_url(&self) -> Option<Url> {
        let scheme = match self.server.scheme() {
            "http" => "ws",
            "https" => "wss",
            _ => return None,
        };
        let mut url = self.server.join(&self.push_path).ok()?;
        url.set_scheme(scheme).ok()?;
        Some(url)
    }

    pub fn push_supported(&self) -> bool {
        self.push_enabled && self.push_url().is_some()
    }
}

/// Accepts `host:port` shorthand as plain http.
pub fn parse_server_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    let url = Url::parse(&candidate).map_err(|err| ConfigError::InvalidServer {
        url: trimmed.to_string(),
        reason: err.to_string(),
    })?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ConfigError::InvalidServer {
            url: trimmed.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
