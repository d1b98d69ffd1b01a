//! # Client Configuration Module
//!
//! Provides configuration management for the storage client.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a frozen
//! `ClientConfig` instance holding the settings shared by every call a client
//! creates. It enforces fail-fast validation so that a malformed host or a
//! zero timeout is reported when the client is built rather than on the
//! first request.
//!
//! Runtime dependencies (transport, callback executor, runtime handle) are
//! not part of this struct; they are injected through the client builder.
//!
//! ## Defaults
//!
//! | Setting | Default |
//! |---------|---------|
//! | API host | `api.pcloud.com` |
//! | Connect timeout | 15 s |
//! | Read timeout | 30 s |
//! | Progress threshold | 64 KiB |
//! | Global parameters | `timeformat=timestamp` |
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::builder()
//!     .api_host("eapi.pcloud.com")
//!     .read_timeout(Duration::from_secs(60))
//!     .progress_threshold(16 * 1024)
//!     .build()?;
//! # Ok::<(), core_runtime::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::ClientConfig;
//!
//! // This will panic with an actionable error message
//! let config = ClientConfig::builder()
//!     .api_host("https://api.pcloud.com/")
//!     .build()
//!     .expect("Should fail - host must not carry a scheme");
//! ```

use crate::error::{Error, Result};
use std::time::Duration;
use url::Url;

/// Default API host
pub const DEFAULT_API_HOST: &str = "api.pcloud.com";

/// Default minimum number of bytes between two progress notifications
pub const DEFAULT_PROGRESS_THRESHOLD: u64 = 64 * 1024;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = concat!("cloud-sdk/", env!("CARGO_PKG_VERSION"));

/// Frozen client configuration.
///
/// Use [`ClientConfigBuilder`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    api_host: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    progress_threshold: u64,
    user_agent: String,
    global_params: Vec<(String, String)>,
}

impl ClientConfig {
    /// Creates a new configuration builder with default values.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Returns a builder pre-filled with this configuration.
    pub fn to_builder(&self) -> ClientConfigBuilder {
        ClientConfigBuilder {
            api_host: Some(self.api_host.clone()),
            connect_timeout: Some(self.connect_timeout),
            read_timeout: Some(self.read_timeout),
            progress_threshold: Some(self.progress_threshold),
            user_agent: Some(self.user_agent.clone()),
            global_params: Some(self.global_params.clone()),
        }
    }

    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    /// `https://<api_host>/`, the base every endpoint is resolved against
    pub fn api_base_url(&self) -> Result<Url> {
        parse_host(&self.api_host)
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn progress_threshold(&self) -> u64 {
        self.progress_threshold
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Parameters sent with every request
    pub fn global_params(&self) -> &[(String, String)] {
        &self.global_params
    }

    fn validate(&self) -> Result<()> {
        parse_host(&self.api_host)?;

        if self.connect_timeout.is_zero() {
            return Err(Error::Config(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::Config(
                "Read timeout must be greater than 0".to_string(),
            ));
        }
        if self.progress_threshold == 0 {
            return Err(Error::Config(
                "Progress threshold must be greater than 0 bytes".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("User agent must not be empty".to_string()));
        }
        if let Some((key, _)) = self
            .global_params
            .iter()
            .find(|(key, _)| key.is_empty() || key.contains(['=', ';', ' ']))
        {
            return Err(Error::Config(format!(
                "Invalid global parameter name '{}'",
                key
            )));
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            progress_threshold: DEFAULT_PROGRESS_THRESHOLD,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            global_params: vec![("timeformat".to_string(), "timestamp".to_string())],
        }
    }
}

fn parse_host(host: &str) -> Result<Url> {
    if host.is_empty() || host.contains("://") || host.contains(['/', '?', '#', ' ']) {
        return Err(Error::Config(format!(
            "API host must be a bare host name (e.g. 'api.pcloud.com'), got '{}'",
            host
        )));
    }
    Url::parse(&format!("https://{}/", host))
        .map_err(|e| Error::Config(format!("Invalid API host '{}': {}", host, e)))
}

/// Builder for constructing [`ClientConfig`] instances.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    api_host: Option<String>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    progress_threshold: Option<u64>,
    user_agent: Option<String>,
    global_params: Option<Vec<(String, String)>>,
}

impl ClientConfigBuilder {
    /// Sets the API host, without scheme or path.
    ///
    /// Default: `api.pcloud.com`
    pub fn api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = Some(host.into());
        self
    }

    /// Sets the TCP/TLS connect timeout.
    ///
    /// Default: 15 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the read timeout applied between received body chunks.
    ///
    /// Default: 30 seconds
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Sets the minimum number of bytes between two progress notifications.
    ///
    /// Default: 64 KiB
    pub fn progress_threshold(mut self, bytes: u64) -> Self {
        self.progress_threshold = Some(bytes);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Adds or replaces a parameter sent with every request.
    pub fn global_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        let params = self
            .global_params
            .get_or_insert_with(|| ClientConfig::default().global_params);
        match params.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => params.push((key, value)),
        }
        self
    }

    /// Removes every global parameter, including the defaults.
    pub fn clear_global_params(mut self) -> Self {
        self.global_params = Some(Vec::new());
        self
    }

    /// Builds the final `ClientConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is malformed, a timeout or the
    /// progress threshold is zero, the user agent is blank, or a global
    /// parameter name is invalid.
    pub fn build(self) -> Result<ClientConfig> {
        let defaults = ClientConfig::default();
        let config = ClientConfig {
            api_host: self.api_host.unwrap_or(defaults.api_host),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            read_timeout: self.read_timeout.unwrap_or(defaults.read_timeout),
            progress_threshold: self
                .progress_threshold
                .unwrap_or(defaults.progress_threshold),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            global_params: self.global_params.unwrap_or(defaults.global_params),
        };

        config.validate()?;

        Ok(config)
    }
}
