// SPDX-License-Identifier: GNU GENERAL PUBLIC LICENSE Version 3
//
// Copyleft (c) 2024 James Wong. This file is part of James Wong.
// is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the
// Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// James Wong is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with James Wong.  If not, see <https://www.gnu.org/licenses/>.
//
// IMPORTANT: Any software that fully or partially contains or uses materials
// covered by this license must also be released under the GNU GPL license.
// This includes modifications and derived works.

use axum::http::HeaderName;
use common_telemetry::logging::LoggingOptions;
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::{env, ops::Deref, sync::Arc, time::Duration};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

pub const DEFAULT_SERVICE_NAME: &str = "torwaf";
pub const DEFAULT_ADDRESS_LIST_URL: &str = "https://check.torproject.org/exit-addresses";
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_FORWARDED_HEADER_NAME: &str = "X-Forwarded-For";
/// Lower bound for the refresh period, the feed operator asks clients not to poll faster.
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 60;
/// Upper bound for the refresh period, one week.
pub const MAX_UPDATE_INTERVAL_SECS: u64 = 7 * 24 * 3600;

pub const ENV_CFG_PATH: &str = "TORWAF_CFG_PATH";
pub const ENV_CFG_VERBOSE: &str = "TORWAF_CFG_VERBOSE";
pub const ENV_PREFIX: &str = "TORWAF";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationErrors),
    #[error("invalid address list url '{url}': {reason}")]
    InvalidAddressListUrl { url: String, reason: String },
    #[error("update interval must be at least {min} seconds, got {actual}")]
    UpdateIntervalTooShort { min: u64, actual: u64 },
    #[error("update interval must be at most {max} seconds, got {actual}")]
    UpdateIntervalTooLong { max: u64, actual: u64 },
    #[error("invalid forwarded header name '{0}'")]
    InvalidHeaderName(String),
    #[error("error loading configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

// App Properties.

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[serde(default, rename_all = "kebab-case")]
pub struct AppConfigProperties {
    #[serde(alias = "service_name")]
    #[validate(length(min = 1, max = 32))]
    pub service_name: String,
    pub server: ServerProperties,
    pub logging: LoggingOptions,
    pub torblock: TorBlockProperties,
    #[validate(nested)]
    pub forward: ForwardProperties,
}

// Server Properties.

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerProperties {
    pub host: String,
    pub port: u16,
}

// Tor Exit Blocking Properties.

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct TorBlockProperties {
    pub enabled: bool,
    /// Absolute http(s) URL of the published exit address list.
    #[serde(alias = "address_list_url")]
    pub address_list_url: String,
    #[serde(alias = "update_interval_seconds")]
    pub update_interval_seconds: u64,
    /// When false only the transport peer address is checked.
    #[serde(alias = "trust_forwarded_header")]
    pub trust_forwarded_header: bool,
    #[serde(alias = "forwarded_header_name")]
    pub forwarded_header_name: String,
}

// Forward Properties.

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[serde(default, rename_all = "kebab-case")]
pub struct ForwardProperties {
    /// Allowed requests are relayed here. Unset means allowed requests get an empty 204.
    #[serde(alias = "upstream_url")]
    #[validate(url)]
    pub upstream_url: Option<String>,
    #[serde(alias = "max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(alias = "connect_timeout")]
    pub connect_timeout: u64,
    #[serde(alias = "total_timeout")]
    pub total_timeout: u64,
}

// App Properties impls.

impl Default for AppConfigProperties {
    fn default() -> Self {
        AppConfigProperties {
            service_name: String::from(DEFAULT_SERVICE_NAME),
            server: ServerProperties::default(),
            logging: LoggingOptions::default(),
            torblock: TorBlockProperties::default(),
            forward: ForwardProperties::default(),
        }
    }
}

impl AppConfigProperties {
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.torblock.validate_all()
    }
}

impl Default for ServerProperties {
    fn default() -> Self {
        ServerProperties {
            host: String::from("127.0.0.1"),
            port: 9000,
        }
    }
}

impl ServerProperties {
    pub fn get_bind_addr(&self) -> String {
        self.host.to_owned() + ":" + &self.port.to_string()
    }
}

// Tor Exit Blocking Properties impls.

impl Default for TorBlockProperties {
    fn default() -> Self {
        TorBlockProperties {
            enabled: true,
            address_list_url: String::from(DEFAULT_ADDRESS_LIST_URL),
            update_interval_seconds: DEFAULT_UPDATE_INTERVAL_SECS,
            trust_forwarded_header: true,
            forwarded_header_name: String::from(DEFAULT_FORWARDED_HEADER_NAME),
        }
    }
}

impl TorBlockProperties {
    /// Checks the settings before any network activity starts.
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        let invalid_url = |reason: String| ConfigError::InvalidAddressListUrl {
            url: self.address_list_url.to_owned(),
            reason,
        };
        let url = url::Url::parse(&self.address_list_url).map_err(|e| invalid_url(e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid_url(format!("unsupported scheme '{}'", url.scheme())));
        }
        if !url.has_host() {
            return Err(invalid_url(String::from("missing host")));
        }

        if self.update_interval_seconds < MIN_UPDATE_INTERVAL_SECS {
            return Err(ConfigError::UpdateIntervalTooShort {
                min: MIN_UPDATE_INTERVAL_SECS,
                actual: self.update_interval_seconds,
            });
        }
        if self.update_interval_seconds > MAX_UPDATE_INTERVAL_SECS {
            return Err(ConfigError::UpdateIntervalTooLong {
                max: MAX_UPDATE_INTERVAL_SECS,
                actual: self.update_interval_seconds,
            });
        }

        self.header_name()?;
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_seconds)
    }

    pub fn header_name(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::from_bytes(self.forwarded_header_name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeaderName(self.forwarded_header_name.to_owned()))
    }
}

// Forward Properties impls.

impl Default for ForwardProperties {
    fn default() -> Self {
        ForwardProperties {
            upstream_url: None,
            max_body_bytes: 65535,
            connect_timeout: 5,
            total_timeout: 10,
        }
    }
}

// App Configuration.

#[derive(Debug)]
pub struct AppConfig {
    pub inner: AppConfigProperties,
}

impl Deref for AppConfig {
    type Target = AppConfigProperties;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl AppConfig {
    pub fn new(config: AppConfigProperties) -> Result<Arc<AppConfig>, ConfigError> {
        config.validate_all()?;
        Ok(Arc::new(AppConfig { inner: config }))
    }
}

/// Loads the configuration from the given file (or `TORWAF_CFG_PATH`), layered with
/// `TORWAF__<SECTION>__<KEY>` environment overrides. Falls back to defaults without a file.
pub fn load_config(path: Option<&str>) -> Result<Arc<AppConfig>, ConfigError> {
    dotenv().ok(); // Notice: Must be called before parse from environment file (.env).

    let path = path.map(str::to_string).or_else(|| env::var(ENV_CFG_PATH).ok());

    let mut builder = ::config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(::config::File::with_name(path.as_str()));
    }
    let props = builder
        .add_source(
            // Notice: Use double "_" to distinguish between different hierarchy struct.
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .keep_prefix(false),
        )
        .build()?
        .try_deserialize::<AppConfigProperties>()?;

    let config = AppConfig::new(props)?;

    if env::var(ENV_CFG_VERBOSE).is_ok() {
        tracing::info!("Loaded the config details: {:?}", config.inner);
    }

    Ok(config)
}
