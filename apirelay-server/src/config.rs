// Copyright 2025 Apirelay (https://github.com/apirelay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use anyhow::Result;
use apirelay_core::Settings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Apirelay server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub gateway: Settings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Run the per-service health probe at startup and log the result.
    #[serde(default = "default_startup_health_check")]
    pub startup_health_check: bool,
}

fn default_log_filter() -> String {
    "apirelay=info".to_string()
}

fn default_startup_health_check() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            startup_health_check: default_startup_health_check(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            gateway: Settings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with priority: file > env > defaults.
    ///
    /// Supported environment variables:
    /// - APIRELAY_DEFAULT_TIMEOUT: per-request timeout in seconds (default: 5)
    /// - APIRELAY_MAX_RETRIES: informational retry count (default: 2)
    /// - APIRELAY_ENABLE_HEALTH_CHECK: enable the health probe (default: true)
    /// - APIRELAY_LOG_FILTER: tracing filter when RUST_LOG is unset
    /// - WEATHER_API_KEY: OpenWeatherMap / weatherapi.com key
    /// - NEWS_API_KEY: newsapi.org / newsdata.io key
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        config.gateway = config.gateway.merge_env();
        if let Ok(filter) = std::env::var("APIRELAY_LOG_FILTER") {
            config.logging.filter = filter;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gateway.default_timeout_secs == 0 {
            anyhow::bail!("default_timeout_secs must be at least 1");
        }
        if self.logging.filter.trim().is_empty() {
            anyhow::bail!("logging filter must not be empty");
        }
        Ok(())
    }
}
