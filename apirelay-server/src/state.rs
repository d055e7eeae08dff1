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

//! Shared application state injected into every tool.

use anyhow::Result;
use apirelay_core::{Gateway, HttpClient, ServiceRegistry, Settings};
use std::time::Duration;

pub struct AppState {
    pub settings: Settings,
    pub registry: ServiceRegistry,
    pub gateway: Gateway,
    pub http: HttpClient,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self> {
        let registry = ServiceRegistry::new(&settings);
        let http = HttpClient::new(Duration::from_secs(settings.default_timeout_secs))
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            settings,
            registry,
            gateway: Gateway::new(),
            http,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_builds_from_default_settings() {
        let state = AppState::new(Settings::default()).unwrap();
        assert!(state.registry.names().count() >= 9);
        assert_eq!(state.gateway.failed_count(), 0);
    }
}
