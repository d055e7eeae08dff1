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

//! Operational tools: service health probing and failed-endpoint reset.

use crate::state::AppState;
use crate::tools::registry::{McpTool, ToolError};
use apirelay_core::Provider;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Build the probe URL for a service's primary endpoint: strip the query
/// string, then substitute a harmless test value for any path placeholder.
fn probe_url(service: &str, url: &str, provider: Provider) -> Option<String> {
    if url.starts_with("backup://") {
        return None;
    }
    let base = url.split('?').next().unwrap_or(url);
    let placeholder = match service {
        "exchange_rate" => "USD",
        "ip_lookup" => "8.8.8.8",
        _ => "test",
    };
    let mut probe = base.replacen("{}", placeholder, 1);
    // CoinGecko rejects a bare /simple/price; give it a minimal query.
    if provider == Provider::CoinGecko {
        probe.push_str("?ids=bitcoin&vs_currencies=usd");
    }
    Some(probe)
}

fn truncate(message: &str, limit: usize) -> String {
    if message.chars().count() <= limit {
        message.to_string()
    } else {
        let cut: String = message.chars().take(limit).collect();
        format!("{}...", cut)
    }
}

pub async fn health_check(state: &AppState) -> String {
    if !state.settings.enable_health_check {
        return "health check is disabled".to_string();
    }

    let mut results = Vec::new();
    for name in state.registry.names() {
        let config = state.registry.get(name);
        let status = match config.primary.as_ref() {
            None => "skipped (no endpoints)".to_string(),
            Some(primary) => match probe_url(name, &primary.url, primary.provider) {
                None => "skipped (local endpoint)".to_string(),
                Some(url) => match state.http.get_status(&url, PROBE_TIMEOUT).await {
                    Ok(code) if code < 400 => "ok".to_string(),
                    Ok(code) => format!("HTTP {}", code),
                    Err(e) => format!("failed: {}", truncate(&e.to_string(), 50)),
                },
            },
        };
        results.push(format!("{}: {}", name, status));
    }

    let failed = state.gateway.failed_count();
    if failed > 0 {
        results.push(String::new());
        results.push(format!("failed endpoints: {}", failed));
    }
    results.join("\n")
}

pub fn reset_failed_endpoints(state: &AppState, service_name: Option<&str>) -> String {
    match service_name.filter(|s| !s.is_empty()) {
        Some(service) => {
            state.gateway.reset(Some(service));
            format!("reset failed endpoints for {}", service)
        }
        None => {
            state.gateway.reset(None);
            "reset all failed endpoints".to_string()
        }
    }
}

pub struct HealthCheckTool {
    state: Arc<AppState>,
    schema: Value,
}

impl HealthCheckTool {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            schema: json!({"type": "object", "properties": {}}),
        }
    }
}

#[async_trait]
impl McpTool for HealthCheckTool {
    fn name(&self) -> &str {
        "health_check"
    }

    fn description(&self) -> &str {
        "Probe the primary endpoint of every service and report reachability"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, _params: Value) -> Result<String, ToolError> {
        Ok(health_check(&self.state).await)
    }
}

pub struct ResetEndpointsTool {
    state: Arc<AppState>,
    schema: Value,
}

impl ResetEndpointsTool {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            schema: json!({
                "type": "object",
                "properties": {
                    "service_name": {
                        "type": "string",
                        "description": "Limit the reset to endpoints whose URL matches this service; empty resets everything"
                    }
                }
            }),
        }
    }
}

#[async_trait]
impl McpTool for ResetEndpointsTool {
    fn name(&self) -> &str {
        "reset_failed_endpoints"
    }

    fn description(&self) -> &str {
        "Clear failure marks so skipped endpoints are attempted again"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<String, ToolError> {
        let service = params.get("service_name").and_then(Value::as_str);
        Ok(reset_failed_endpoints(&self.state, service))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apirelay_core::Settings;

    #[test]
    fn probe_urls_substitute_per_service_placeholders() {
        assert_eq!(
            probe_url(
                "ip_lookup",
                "https://ip-api.com/json/{}?fields=country",
                Provider::IpApi
            ),
            Some("https://ip-api.com/json/8.8.8.8".to_string())
        );
        assert_eq!(
            probe_url(
                "exchange_rate",
                "https://api.exchangerate-api.com/v4/latest/{}",
                Provider::ExchangeRateApi
            ),
            Some("https://api.exchangerate-api.com/v4/latest/USD".to_string())
        );
        assert_eq!(
            probe_url("quotes", "https://api.quotable.io/random", Provider::Quotable),
            Some("https://api.quotable.io/random".to_string())
        );
    }

    #[test]
    fn coingecko_probe_carries_a_minimal_query() {
        let url = probe_url(
            "cryptocurrency",
            "https://api.coingecko.com/api/v3/simple/price",
            Provider::CoinGecko,
        )
        .unwrap();
        assert_eq!(
            url,
            "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd"
        );
    }

    #[test]
    fn local_endpoints_are_not_probed() {
        assert_eq!(
            probe_url("exchange_rate", "backup://local-rates", Provider::LocalRates),
            None
        );
    }

    #[test]
    fn long_errors_are_truncated() {
        let long = "x".repeat(80);
        let out = truncate(&long, 50);
        assert_eq!(out.chars().count(), 53);
        assert!(out.ends_with("..."));
        assert_eq!(truncate("short", 50), "short");
    }

    #[tokio::test]
    async fn disabled_health_check_short_circuits() {
        let settings = Settings {
            enable_health_check: false,
            ..Settings::default()
        };
        let state = AppState::new(settings).unwrap();
        assert_eq!(health_check(&state).await, "health check is disabled");
    }

    #[test]
    fn reset_scopes_by_service_name() {
        let state = AppState::new(Settings::default()).unwrap();
        state.gateway.reset(None);
        assert_eq!(
            reset_failed_endpoints(&state, Some("quotes")),
            "reset failed endpoints for quotes"
        );
        assert_eq!(
            reset_failed_endpoints(&state, Some("")),
            "reset all failed endpoints"
        );
        assert_eq!(
            reset_failed_endpoints(&state, None),
            "reset all failed endpoints"
        );
    }
}
