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

//! IP / domain lookup tools: basic location, detailed info, and a local
//! rule-based security check.

use super::str_arg;
use crate::state::AppState;
use crate::tools::registry::{McpTool, ToolError};
use apirelay_core::{ApiError, Endpoint, Provider};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

const SERVICE: &str = "ip_lookup";

/// Detailed field set for ip-api.com; the registry template only asks for
/// the basic fields.
const IP_API_DETAIL_URL: &str = "http://ip-api.com/json/{}?fields=status,message,country,countryCode,region,regionName,city,zip,lat,lon,timezone,isp,org,as,query";

/// Resolve a literal IP or a hostname to a dotted address string.
async fn resolve(host: &str) -> Result<String, ApiError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip.to_string());
    }
    let mut addrs = tokio::net::lookup_host((host, 0u16))
        .await
        .map_err(|e| ApiError::Connect(format!("DNS lookup for {} failed: {}", host, e)))?;
    addrs
        .next()
        .map(|addr| addr.ip().to_string())
        .ok_or_else(|| ApiError::Connect(format!("no address found for {}", host)))
}

fn field<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or("unknown")
}

/// Interpret one provider's location response into a one-line summary.
fn interpret_location(
    provider: Provider,
    data: &Value,
    display: &str,
    target: &str,
) -> Result<String, ApiError> {
    match provider {
        Provider::IpApi => {
            if data.get("status").and_then(Value::as_str) != Some("success") {
                let message = field(data, "message");
                return Err(ApiError::Other(format!("ip-api error: {}", message)));
            }
            Ok(format!(
                "{} ({}) location: {} {} {} | {}",
                display,
                target,
                field(data, "country"),
                field(data, "regionName"),
                field(data, "city"),
                field(data, "isp"),
            ))
        }
        Provider::FreeIpApi => {
            if data.get("countryName").is_none() {
                return Err(ApiError::Decode("missing countryName".into()));
            }
            Ok(format!(
                "{} ({}) location: {} {} {} | {}",
                display,
                target,
                field(data, "countryName"),
                field(data, "regionName"),
                field(data, "cityName"),
                field(data, "isp"),
            ))
        }
        // Lean ip-api variant and anything else with the common shape.
        _ => {
            if data.get("country").is_none() {
                return Err(ApiError::Decode("unrecognized location payload".into()));
            }
            let region = data
                .get("regionName")
                .or_else(|| data.get("region"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let isp = data
                .get("isp")
                .or_else(|| data.get("org"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            Ok(format!(
                "{} ({}) location: {} {} {} | {}",
                display,
                target,
                field(data, "country"),
                region,
                field(data, "city"),
                isp,
            ))
        }
    }
}

pub async fn ip_location(state: &AppState, ip_or_domain: &str) -> String {
    let display = ip_or_domain.trim().to_string();
    let target = match resolve(&display).await {
        Ok(ip) => ip,
        Err(e) => return format!("invalid IP address or domain: {} ({})", display, e),
    };

    let config = state.registry.get(SERVICE);
    let timeout = Duration::from_secs(config.timeout_secs);
    state
        .gateway
        .execute_with_fallback(&config, |endpoint: Endpoint| {
            let display = display.clone();
            let target = target.clone();
            async move {
                let url = endpoint.fill(&target);
                let data = state.http.get_json(&url, &[], Some(timeout)).await?;
                interpret_location(endpoint.provider, &data, &display, &target)
            }
        })
        .await
}

fn interpret_details(
    provider: Provider,
    data: &Value,
    display: &str,
    target: &str,
) -> Result<String, ApiError> {
    match provider {
        Provider::IpApi => {
            if data.get("status").and_then(Value::as_str) != Some("success") {
                let message = field(data, "message");
                return Err(ApiError::Other(format!("ip-api error: {}", message)));
            }
            let lat = data.get("lat").and_then(Value::as_f64);
            let lon = data.get("lon").and_then(Value::as_f64);
            let coords = match (lat, lon) {
                (Some(lat), Some(lon)) => format!("{}, {}", lat, lon),
                _ => "unknown".to_string(),
            };
            Ok(format!(
                "{} ({}) details:\n\n\
                 Location:\n\
                 \x20 country: {} ({})\n\
                 \x20 region: {} ({})\n\
                 \x20 city: {}\n\
                 \x20 postal code: {}\n\
                 \x20 coordinates: {}\n\
                 \x20 timezone: {}\n\n\
                 Network:\n\
                 \x20 ISP: {}\n\
                 \x20 organization: {}\n\
                 \x20 AS: {}",
                display,
                target,
                field(data, "country"),
                field(data, "countryCode"),
                field(data, "regionName"),
                field(data, "region"),
                field(data, "city"),
                field(data, "zip"),
                coords,
                field(data, "timezone"),
                field(data, "isp"),
                field(data, "org"),
                field(data, "as"),
            ))
        }
        // Fallback providers only carry the basic shape.
        _ => {
            let region = data
                .get("regionName")
                .or_else(|| data.get("region"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let isp = data
                .get("isp")
                .or_else(|| data.get("org"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            Ok(format!(
                "{} ({}) info:\n\nlocation: {} {} {}\nISP: {}",
                display,
                target,
                field(data, "country"),
                region,
                field(data, "city"),
                isp,
            ))
        }
    }
}

pub async fn ip_details(state: &AppState, ip_or_domain: &str) -> String {
    let display = ip_or_domain.trim().to_string();
    let target = match resolve(&display).await {
        Ok(ip) => ip,
        Err(e) => return format!("invalid IP address or domain: {} ({})", display, e),
    };

    let config = state.registry.get(SERVICE);
    let timeout = Duration::from_secs(config.timeout_secs);
    state
        .gateway
        .execute_with_fallback(&config, |endpoint: Endpoint| {
            let display = display.clone();
            let target = target.clone();
            async move {
                // ip-api supports a richer field set than the registry
                // template requests.
                let url = match endpoint.provider {
                    Provider::IpApi => IP_API_DETAIL_URL.replacen("{}", &target, 1),
                    _ => endpoint.fill(&target),
                };
                let data = state.http.get_json(&url, &[], Some(timeout)).await?;
                interpret_details(endpoint.provider, &data, &display, &target)
            }
        })
        .await
}

/// Classify an address with local rules only; no network traffic.
fn classify_address(ip: IpAddr) -> (bool, &'static str) {
    match ip {
        IpAddr::V4(v4) => {
            if v4.is_private() {
                (false, "private address")
            } else if v4.is_loopback() {
                (false, "loopback address")
            } else {
                (false, "no known threat")
            }
        }
        IpAddr::V6(v6) => {
            if v6.is_loopback() {
                (false, "loopback address")
            } else {
                (false, "no known threat")
            }
        }
    }
}

pub async fn ip_security(ip_address: &str) -> String {
    let input = ip_address.trim();
    let target = match input.parse::<IpAddr>() {
        Ok(ip) => ip,
        Err(_) => match resolve(input).await {
            Ok(resolved) => match resolved.parse::<IpAddr>() {
                Ok(ip) => ip,
                Err(_) => return format!("invalid IP address or domain: {}", input),
            },
            Err(_) => return format!("invalid IP address or domain: {}", input),
        },
    };

    let (suspicious, detail) = classify_address(target);
    let mut result = format!("{} ({}) security check:\n\n", input, target);
    if suspicious {
        result.push_str(&format!(
            "threat status: suspicious\ndetail: {}\nadvice: treat traffic from this address with caution\n",
            detail
        ));
    } else {
        result.push_str(&format!(
            "threat status: clean\ndetail: {}\nadvice: no obvious threat found\n",
            detail
        ));
    }
    result.push_str(
        "\nnote: this is a rule-based check; use a dedicated threat intelligence service for a full analysis.",
    );
    result
}

pub struct IpLocationTool {
    state: Arc<AppState>,
    schema: Value,
}

impl IpLocationTool {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            schema: json!({
                "type": "object",
                "properties": {
                    "ip_or_domain": {
                        "type": "string",
                        "description": "IPv4/IPv6 address or hostname to look up"
                    }
                },
                "required": ["ip_or_domain"]
            }),
        }
    }
}

#[async_trait]
impl McpTool for IpLocationTool {
    fn name(&self) -> &str {
        "query_ip_location"
    }

    fn description(&self) -> &str {
        "Look up the country, region, city, and ISP of an IP address or domain"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<String, ToolError> {
        let target = str_arg(&params, "ip_or_domain")?;
        Ok(ip_location(&self.state, &target).await)
    }
}

pub struct IpDetailsTool {
    state: Arc<AppState>,
    schema: Value,
}

impl IpDetailsTool {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            schema: json!({
                "type": "object",
                "properties": {
                    "ip_or_domain": {
                        "type": "string",
                        "description": "IPv4/IPv6 address or hostname to inspect"
                    }
                },
                "required": ["ip_or_domain"]
            }),
        }
    }
}

#[async_trait]
impl McpTool for IpDetailsTool {
    fn name(&self) -> &str {
        "query_ip_details"
    }

    fn description(&self) -> &str {
        "Detailed IP report: geography, coordinates, timezone, ISP, organization, and AS"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<String, ToolError> {
        let target = str_arg(&params, "ip_or_domain")?;
        Ok(ip_details(&self.state, &target).await)
    }
}

pub struct IpSecurityTool {
    schema: Value,
}

impl IpSecurityTool {
    pub fn new() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": {
                    "ip_address": {
                        "type": "string",
                        "description": "IP address or hostname to check"
                    }
                },
                "required": ["ip_address"]
            }),
        }
    }
}

impl Default for IpSecurityTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl McpTool for IpSecurityTool {
    fn name(&self) -> &str {
        "check_ip_security"
    }

    fn description(&self) -> &str {
        "Rule-based security classification of an IP address (private, loopback, public)"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<String, ToolError> {
        let target = str_arg(&params, "ip_address")?;
        Ok(ip_security(&target).await)
    }
}
