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

//! Proxied capabilities, one module per service family.
//!
//! Each tool resolves its service configuration from the registry, hands the
//! gateway a per-endpoint request future (interpreter chosen by the
//! endpoint's provider tag), and returns whatever string comes back.
//! Interpreters are pure functions over parsed JSON so they can be tested
//! against canned responses.

pub mod content;
pub mod crypto;
pub mod exchange;
pub mod ip;
pub mod news;
pub mod system;
pub mod utility;
pub mod weather;

use crate::state::AppState;
use crate::tools::registry::{RegistrationError, ToolError, ToolRegistry};
use serde_json::Value;
use std::sync::Arc;

/// Register every tool this server exposes, in the order clients see them.
pub fn register_all(
    registry: &ToolRegistry,
    state: Arc<AppState>,
) -> Result<(), RegistrationError> {
    registry.register(Arc::new(ip::IpLocationTool::new(state.clone())))?;
    registry.register(Arc::new(ip::IpDetailsTool::new(state.clone())))?;
    registry.register(Arc::new(ip::IpSecurityTool::new()))?;
    registry.register(Arc::new(weather::WeatherTool::new(state.clone())))?;
    registry.register(Arc::new(news::NewsTool::new(state.clone())))?;
    registry.register(Arc::new(crypto::CryptoPriceTool::new(state.clone())))?;
    registry.register(Arc::new(content::QuoteTool::new(state.clone())))?;
    registry.register(Arc::new(content::JokeTool::new(state.clone())))?;
    registry.register(Arc::new(content::FactTool::new(state.clone())))?;
    registry.register(Arc::new(exchange::ConvertCurrencyTool::new(state.clone())))?;
    registry.register(Arc::new(exchange::ListCurrenciesTool::new()))?;
    registry.register(Arc::new(utility::ShortenUrlTool::new(state.clone())))?;
    registry.register(Arc::new(utility::PasswordTool::new()))?;
    registry.register(Arc::new(utility::UuidTool::new()))?;
    registry.register(Arc::new(system::HealthCheckTool::new(state.clone())))?;
    registry.register(Arc::new(system::ResetEndpointsTool::new(state)))?;
    Ok(())
}

/// Required string argument; schema validation should already guarantee it.
pub(crate) fn str_arg(params: &Value, key: &str) -> Result<String, ToolError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ToolError::InvalidParams(format!("missing string argument: {}", key)))
}

pub(crate) fn str_arg_or(params: &Value, key: &str, default: &str) -> String {
    params
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

pub(crate) fn u64_arg_or(params: &Value, key: &str, default: u64) -> u64 {
    params.get(key).and_then(Value::as_u64).unwrap_or(default)
}

pub(crate) fn f64_arg_or(params: &Value, key: &str, default: f64) -> f64 {
    params.get(key).and_then(Value::as_f64).unwrap_or(default)
}

pub(crate) fn bool_arg_or(params: &Value, key: &str, default: bool) -> bool {
    params.get(key).and_then(Value::as_bool).unwrap_or(default)
}
