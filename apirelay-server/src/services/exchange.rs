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

//! Currency conversion with a static local rate table as the last fallback.

use super::{f64_arg_or, str_arg};
use crate::state::AppState;
use crate::tools::registry::{McpTool, ToolError};
use apirelay_core::backup;
use apirelay_core::{ApiError, Endpoint, Provider};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const SERVICE: &str = "exchange_rate";

/// Currencies accepted before any network request is made.
const SUPPORTED_CURRENCIES: &[(&str, &str)] = &[
    ("USD", "US Dollar"),
    ("EUR", "Euro"),
    ("GBP", "British Pound"),
    ("JPY", "Japanese Yen"),
    ("CNY", "Chinese Yuan"),
    ("AUD", "Australian Dollar"),
    ("CAD", "Canadian Dollar"),
    ("CHF", "Swiss Franc"),
    ("HKD", "Hong Kong Dollar"),
    ("SGD", "Singapore Dollar"),
    ("KRW", "South Korean Won"),
    ("INR", "Indian Rupee"),
    ("RUB", "Russian Ruble"),
    ("BRL", "Brazilian Real"),
    ("ZAR", "South African Rand"),
    ("MXN", "Mexican Peso"),
    ("NOK", "Norwegian Krone"),
    ("SEK", "Swedish Krona"),
    ("DKK", "Danish Krone"),
    ("PLN", "Polish Zloty"),
];

fn is_supported(code: &str) -> bool {
    SUPPORTED_CURRENCIES.iter().any(|(c, _)| *c == code)
}

fn sorted_codes() -> String {
    let mut codes: Vec<&str> = SUPPORTED_CURRENCIES.iter().map(|(c, _)| *c).collect();
    codes.sort_unstable();
    codes.join(", ")
}

fn conversion_summary(
    amount: f64,
    from: &str,
    to: &str,
    rate: f64,
    footer: &str,
) -> String {
    format!(
        "{} {} = {:.4} {}\n\nrate: 1 {} = {:.4} {}\n{}",
        amount,
        from,
        amount * rate,
        to,
        from,
        rate,
        to,
        footer
    )
}

/// exchangerate-api.com; both the v4 `rates` and v6 `conversion_rates`
/// shapes appear in the wild.
fn interpret_exchangerate_api(
    data: &Value,
    amount: f64,
    from: &str,
    to: &str,
) -> Result<String, ApiError> {
    if let Some(error_type) = data.get("error-type").and_then(Value::as_str) {
        return Err(ApiError::Other(format!("api error: {}", error_type)));
    }
    let rates = data
        .get("rates")
        .or_else(|| data.get("conversion_rates"))
        .and_then(Value::as_object)
        .ok_or_else(|| ApiError::Decode("missing rate table".into()))?;
    let rate = rates
        .get(to)
        .and_then(Value::as_f64)
        .ok_or_else(|| ApiError::Other(format!("unsupported target currency: {}", to)))?;
    let updated = data
        .get("time_last_update_utc")
        .or_else(|| data.get("date"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let footer = format!("updated: {}\nsource: ExchangeRate-API", updated);
    Ok(conversion_summary(amount, from, to, rate, &footer))
}

/// fixer.io reports success explicitly and nests errors.
fn interpret_fixer(data: &Value, amount: f64, from: &str, to: &str) -> Result<String, ApiError> {
    if !data.get("success").and_then(Value::as_bool).unwrap_or(false) {
        let info = data
            .get("error")
            .and_then(|e| e.get("info"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(ApiError::Other(format!("api error: {}", info)));
    }
    let rate = data
        .get("rates")
        .and_then(|r| r.get(to))
        .and_then(Value::as_f64)
        .ok_or_else(|| ApiError::Other(format!("unsupported target currency: {}", to)))?;
    let date = data.get("date").and_then(Value::as_str).unwrap_or("unknown");
    let footer = format!("date: {}\nsource: Fixer.io", date);
    Ok(conversion_summary(amount, from, to, rate, &footer))
}

/// The `backup://local-rates` pseudo-endpoint; approximate and offline.
fn local_conversion(amount: f64, from: &str, to: &str) -> Result<String, ApiError> {
    let rate = backup::local_rate(from, to).ok_or_else(|| {
        ApiError::Other(format!(
            "local rate table has no {} to {} conversion",
            from, to
        ))
    })?;
    let footer = "warning: approximate rate, reference only\nsource: local rate table";
    Ok(conversion_summary(amount, from, to, rate, footer))
}

pub async fn convert_currency(state: &AppState, from: &str, to: &str, amount: f64) -> String {
    let from = from.trim().to_uppercase();
    let to = to.trim().to_uppercase();

    // Validate before touching the network or the failed-endpoint set.
    if !is_supported(&from) {
        return format!(
            "unsupported source currency code: {}\n\nsupported currencies: {}",
            from,
            sorted_codes()
        );
    }
    if !is_supported(&to) {
        return format!(
            "unsupported target currency code: {}\n\nsupported currencies: {}",
            to,
            sorted_codes()
        );
    }
    if from == to {
        return format!(
            "{} {} = {} {}\n\nrate: 1.0000 (same currency)",
            amount, from, amount, to
        );
    }

    let config = state.registry.get(SERVICE);
    let timeout = Duration::from_secs(config.timeout_secs);
    state
        .gateway
        .execute_with_fallback(&config, |endpoint: Endpoint| {
            let from = from.clone();
            let to = to.clone();
            async move {
                match endpoint.provider {
                    Provider::LocalRates => local_conversion(amount, &from, &to),
                    Provider::Fixer => {
                        let url = endpoint.fill(&from);
                        let query = vec![("symbols", to.clone())];
                        let data = state.http.get_json(&url, &query, Some(timeout)).await?;
                        interpret_fixer(&data, amount, &from, &to)
                    }
                    _ => {
                        let url = endpoint.fill(&from);
                        let data = state.http.get_json(&url, &[], Some(timeout)).await?;
                        interpret_exchangerate_api(&data, amount, &from, &to)
                    }
                }
            }
        })
        .await
}

pub fn supported_currencies() -> String {
    let mut result = String::from("supported currency codes:\n\n");
    for (code, name) in SUPPORTED_CURRENCIES {
        result.push_str(&format!("{} - {}\n", code, name));
    }
    result.push_str(
        "\nexamples:\nconvert_currency(\"USD\", \"CNY\", 100) converts 100 US dollars to yuan\n\
         convert_currency(\"EUR\", \"JPY\") converts 1 euro to yen",
    );
    result
}

pub struct ConvertCurrencyTool {
    state: Arc<AppState>,
    schema: Value,
}

impl ConvertCurrencyTool {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            schema: json!({
                "type": "object",
                "properties": {
                    "from_currency": {
                        "type": "string",
                        "description": "Source currency code, e.g. USD"
                    },
                    "to_currency": {
                        "type": "string",
                        "description": "Target currency code, e.g. EUR"
                    },
                    "amount": {
                        "type": "number",
                        "description": "Amount to convert (default 1.0)"
                    }
                },
                "required": ["from_currency", "to_currency"]
            }),
        }
    }
}

#[async_trait]
impl McpTool for ConvertCurrencyTool {
    fn name(&self) -> &str {
        "convert_currency"
    }

    fn description(&self) -> &str {
        "Convert between two supported currencies using live or local fallback rates"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<String, ToolError> {
        let from = str_arg(&params, "from_currency")?;
        let to = str_arg(&params, "to_currency")?;
        let amount = f64_arg_or(&params, "amount", 1.0);
        Ok(convert_currency(&self.state, &from, &to, amount).await)
    }
}

pub struct ListCurrenciesTool {
    schema: Value,
}

impl ListCurrenciesTool {
    pub fn new() -> Self {
        Self {
            schema: json!({"type": "object", "properties": {}}),
        }
    }
}

impl Default for ListCurrenciesTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl McpTool for ListCurrenciesTool {
    fn name(&self) -> &str {
        "list_supported_currencies"
    }

    fn description(&self) -> &str {
        "List the currency codes accepted by convert_currency"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, _params: Value) -> Result<String, ToolError> {
        Ok(supported_currencies())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apirelay_core::Settings;

    #[test]
    fn exchangerate_api_v4_shape() {
        let data = json!({
            "rates": {"CNY": 7.25},
            "date": "2024-05-01"
        });
        let out = interpret_exchangerate_api(&data, 100.0, "USD", "CNY").unwrap();
        assert!(out.starts_with("100 USD = 725.0000 CNY"));
        assert!(out.contains("rate: 1 USD = 7.2500 CNY"));
        assert!(out.contains("updated: 2024-05-01"));
        assert!(out.contains("source: ExchangeRate-API"));
    }

    #[test]
    fn exchangerate_api_v6_shape() {
        let data = json!({
            "conversion_rates": {"EUR": 0.9},
            "time_last_update_utc": "Fri, 01 May 2024 00:00:01 +0000"
        });
        let out = interpret_exchangerate_api(&data, 1.0, "USD", "EUR").unwrap();
        assert!(out.contains("rate: 1 USD = 0.9000 EUR"));
    }

    #[test]
    fn exchangerate_api_error_type_fails() {
        let data = json!({"error-type": "unsupported-code"});
        assert!(interpret_exchangerate_api(&data, 1.0, "USD", "XXX").is_err());
    }

    #[test]
    fn fixer_requires_success_flag() {
        let ok = json!({"success": true, "rates": {"JPY": 160.0}, "date": "2024-05-01"});
        let out = interpret_fixer(&ok, 2.0, "USD", "JPY").unwrap();
        assert!(out.starts_with("2 USD = 320.0000 JPY"));

        let failed = json!({"success": false, "error": {"info": "invalid key"}});
        assert!(interpret_fixer(&failed, 1.0, "USD", "JPY").is_err());
    }

    #[test]
    fn local_table_handles_known_pairs_only() {
        let out = local_conversion(10.0, "USD", "CNY").unwrap();
        assert!(out.starts_with("10 USD = 72.0000 CNY"));
        assert!(out.contains("approximate rate"));
        assert!(local_conversion(1.0, "USD", "KRW").is_err());
    }

    #[tokio::test]
    async fn unsupported_codes_rejected_before_any_attempt() {
        let state = AppState::new(Settings::default()).unwrap();
        let out = convert_currency(&state, "usd", "xyz", 1.0).await;
        assert!(out.starts_with("unsupported target currency code: XYZ"));
        // Input validation must not mark any endpoint failed.
        assert_eq!(state.gateway.failed_count(), 0);
    }

    #[tokio::test]
    async fn identity_conversion_short_circuits() {
        let state = AppState::new(Settings::default()).unwrap();
        let out = convert_currency(&state, "eur", "EUR", 5.0).await;
        assert_eq!(out, "5 EUR = 5 EUR\n\nrate: 1.0000 (same currency)");
        assert_eq!(state.gateway.failed_count(), 0);
    }

    #[test]
    fn currency_listing_names_all_twenty() {
        let out = supported_currencies();
        for (code, _) in SUPPORTED_CURRENCIES {
            assert!(out.contains(code));
        }
        assert_eq!(SUPPORTED_CURRENCIES.len(), 20);
    }
}
