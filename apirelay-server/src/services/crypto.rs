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

//! Cryptocurrency spot prices across three providers.

use super::{str_arg, str_arg_or};
use crate::state::AppState;
use crate::tools::registry::{McpTool, ToolError};
use apirelay_core::{ApiError, Endpoint, Provider};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const SERVICE: &str = "cryptocurrency";

/// Approximate USD to CNY rate for providers that only quote USD.
const USD_CNY_APPROX: f64 = 7.2;

fn currency_symbol(vs: &str) -> String {
    match vs {
        "usd" => "$".to_string(),
        "cny" => "CNY ".to_string(),
        other => format!("{} ", other.to_uppercase()),
    }
}

/// Thousands-separated money formatting, `decimals` fractional digits.
fn format_amount(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value);
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// CoinGecko `/simple/price` keyed by asset id then currency.
fn interpret_coingecko(data: &Value, symbol: &str, vs: &str) -> Result<String, ApiError> {
    let asset = data
        .get(symbol)
        .ok_or_else(|| ApiError::Other(format!("cryptocurrency not found: {}", symbol)))?;
    let price = asset.get(vs).and_then(Value::as_f64).unwrap_or(0.0);
    let market_cap = asset
        .get(format!("{}_market_cap", vs))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let change_24h = asset
        .get(format!("{}_24h_change", vs))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let cs = currency_symbol(vs);
    Ok(format!(
        "{} price:\nprice: {}{}\nmarket cap: {}{}\n24h change: {:+.2}%",
        symbol.to_uppercase(),
        cs,
        format_amount(price, 2),
        cs,
        format_amount(market_cap, 0),
        change_24h
    ))
}

/// CoinCap asset search result; quotes USD only, CNY is approximated.
fn interpret_coincap(data: &Value, symbol: &str, vs: &str) -> Result<String, ApiError> {
    let asset = data
        .get("data")
        .and_then(Value::as_array)
        .and_then(|assets| assets.first())
        .ok_or_else(|| ApiError::Other(format!("cryptocurrency not found: {}", symbol)))?;
    let as_number = |key: &str| {
        asset
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    let price_usd = as_number("priceUsd");
    let market_cap_usd = as_number("marketCapUsd");
    let change_24h = as_number("changePercent24Hr");

    let (price, market_cap, cs) = if vs == "cny" {
        (
            price_usd * USD_CNY_APPROX,
            market_cap_usd * USD_CNY_APPROX,
            currency_symbol("cny"),
        )
    } else {
        (price_usd, market_cap_usd, currency_symbol("usd"))
    };

    let name = asset.get("name").and_then(Value::as_str).unwrap_or(symbol);
    let ticker = asset
        .get("symbol")
        .and_then(Value::as_str)
        .unwrap_or(symbol);
    Ok(format!(
        "{} ({}) price:\nprice: {}{}\nmarket cap: {}{}\n24h change: {:+.2}%",
        name,
        ticker,
        cs,
        format_amount(price, 2),
        cs,
        format_amount(market_cap, 0),
        change_24h
    ))
}

/// CryptoCompare `/data/price` keyed by target currency, no market cap.
fn interpret_cryptocompare(data: &Value, symbol: &str, vs: &str) -> Result<String, ApiError> {
    let key = vs.to_uppercase();
    let price = data
        .get(&key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ApiError::Other(format!("cryptocurrency not found: {}", symbol)))?;
    Ok(format!(
        "{} price:\nprice: {}{}\nsource: CryptoCompare",
        symbol.to_uppercase(),
        currency_symbol(vs),
        format_amount(price, 2)
    ))
}

pub async fn crypto_price(state: &AppState, symbol: &str, vs_currency: &str) -> String {
    let symbol = symbol.trim().to_lowercase();
    let vs = vs_currency.trim().to_lowercase();
    let config = state.registry.get(SERVICE);
    let timeout = Duration::from_secs(config.timeout_secs);

    state
        .gateway
        .execute_with_fallback(&config, |endpoint: Endpoint| {
            let symbol = symbol.clone();
            let vs = vs.clone();
            async move {
                match endpoint.provider {
                    Provider::CoinCap => {
                        let query = vec![("search", symbol.clone()), ("limit", "1".to_string())];
                        let data = state
                            .http
                            .get_json(&endpoint.url, &query, Some(timeout))
                            .await?;
                        interpret_coincap(&data, &symbol, &vs)
                    }
                    Provider::CryptoCompare => {
                        let query = vec![
                            ("fsym", symbol.to_uppercase()),
                            ("tsyms", vs.to_uppercase()),
                        ];
                        let data = state
                            .http
                            .get_json(&endpoint.url, &query, Some(timeout))
                            .await?;
                        interpret_cryptocompare(&data, &symbol, &vs)
                    }
                    _ => {
                        let query = vec![
                            ("ids", symbol.clone()),
                            ("vs_currencies", vs.clone()),
                            ("include_market_cap", "true".to_string()),
                            ("include_24hr_change", "true".to_string()),
                        ];
                        let data = state
                            .http
                            .get_json(&endpoint.url, &query, Some(timeout))
                            .await?;
                        interpret_coingecko(&data, &symbol, &vs)
                    }
                }
            }
        })
        .await
}

pub struct CryptoPriceTool {
    state: Arc<AppState>,
    schema: Value,
}

impl CryptoPriceTool {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            schema: json!({
                "type": "object",
                "properties": {
                    "crypto_symbol": {
                        "type": "string",
                        "description": "Asset id or symbol, e.g. bitcoin, ethereum, dogecoin"
                    },
                    "vs_currency": {
                        "type": "string",
                        "description": "Quote currency (default usd; cny supported)"
                    }
                },
                "required": ["crypto_symbol"]
            }),
        }
    }
}

#[async_trait]
impl McpTool for CryptoPriceTool {
    fn name(&self) -> &str {
        "query_crypto_price"
    }

    fn description(&self) -> &str {
        "Cryptocurrency price, market cap, and 24h change"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<String, ToolError> {
        let symbol = str_arg(&params, "crypto_symbol")?;
        let vs = str_arg_or(&params, "vs_currency", "usd");
        Ok(crypto_price(&self.state, &symbol, &vs).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_group_thousands() {
        assert_eq!(format_amount(67123.456, 2), "67,123.46");
        assert_eq!(format_amount(1234567890.0, 0), "1,234,567,890");
        assert_eq!(format_amount(999.0, 2), "999.00");
        assert_eq!(format_amount(-1234.5, 2), "-1,234.50");
    }

    #[test]
    fn coingecko_reports_price_cap_and_change() {
        let data = json!({
            "bitcoin": {
                "usd": 67000.12,
                "usd_market_cap": 1320000000000.0,
                "usd_24h_change": -1.234
            }
        });
        let out = interpret_coingecko(&data, "bitcoin", "usd").unwrap();
        assert!(out.starts_with("BITCOIN price:"));
        assert!(out.contains("price: $67,000.12"));
        assert!(out.contains("market cap: $1,320,000,000,000"));
        assert!(out.contains("24h change: -1.23%"));
    }

    #[test]
    fn coingecko_unknown_asset_is_an_error() {
        let data = json!({});
        assert!(interpret_coingecko(&data, "notacoin", "usd").is_err());
    }

    #[test]
    fn coincap_parses_string_numbers_and_converts_cny() {
        let data = json!({
            "data": [{
                "name": "Bitcoin",
                "symbol": "BTC",
                "priceUsd": "1000.0",
                "marketCapUsd": "2000.0",
                "changePercent24Hr": "2.5"
            }]
        });
        let out = interpret_coincap(&data, "bitcoin", "cny").unwrap();
        assert!(out.starts_with("Bitcoin (BTC) price:"));
        assert!(out.contains("price: CNY 7,200.00"));
        assert!(out.contains("24h change: +2.50%"));
    }

    #[test]
    fn cryptocompare_quotes_by_uppercase_currency() {
        let data = json!({"USD": 3500.5});
        let out = interpret_cryptocompare(&data, "ethereum", "usd").unwrap();
        assert!(out.contains("price: $3,500.50"));
        assert!(out.contains("source: CryptoCompare"));
    }

    #[test]
    fn cryptocompare_missing_currency_is_an_error() {
        let data = json!({"EUR": 1.0});
        assert!(interpret_cryptocompare(&data, "ethereum", "usd").is_err());
    }
}
