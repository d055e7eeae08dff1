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

//! Current weather conditions, metric units.

use super::str_arg;
use crate::state::AppState;
use crate::tools::registry::{McpTool, ToolError};
use apirelay_core::{ApiError, Endpoint, Provider};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const SERVICE: &str = "weather";

/// OpenWeatherMap `/data/2.5/weather` response.
fn interpret_openweather(data: &Value, city: &str) -> Result<String, ApiError> {
    let description = data
        .get("weather")
        .and_then(|w| w.get(0))
        .and_then(|w| w.get("description"))
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Decode("missing weather description".into()))?;
    let main = data
        .get("main")
        .ok_or_else(|| ApiError::Decode("missing main block".into()))?;
    let temp = main
        .get("temp")
        .and_then(Value::as_f64)
        .ok_or_else(|| ApiError::Decode("missing temperature".into()))?;
    let feels_like = main.get("feels_like").and_then(Value::as_f64).unwrap_or(temp);
    let humidity = main.get("humidity").and_then(Value::as_u64).unwrap_or(0);
    Ok(format!(
        "{}: {}, {:.1}C (feels like {:.1}C), humidity {}%",
        city, description, temp, feels_like, humidity
    ))
}

/// weatherapi.com `/v1/current.json` response.
fn interpret_weatherapi(data: &Value, city: &str) -> Result<String, ApiError> {
    let current = data
        .get("current")
        .ok_or_else(|| ApiError::Decode("missing current block".into()))?;
    let condition = current
        .get("condition")
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Decode("missing condition".into()))?;
    let temp = current
        .get("temp_c")
        .and_then(Value::as_f64)
        .ok_or_else(|| ApiError::Decode("missing temp_c".into()))?;
    let feels_like = current
        .get("feelslike_c")
        .and_then(Value::as_f64)
        .unwrap_or(temp);
    let humidity = current.get("humidity").and_then(Value::as_u64).unwrap_or(0);
    Ok(format!(
        "{}: {}, {:.1}C (feels like {:.1}C), humidity {}%",
        city, condition, temp, feels_like, humidity
    ))
}

pub async fn get_weather(state: &AppState, city: &str) -> String {
    let city = city.trim().to_string();
    let config = state.registry.get(SERVICE);
    let api_key = config.api_key.clone().unwrap_or_default();
    let timeout = Duration::from_secs(config.timeout_secs);

    state
        .gateway
        .execute_with_fallback(&config, |endpoint: Endpoint| {
            let city = city.clone();
            let api_key = api_key.clone();
            async move {
                // Unset keys go out empty and come back as auth errors, so
                // the endpoint is classified failed like any other outage.
                let query: Vec<(&str, String)> = match endpoint.provider {
                    Provider::WeatherApi => {
                        vec![("key", api_key), ("q", city.clone())]
                    }
                    _ => vec![
                        ("q", city.clone()),
                        ("appid", api_key),
                        ("units", "metric".to_string()),
                    ],
                };
                let data = state.http.get_json(&endpoint.url, &query, Some(timeout)).await?;
                match endpoint.provider {
                    Provider::WeatherApi => interpret_weatherapi(&data, &city),
                    _ => interpret_openweather(&data, &city),
                }
            }
        })
        .await
}

pub struct WeatherTool {
    state: Arc<AppState>,
    schema: Value,
}

impl WeatherTool {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            schema: json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "City name, e.g. \"London\""
                    }
                },
                "required": ["city"]
            }),
        }
    }
}

#[async_trait]
impl McpTool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Current weather for a city: conditions, temperature, and humidity in metric units"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<String, ToolError> {
        let city = str_arg(&params, "city")?;
        Ok(get_weather(&self.state, &city).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openweather_formats_metric_summary() {
        let data = json!({
            "weather": [{"description": "light rain"}],
            "main": {"temp": 14.27, "feels_like": 13.1, "humidity": 87}
        });
        assert_eq!(
            interpret_openweather(&data, "London").unwrap(),
            "London: light rain, 14.3C (feels like 13.1C), humidity 87%"
        );
    }

    #[test]
    fn openweather_missing_main_is_a_decode_error() {
        let data = json!({"weather": [{"description": "clear"}]});
        assert!(matches!(
            interpret_openweather(&data, "x").unwrap_err(),
            ApiError::Decode(_)
        ));
    }

    #[test]
    fn weatherapi_uses_current_block() {
        let data = json!({
            "current": {
                "condition": {"text": "Partly cloudy"},
                "temp_c": 22.0,
                "feelslike_c": 24.5,
                "humidity": 60
            }
        });
        assert_eq!(
            interpret_weatherapi(&data, "Sydney").unwrap(),
            "Sydney: Partly cloudy, 22.0C (feels like 24.5C), humidity 60%"
        );
    }

    #[test]
    fn feels_like_defaults_to_temperature() {
        let data = json!({
            "weather": [{"description": "clear sky"}],
            "main": {"temp": 20.0}
        });
        let out = interpret_openweather(&data, "Oslo").unwrap();
        assert!(out.contains("feels like 20.0C"));
        assert!(out.contains("humidity 0%"));
    }
}
