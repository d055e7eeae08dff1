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

//! Top news headlines as a numbered list.

use super::u64_arg_or;
use crate::state::AppState;
use crate::tools::registry::{McpTool, ToolError};
use apirelay_core::{ApiError, Endpoint, Provider};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const SERVICE: &str = "news";
const MAX_HEADLINES: u64 = 20;
const DEFAULT_HEADLINES: u64 = 5;

fn numbered_list<'a>(titles: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let lines: Vec<String> = titles
        .enumerate()
        .map(|(i, (title, source))| format!("{}. {} ({})", i + 1, title, source))
        .collect();
    if lines.is_empty() {
        "no news available right now".to_string()
    } else {
        lines.join("\n")
    }
}

/// newsapi.org `/v2/top-headlines` response.
fn interpret_newsapi(data: &Value) -> Result<String, ApiError> {
    if data.get("status").and_then(Value::as_str) != Some("ok") {
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(ApiError::Other(format!("newsapi error: {}", message)));
    }
    let articles = data
        .get("articles")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Decode("missing articles".into()))?;
    Ok(numbered_list(articles.iter().map(|article| {
        let title = article
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("untitled");
        let source = article
            .get("source")
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown source");
        (title, source)
    })))
}

/// newsdata.io `/api/1/news` response.
fn interpret_newsdata(data: &Value) -> Result<String, ApiError> {
    let results = data
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Decode("missing results".into()))?;
    Ok(numbered_list(results.iter().map(|article| {
        let title = article
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("untitled");
        let source = article
            .get("source_id")
            .and_then(Value::as_str)
            .unwrap_or("unknown source");
        (title, source)
    })))
}

pub async fn get_headlines(state: &AppState, limit: u64) -> String {
    let limit = limit.clamp(1, MAX_HEADLINES);
    let config = state.registry.get(SERVICE);
    let api_key = config.api_key.clone().unwrap_or_default();
    let timeout = Duration::from_secs(config.timeout_secs);

    state
        .gateway
        .execute_with_fallback(&config, |endpoint: Endpoint| {
            let api_key = api_key.clone();
            async move {
                let query: Vec<(&str, String)> = match endpoint.provider {
                    Provider::NewsData => vec![
                        ("apikey", api_key),
                        ("country", "us".to_string()),
                        ("language", "en".to_string()),
                        ("size", limit.to_string()),
                    ],
                    _ => vec![
                        ("country", "us".to_string()),
                        ("apiKey", api_key),
                        ("pageSize", limit.to_string()),
                    ],
                };
                let data = state.http.get_json(&endpoint.url, &query, Some(timeout)).await?;
                let full = match endpoint.provider {
                    Provider::NewsData => interpret_newsdata(&data)?,
                    _ => interpret_newsapi(&data)?,
                };
                // Providers may ignore the page-size hint; trim locally.
                Ok(full
                    .lines()
                    .take(limit as usize)
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
        })
        .await
}

pub struct NewsTool {
    state: Arc<AppState>,
    schema: Value,
}

impl NewsTool {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            schema: json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 20,
                        "description": "Number of headlines to return (default 5)"
                    }
                }
            }),
        }
    }
}

#[async_trait]
impl McpTool for NewsTool {
    fn name(&self) -> &str {
        "get_news_headlines"
    }

    fn description(&self) -> &str {
        "Latest top news headlines as a numbered list with sources"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<String, ToolError> {
        let limit = u64_arg_or(&params, "limit", DEFAULT_HEADLINES);
        Ok(get_headlines(&self.state, limit).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newsapi_numbers_headlines_with_sources() {
        let data = json!({
            "status": "ok",
            "articles": [
                {"title": "First story", "source": {"name": "Wire"}},
                {"title": "Second story", "source": {"name": "Post"}}
            ]
        });
        assert_eq!(
            interpret_newsapi(&data).unwrap(),
            "1. First story (Wire)\n2. Second story (Post)"
        );
    }

    #[test]
    fn newsapi_error_status_becomes_api_error() {
        let data = json!({"status": "error", "message": "apiKeyInvalid"});
        let err = interpret_newsapi(&data).unwrap_err();
        assert!(matches!(err, ApiError::Other(_)));
    }

    #[test]
    fn newsdata_reads_results_and_source_ids() {
        let data = json!({
            "results": [
                {"title": "Headline", "source_id": "reuters"}
            ]
        });
        assert_eq!(interpret_newsdata(&data).unwrap(), "1. Headline (reuters)");
    }

    #[test]
    fn empty_article_list_reports_no_news() {
        let data = json!({"status": "ok", "articles": []});
        assert_eq!(
            interpret_newsapi(&data).unwrap(),
            "no news available right now"
        );
    }
}
