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

//! Content services: quotes, jokes, and random facts.
//!
//! These tools never surface a gateway failure to the caller: if every
//! endpoint is down, a local backup entry is substituted instead. A disabled
//! service still reads as disabled; only failures are substituted.

use crate::state::AppState;
use crate::tools::registry::{McpTool, ToolError};
use apirelay_core::backup;
use apirelay_core::{ApiError, Endpoint, Provider};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const QUOTE_PREFIX: &str = "Quote:";
const JOKE_PREFIX: &str = "Joke:";
const FACT_PREFIX: &str = "Fun fact:";

fn interpret_quote(provider: Provider, data: &Value) -> Result<String, ApiError> {
    match provider {
        Provider::ZenQuotes => {
            let quote = data
                .get(0)
                .ok_or_else(|| ApiError::Decode("empty quote list".into()))?;
            let content = quote
                .get("q")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ApiError::Decode("missing quote text".into()))?;
            let author = quote.get("a").and_then(Value::as_str).unwrap_or("Unknown");
            Ok(format!("{} {}\n- {}", QUOTE_PREFIX, content, author))
        }
        _ => {
            let content = data
                .get("content")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::Decode("missing quote content".into()))?;
            let author = data
                .get("author")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::Decode("missing quote author".into()))?;
            Ok(format!("{} {}\n- {}", QUOTE_PREFIX, content, author))
        }
    }
}

fn interpret_joke(provider: Provider, data: &Value) -> Result<String, ApiError> {
    match provider {
        Provider::JokeApi => {
            if data.get("error").and_then(Value::as_bool).unwrap_or(false) {
                let message = data
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                return Err(ApiError::Other(format!("jokeapi error: {}", message)));
            }
            match data.get("type").and_then(Value::as_str) {
                Some("single") => {
                    let joke = data
                        .get("joke")
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                        .ok_or_else(|| ApiError::Decode("missing joke text".into()))?;
                    Ok(format!("{} {}", JOKE_PREFIX, joke))
                }
                Some("twopart") => {
                    let setup = data
                        .get("setup")
                        .and_then(Value::as_str)
                        .ok_or_else(|| ApiError::Decode("missing setup".into()))?;
                    let delivery = data
                        .get("delivery")
                        .and_then(Value::as_str)
                        .ok_or_else(|| ApiError::Decode("missing delivery".into()))?;
                    Ok(format!("{} {}\n{}", JOKE_PREFIX, setup, delivery))
                }
                _ => Err(ApiError::Decode("unrecognized joke type".into())),
            }
        }
        _ => {
            let setup = data
                .get("setup")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::Decode("missing setup".into()))?;
            let punchline = data
                .get("punchline")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::Decode("missing punchline".into()))?;
            Ok(format!("{} {}\n{}", JOKE_PREFIX, setup, punchline))
        }
    }
}

fn interpret_fact(data: &Value) -> Result<String, ApiError> {
    let text = data
        .get("text")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Decode("missing fact text".into()))?;
    Ok(format!("{} {}", FACT_PREFIX, text))
}

async fn fetch(state: &AppState, service: &str) -> String {
    let config = state.registry.get(service);
    let timeout = Duration::from_secs(config.timeout_secs);
    state
        .gateway
        .execute_with_fallback(&config, |endpoint: Endpoint| async move {
            let data = state.http.get_json(&endpoint.url, &[], Some(timeout)).await?;
            match endpoint.provider {
                Provider::Quotable | Provider::ZenQuotes => {
                    interpret_quote(endpoint.provider, &data)
                }
                Provider::JokeApi | Provider::OfficialJoke => {
                    interpret_joke(endpoint.provider, &data)
                }
                _ => interpret_fact(&data),
            }
        })
        .await
}

pub async fn fetch_quote(state: &AppState) -> String {
    let result = fetch(state, "quotes").await;
    backup::substitute(result, backup::BACKUP_QUOTES, QUOTE_PREFIX)
}

pub async fn fetch_joke(state: &AppState) -> String {
    let result = fetch(state, "jokes").await;
    backup::substitute(result, backup::BACKUP_JOKES, JOKE_PREFIX)
}

pub async fn fetch_fact(state: &AppState) -> String {
    let result = fetch(state, "random_facts").await;
    backup::substitute(result, backup::BACKUP_FACTS, FACT_PREFIX)
}

fn no_args_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

macro_rules! content_tool {
    ($tool:ident, $name:literal, $description:literal, $fetch:ident) => {
        pub struct $tool {
            state: Arc<AppState>,
            schema: Value,
        }

        impl $tool {
            pub fn new(state: Arc<AppState>) -> Self {
                Self {
                    state,
                    schema: no_args_schema(),
                }
            }
        }

        #[async_trait]
        impl McpTool for $tool {
            fn name(&self) -> &str {
                $name
            }

            fn description(&self) -> &str {
                $description
            }

            fn input_schema(&self) -> &Value {
                &self.schema
            }

            async fn execute(&self, _params: Value) -> Result<String, ToolError> {
                Ok($fetch(&self.state).await)
            }
        }
    };
}

content_tool!(
    QuoteTool,
    "fetch_quote",
    "Random inspirational quote with attribution",
    fetch_quote
);
content_tool!(
    JokeTool,
    "fetch_joke",
    "Random joke, safe-mode only",
    fetch_joke
);
content_tool!(
    FactTool,
    "fetch_random_fact",
    "Random trivia fact",
    fetch_fact
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotable_formats_content_and_author() {
        let data = json!({"content": "Stay hungry.", "author": "Someone"});
        assert_eq!(
            interpret_quote(Provider::Quotable, &data).unwrap(),
            "Quote: Stay hungry.\n- Someone"
        );
    }

    #[test]
    fn zenquotes_reads_first_array_entry() {
        let data = json!([{"q": "Begin anywhere.", "a": "John Cage"}]);
        assert_eq!(
            interpret_quote(Provider::ZenQuotes, &data).unwrap(),
            "Quote: Begin anywhere.\n- John Cage"
        );
    }

    #[test]
    fn zenquotes_empty_list_is_a_decode_error() {
        let data = json!([]);
        assert!(matches!(
            interpret_quote(Provider::ZenQuotes, &data).unwrap_err(),
            ApiError::Decode(_)
        ));
    }

    #[test]
    fn jokeapi_handles_both_shapes() {
        let single = json!({"error": false, "type": "single", "joke": "A short joke."});
        assert_eq!(
            interpret_joke(Provider::JokeApi, &single).unwrap(),
            "Joke: A short joke."
        );
        let twopart = json!({
            "error": false,
            "type": "twopart",
            "setup": "Setup?",
            "delivery": "Punchline!"
        });
        assert_eq!(
            interpret_joke(Provider::JokeApi, &twopart).unwrap(),
            "Joke: Setup?\nPunchline!"
        );
    }

    #[test]
    fn jokeapi_error_flag_fails_the_endpoint() {
        let data = json!({"error": true, "message": "no jokes match"});
        assert!(matches!(
            interpret_joke(Provider::JokeApi, &data).unwrap_err(),
            ApiError::Other(_)
        ));
    }

    #[test]
    fn official_joke_uses_punchline_field() {
        let data = json!({"setup": "Setup?", "punchline": "Punchline!"});
        assert_eq!(
            interpret_joke(Provider::OfficialJoke, &data).unwrap(),
            "Joke: Setup?\nPunchline!"
        );
    }

    #[test]
    fn fact_reads_text_field() {
        let data = json!({"text": "Bananas are berries."});
        assert_eq!(
            interpret_fact(&data).unwrap(),
            "Fun fact: Bananas are berries."
        );
    }
}
