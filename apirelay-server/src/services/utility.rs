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

//! Utility tools: URL shortening, password generation, and UUIDs.
//!
//! Password and UUID generation are fully local; only URL shortening goes
//! through the gateway.

use super::{bool_arg_or, str_arg, u64_arg_or};
use crate::state::AppState;
use crate::tools::registry::{McpTool, ToolError};
use apirelay_core::{ApiError, Endpoint, Provider};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const SERVICE: &str = "url_shortener";

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Plain-text shortener response; anything that is not an http(s) URL is a
/// provider-side failure (is.gd reports errors as text with status 200).
fn interpret_short_url(body: &str, long_url: &str, source: &str) -> Result<String, ApiError> {
    let short = body.trim();
    if short.is_empty() || !short.starts_with("http") {
        return Err(ApiError::Other(format!(
            "unexpected shortener response: {}",
            short
        )));
    }
    Ok(format!(
        "short link created:\n\noriginal: {}\nshort: {}\nsource: {}",
        long_url, short, source
    ))
}

pub async fn shorten_url(state: &AppState, long_url: &str) -> String {
    let trimmed = long_url.trim();
    if trimmed.is_empty() {
        return "error: provide a URL to shorten".to_string();
    }
    let long_url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let config = state.registry.get(SERVICE);
    let timeout = Duration::from_secs(config.timeout_secs);
    state
        .gateway
        .execute_with_fallback(&config, |endpoint: Endpoint| {
            let long_url = long_url.clone();
            async move {
                let (query, source): (Vec<(&str, String)>, &str) = match endpoint.provider {
                    Provider::IsGd => (
                        vec![
                            ("format", "simple".to_string()),
                            ("url", long_url.clone()),
                        ],
                        "is.gd",
                    ),
                    _ => (vec![("url", long_url.clone())], "TinyURL"),
                };
                let body = state
                    .http
                    .get_text(&endpoint.url, &query, Some(timeout))
                    .await?;
                interpret_short_url(&body, &long_url, source)
            }
        })
        .await
}

fn strength_label(score: u32) -> &'static str {
    match score {
        0 | 1 => "very weak",
        2 => "weak",
        3 => "medium",
        4 => "strong",
        _ => "very strong",
    }
}

pub fn generate_password(length: u64, include_symbols: bool) -> String {
    if length < 4 {
        return "error: password length must be at least 4".to_string();
    }
    if length > 128 {
        return "error: password length must not exceed 128".to_string();
    }
    let length = length as usize;

    let mut rng = rand::thread_rng();
    let mut pick = |set: &[u8]| set[rng.gen_range(0..set.len())] as char;

    // One character from each required class, then fill the rest from the
    // combined set.
    let mut chars: Vec<char> = vec![pick(LOWERCASE), pick(UPPERCASE), pick(DIGITS)];
    if include_symbols {
        chars.push(pick(SYMBOLS));
    }
    let mut pool: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS].concat();
    if include_symbols {
        pool.extend_from_slice(SYMBOLS);
    }
    while chars.len() < length {
        chars.push(pool[rng.gen_range(0..pool.len())] as char);
    }
    chars.shuffle(&mut rng);
    let password: String = chars.into_iter().collect();

    let has = |set: &[u8]| password.bytes().any(|b| set.contains(&b));
    let mut score = 0u32;
    for set in [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS] {
        if has(set) {
            score += 1;
        }
    }
    if length >= 12 {
        score += 1;
    }

    let yes_no = |b: bool| if b { "yes" } else { "no" };
    format!(
        "generated password:\n\npassword: {}\nlength: {}\nstrength: {}\n\
         digits: {}\nuppercase: {}\nlowercase: {}\nsymbols: {}",
        password,
        length,
        strength_label(score),
        yes_no(has(DIGITS)),
        yes_no(has(UPPERCASE)),
        yes_no(has(LOWERCASE)),
        yes_no(include_symbols && has(SYMBOLS)),
    )
}

pub fn generate_uuid(version: u64) -> String {
    // Only the random variant is supported; v1 would leak host details.
    if version != 4 {
        return "error: only UUID version 4 is supported".to_string();
    }
    let id = uuid::Uuid::new_v4();
    format!(
        "generated UUID:\n\nuuid: {}\ntype: UUID4 (random)\nformat: 8-4-4-4-12",
        id
    )
}

pub struct ShortenUrlTool {
    state: Arc<AppState>,
    schema: Value,
}

impl ShortenUrlTool {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            schema: json!({
                "type": "object",
                "properties": {
                    "long_url": {
                        "type": "string",
                        "description": "URL to shorten; https:// is assumed when no scheme is given"
                    }
                },
                "required": ["long_url"]
            }),
        }
    }
}

#[async_trait]
impl McpTool for ShortenUrlTool {
    fn name(&self) -> &str {
        "shorten_url"
    }

    fn description(&self) -> &str {
        "Create a short link for a URL"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<String, ToolError> {
        let long_url = str_arg(&params, "long_url")?;
        Ok(shorten_url(&self.state, &long_url).await)
    }
}

pub struct PasswordTool {
    schema: Value,
}

impl PasswordTool {
    pub fn new() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": {
                    "length": {
                        "type": "integer",
                        "description": "Password length, 4 to 128 (default 12)"
                    },
                    "include_symbols": {
                        "type": "boolean",
                        "description": "Include punctuation characters (default true)"
                    }
                }
            }),
        }
    }
}

impl Default for PasswordTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl McpTool for PasswordTool {
    fn name(&self) -> &str {
        "generate_password"
    }

    fn description(&self) -> &str {
        "Generate a random password with guaranteed character-class coverage"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<String, ToolError> {
        let length = u64_arg_or(&params, "length", 12);
        let include_symbols = bool_arg_or(&params, "include_symbols", true);
        Ok(generate_password(length, include_symbols))
    }
}

pub struct UuidTool {
    schema: Value,
}

impl UuidTool {
    pub fn new() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": {
                    "version": {
                        "type": "integer",
                        "description": "UUID version; only 4 is supported (default 4)"
                    }
                }
            }),
        }
    }
}

impl Default for UuidTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl McpTool for UuidTool {
    fn name(&self) -> &str {
        "generate_uuid"
    }

    fn description(&self) -> &str {
        "Generate a random (version 4) UUID"
    }

    fn input_schema(&self) -> &Value {
        &self.schema
    }

    async fn execute(&self, params: Value) -> Result<String, ToolError> {
        let version = u64_arg_or(&params, "version", 4);
        Ok(generate_uuid(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortener_response_must_be_a_url() {
        let ok = interpret_short_url("https://is.gd/abc\n", "https://example.com", "is.gd").unwrap();
        assert!(ok.contains("short: https://is.gd/abc"));
        assert!(ok.contains("source: is.gd"));

        let err = interpret_short_url("Error: invalid URL", "https://example.com", "is.gd");
        assert!(err.is_err());
        assert!(interpret_short_url("", "https://example.com", "TinyURL").is_err());
    }

    #[test]
    fn password_length_bounds_are_enforced() {
        assert!(generate_password(3, true).starts_with("error:"));
        assert!(generate_password(129, true).starts_with("error:"));
    }

    fn extract_password(report: &str) -> String {
        report
            .lines()
            .find_map(|line| line.strip_prefix("password: "))
            .unwrap()
            .to_string()
    }

    #[test]
    fn password_contains_every_required_class() {
        let report = generate_password(16, true);
        let password = extract_password(&report);
        assert_eq!(password.chars().count(), 16);
        assert!(password.bytes().any(|b| LOWERCASE.contains(&b)));
        assert!(password.bytes().any(|b| UPPERCASE.contains(&b)));
        assert!(password.bytes().any(|b| DIGITS.contains(&b)));
        assert!(password.bytes().any(|b| SYMBOLS.contains(&b)));
        assert!(report.contains("strength: very strong"));
    }

    #[test]
    fn symbols_can_be_excluded() {
        let report = generate_password(12, false);
        let password = extract_password(&report);
        assert!(!password.bytes().any(|b| SYMBOLS.contains(&b)));
        assert!(report.contains("symbols: no"));
    }

    #[test]
    fn minimum_length_still_covers_classes() {
        let report = generate_password(4, true);
        let password = extract_password(&report);
        assert_eq!(password.chars().count(), 4);
        assert!(password.bytes().any(|b| SYMBOLS.contains(&b)));
    }

    #[test]
    fn uuid_v4_only() {
        let out = generate_uuid(4);
        assert!(out.contains("UUID4 (random)"));
        let id_line = out.lines().find(|l| l.starts_with("uuid: ")).unwrap();
        assert_eq!(id_line.len(), "uuid: ".len() + 36);
        assert!(generate_uuid(1).starts_with("error:"));
        assert!(generate_uuid(7).starts_with("error:"));
    }

    #[test]
    fn strength_labels_cover_all_scores() {
        assert_eq!(strength_label(1), "very weak");
        assert_eq!(strength_label(3), "medium");
        assert_eq!(strength_label(5), "very strong");
    }
}
