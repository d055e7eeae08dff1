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

//! Shared HTTP client for all response interpreters.
//!
//! One GET per endpoint attempt; non-2xx statuses are surfaced as
//! [`ApiError::Status`] so the gateway treats them like any other failure.

use crate::error::ApiError;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = concat!("apirelay/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    default_timeout: Duration,
}

impl HttpClient {
    pub fn new(default_timeout: Duration) -> Result<Self, ApiError> {
        let inner = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(default_timeout)
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self {
            inner,
            default_timeout,
        })
    }

    fn timeout_or_default(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.default_timeout)
    }

    /// GET returning a parsed JSON body. Fails on non-2xx statuses.
    pub async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> Result<Value, ApiError> {
        debug!(url = url, "GET (json)");
        let response = self
            .inner
            .get(url)
            .query(query)
            .timeout(self.timeout_or_default(timeout))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// GET returning the raw body as text, for the few plain-text endpoints
    /// (URL shortening).
    pub async fn get_text(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> Result<String, ApiError> {
        debug!(url = url, "GET (text)");
        let response = self
            .inner
            .get(url)
            .query(query)
            .timeout(self.timeout_or_default(timeout))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    /// Lightweight reachability probe: returns the status code without
    /// treating error statuses as failures.
    pub async fn get_status(&self, url: &str, timeout: Duration) -> Result<u16, ApiError> {
        debug!(url = url, "GET (probe)");
        let response = self.inner.get(url).timeout(timeout).send().await?;
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_identifies_the_gateway() {
        assert!(USER_AGENT.starts_with("apirelay/"));
    }

    #[test]
    fn client_builds_with_default_timeout() {
        let client = HttpClient::new(Duration::from_secs(5)).unwrap();
        assert_eq!(client.default_timeout, Duration::from_secs(5));
        assert_eq!(
            client.timeout_or_default(Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(client.timeout_or_default(None), Duration::from_secs(5));
    }
}
