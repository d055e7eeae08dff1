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

//! Multi-endpoint fallback gateway.
//!
//! Endpoints are attempted strictly in configuration order, first success
//! wins. Any endpoint that fails is remembered in a process-wide set and
//! skipped on later calls until it either succeeds again (when reached) or
//! is explicitly reset; failure marks carry no TTL.
//!
//! The gateway is an owned instance, not ambient global state: construct one
//! per process (or per test) and share it behind an `Arc`.

use crate::config::ServiceConfig;
use crate::error::{describe_failure, ApiError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use tracing::{debug, info, warn};

pub struct Gateway {
    /// Endpoint URLs currently believed unreachable. A cache of recent
    /// failure, not a hard ban: reset requests are honored immediately.
    failed: Mutex<HashSet<String>>,
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

impl Gateway {
    pub fn new() -> Self {
        Self {
            failed: Mutex::new(HashSet::new()),
        }
    }

    /// Attempt the service's endpoints in priority order.
    ///
    /// Never fails for ordinary endpoint trouble: every failure path
    /// converges to a formatted string. Disabled services short-circuit
    /// before any network activity.
    pub async fn execute_with_fallback<F, Fut>(&self, config: &ServiceConfig, request: F) -> String
    where
        F: Fn(crate::config::Endpoint) -> Fut,
        Fut: Future<Output = Result<String, ApiError>>,
    {
        if !config.enabled {
            return disabled_message(&config.name);
        }

        for endpoint in config.endpoints() {
            if self.is_failed(&endpoint.url) {
                debug!(endpoint = %endpoint.url, "skipping endpoint marked failed");
                continue;
            }

            info!(service = %config.name, endpoint = %endpoint.url, "attempting endpoint");
            match request(endpoint.clone()).await {
                Ok(result) => {
                    if self.failed.lock().remove(&endpoint.url) {
                        info!(endpoint = %endpoint.url, "endpoint recovered");
                    }
                    return result;
                }
                Err(err) => {
                    let message = describe_failure(&err, &config.name, &endpoint.url);
                    warn!(endpoint = %endpoint.url, "{message}");
                    self.failed.lock().insert(endpoint.url.clone());
                }
            }
        }

        let message = unavailable_message(&config.name);
        warn!(service = %config.name, "{message}");
        message
    }

    fn is_failed(&self, url: &str) -> bool {
        self.failed.lock().contains(url)
    }

    /// Clear failure marks: all of them, or only endpoints whose URL
    /// contains `filter`.
    pub fn reset(&self, filter: Option<&str>) {
        let mut failed = self.failed.lock();
        match filter {
            Some(filter) => {
                failed.retain(|url| !url.contains(filter));
                info!(filter = filter, "reset failed endpoints matching filter");
            }
            None => {
                failed.clear();
                info!("reset all failed endpoints");
            }
        }
    }

    /// Snapshot of the currently failed endpoint URLs.
    pub fn failed_endpoints(&self) -> Vec<String> {
        self.failed.lock().iter().cloned().collect()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.lock().len()
    }
}

pub fn disabled_message(service: &str) -> String {
    format!("{} service is disabled", service)
}

pub fn unavailable_message(service: &str) -> String {
    format!(
        "all endpoints for {} are unavailable, try again later",
        service
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Endpoint, Provider, ServiceConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn service(name: &str, urls: &[&str]) -> ServiceConfig {
        let mut endpoints = urls
            .iter()
            .map(|u| Endpoint::new(*u, Provider::Quotable))
            .collect::<Vec<_>>();
        let primary = if endpoints.is_empty() {
            None
        } else {
            Some(endpoints.remove(0))
        };
        ServiceConfig {
            name: name.to_string(),
            primary,
            fallbacks: endpoints,
            timeout_secs: 5,
            retry_count: 2,
            api_key: None,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn healthy_primary_wins_without_touching_fallbacks() {
        let gw = Gateway::new();
        let config = service("quotes", &["Q1", "Q2"]);
        let hits = Arc::new(AtomicUsize::new(0));
        let fallback_hits = Arc::new(AtomicUsize::new(0));

        let result = {
            let hits = hits.clone();
            let fallback_hits = fallback_hits.clone();
            gw.execute_with_fallback(&config, move |ep| {
                let hits = hits.clone();
                let fallback_hits = fallback_hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    if ep.url == "Q2" {
                        fallback_hits.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(format!("from {}", ep.url))
                }
            })
            .await
        };

        assert_eq!(result, "from Q1");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_hits.load(Ordering::SeqCst), 0);
        assert_eq!(gw.failed_count(), 0);
    }

    #[tokio::test]
    async fn fallback_result_returned_and_primary_marked_failed() {
        let gw = Gateway::new();
        let config = service("quotes", &["Q1", "Q2"]);

        let result = gw
            .execute_with_fallback(&config, |ep| async move {
                if ep.url == "Q1" {
                    Err(ApiError::Connect("connection refused".into()))
                } else {
                    Ok("quote-A".to_string())
                }
            })
            .await;

        assert_eq!(result, "quote-A");
        assert_eq!(gw.failed_endpoints(), vec!["Q1".to_string()]);
    }

    #[tokio::test]
    async fn all_failing_yields_generic_message_and_marks_everything() {
        let gw = Gateway::new();
        let config = service("quotes", &["Q1", "Q2"]);

        let result = gw
            .execute_with_fallback(&config, |_ep| async move {
                Err::<String, _>(ApiError::Timeout)
            })
            .await;

        assert_eq!(result, unavailable_message("quotes"));
        let mut failed = gw.failed_endpoints();
        failed.sort();
        assert_eq!(failed, vec!["Q1".to_string(), "Q2".to_string()]);
    }

    #[tokio::test]
    async fn failed_endpoints_are_skipped_without_invoking_request() {
        let gw = Gateway::new();
        let config = service("quotes", &["Q1", "Q2"]);

        // First call: Q1 fails, Q2 succeeds.
        let _ = gw
            .execute_with_fallback(&config, |ep| async move {
                if ep.url == "Q1" {
                    Err(ApiError::Timeout)
                } else {
                    Ok("ok".to_string())
                }
            })
            .await;

        // Second call: Q1 must not be attempted at all.
        let q1_hits = Arc::new(AtomicUsize::new(0));
        let result = {
            let q1_hits = q1_hits.clone();
            gw.execute_with_fallback(&config, move |ep| {
                let q1_hits = q1_hits.clone();
                async move {
                    if ep.url == "Q1" {
                        q1_hits.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok("ok".to_string())
                }
            })
            .await
        };

        assert_eq!(result, "ok");
        assert_eq!(q1_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn success_on_previously_failed_endpoint_recovers_it() {
        let gw = Gateway::new();
        // Single endpoint service: failure marks it, but a reset makes it
        // eligible again and its next success clears the mark.
        let config = service("quotes", &["Q1"]);

        let _ = gw
            .execute_with_fallback(&config, |_ep| async move {
                Err::<String, _>(ApiError::Timeout)
            })
            .await;
        assert_eq!(gw.failed_count(), 1);

        gw.reset(Some("Q1"));
        let result = gw
            .execute_with_fallback(&config, |_ep| async move { Ok("back".to_string()) })
            .await;
        assert_eq!(result, "back");
        assert_eq!(gw.failed_count(), 0);
    }

    #[tokio::test]
    async fn reset_without_filter_clears_everything() {
        let gw = Gateway::new();
        let quotes = service("quotes", &["quotes-1", "quotes-2"]);
        let jokes = service("jokes", &["jokes-1"]);

        let fail = |_ep: Endpoint| async move { Err::<String, _>(ApiError::Timeout) };
        let _ = gw.execute_with_fallback(&quotes, fail).await;
        let _ = gw.execute_with_fallback(&jokes, fail).await;
        assert_eq!(gw.failed_count(), 3);

        gw.reset(None);
        assert_eq!(gw.failed_count(), 0);
    }

    #[tokio::test]
    async fn scoped_reset_only_touches_matching_urls() {
        let gw = Gateway::new();
        let quotes = service("quotes", &["quotes-1", "quotes-2"]);
        let jokes = service("jokes", &["jokes-1"]);

        let fail = |_ep: Endpoint| async move { Err::<String, _>(ApiError::Timeout) };
        let _ = gw.execute_with_fallback(&quotes, fail).await;
        let _ = gw.execute_with_fallback(&jokes, fail).await;

        gw.reset(Some("quotes"));
        assert_eq!(gw.failed_endpoints(), vec!["jokes-1".to_string()]);
    }

    #[tokio::test]
    async fn disabled_service_short_circuits() {
        let gw = Gateway::new();
        let mut config = service("news", &["N1"]);
        config.enabled = false;
        // Pre-existing failure state must not matter either way.
        gw.failed.lock().insert("N1".to_string());

        let hits = Arc::new(AtomicUsize::new(0));
        let result = {
            let hits = hits.clone();
            gw.execute_with_fallback(&config, move |_ep| {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok("never".to_string())
                }
            })
            .await
        };

        assert_eq!(result, disabled_message("news"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_endpoint_list_reports_unavailable() {
        let gw = Gateway::new();
        let config = ServiceConfig::unknown("mystery");
        let result = gw
            .execute_with_fallback(&config, |_ep| async move { Ok("never".to_string()) })
            .await;
        assert_eq!(result, unavailable_message("mystery"));
    }

    #[tokio::test]
    async fn quotes_walkthrough_then_total_failure_then_scoped_reset() {
        let gw = Gateway::new();
        let config = service("quotes", &["https://quotes-1/api", "https://quotes-2/api"]);

        // Q1 down, Q2 serves.
        let result = gw
            .execute_with_fallback(&config, |ep| async move {
                if ep.url.contains("quotes-1") {
                    Err(ApiError::Connect("refused".into()))
                } else {
                    Ok("quote-A".to_string())
                }
            })
            .await;
        assert_eq!(result, "quote-A");
        assert_eq!(gw.failed_endpoints(), vec!["https://quotes-1/api".to_string()]);

        // Now Q2 fails too; Q1 is skipped, Q2 joins the failed set.
        let result = gw
            .execute_with_fallback(&config, |_ep| async move {
                Err::<String, _>(ApiError::Status(503))
            })
            .await;
        assert_eq!(result, unavailable_message("quotes"));
        assert_eq!(gw.failed_count(), 2);

        gw.reset(Some("quotes"));
        assert!(gw.failed_endpoints().is_empty());
    }
}
