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

//! Service registry and per-service configuration.
//!
//! Each proxied capability is a named service with one primary endpoint and
//! an ordered list of fallbacks. Every endpoint carries an explicit
//! [`Provider`] tag that selects the response interpreter; tools never sniff
//! the URL to decide how to parse a response.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifies which third-party API an endpoint belongs to, and therefore
/// which response interpreter applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    IpApi,
    IpApiLean,
    FreeIpApi,
    CoinGecko,
    CoinCap,
    CryptoCompare,
    Quotable,
    ZenQuotes,
    JokeApi,
    OfficialJoke,
    ExchangeRateApi,
    Fixer,
    /// Pseudo-endpoint backed by the static local rate table; never touches
    /// the network.
    LocalRates,
    OpenWeather,
    WeatherApi,
    NewsApi,
    NewsData,
    TinyUrl,
    IsGd,
    UselessFacts,
}

/// One concrete remote URL template. `{}` marks the single positional path
/// parameter some templates take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    pub provider: Provider,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, provider: Provider) -> Self {
        Self {
            url: url.into(),
            provider,
        }
    }

    /// Substitute the positional placeholder, if present.
    pub fn fill(&self, param: &str) -> String {
        self.url.replacen("{}", param, 1)
    }

    /// `backup://` endpoints resolve locally and are skipped by network
    /// probes.
    pub fn is_local(&self) -> bool {
        self.url.starts_with("backup://")
    }
}

/// Configuration for one proxied capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    /// Always attempted before any fallback. `None` only for unknown
    /// services, which behave like a service with no endpoints.
    pub primary: Option<Endpoint>,
    /// Tried in order after the primary fails; order is fixed at
    /// configuration time.
    pub fallbacks: Vec<Endpoint>,
    pub timeout_secs: u64,
    /// Informational: retries happen across endpoints, not within one.
    pub retry_count: u32,
    pub api_key: Option<String>,
    pub enabled: bool,
}

impl ServiceConfig {
    fn new(name: &str, primary: Endpoint, fallbacks: Vec<Endpoint>, settings: &Settings) -> Self {
        Self {
            name: name.to_string(),
            primary: Some(primary),
            fallbacks,
            timeout_secs: settings.default_timeout_secs,
            retry_count: settings.max_retries,
            api_key: None,
            enabled: true,
        }
    }

    fn with_api_key(mut self, key: &str) -> Self {
        if !key.is_empty() {
            self.api_key = Some(key.to_string());
        }
        self
    }

    /// Conservative stand-in for a service name the registry does not know:
    /// no endpoints, so the gateway reports it unavailable without ever
    /// touching the network.
    pub fn unknown(name: &str) -> Self {
        Self {
            name: name.to_string(),
            primary: None,
            fallbacks: Vec::new(),
            timeout_secs: Settings::default().default_timeout_secs,
            retry_count: 0,
            api_key: None,
            enabled: true,
        }
    }

    /// Endpoints in attempt order: primary first, then fallbacks.
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.primary.iter().chain(self.fallbacks.iter())
    }
}

/// Process-wide tuning knobs, resolved once at startup. Secrets may be
/// overridden from the environment; built-in defaults are empty so keyed
/// services fail cleanly until configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_timeout")]
    pub default_timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    #[serde(default = "default_health_check")]
    pub enable_health_check: bool,
    #[serde(default)]
    pub weather_api_key: String,
    #[serde(default)]
    pub news_api_key: String,
}

fn default_timeout() -> u64 {
    5
}

fn default_retries() -> u32 {
    2
}

fn default_health_check() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout(),
            max_retries: default_retries(),
            enable_health_check: default_health_check(),
            weather_api_key: String::new(),
            news_api_key: String::new(),
        }
    }
}

impl Settings {
    /// Apply environment overrides on top of the current values.
    pub fn merge_env(mut self) -> Self {
        if let Ok(v) = std::env::var("APIRELAY_DEFAULT_TIMEOUT") {
            if let Ok(secs) = v.parse() {
                self.default_timeout_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("APIRELAY_MAX_RETRIES") {
            if let Ok(n) = v.parse() {
                self.max_retries = n;
            }
        }
        if let Ok(v) = std::env::var("APIRELAY_ENABLE_HEALTH_CHECK") {
            self.enable_health_check = v.parse().unwrap_or(true);
        }
        if let Ok(v) = std::env::var("WEATHER_API_KEY") {
            self.weather_api_key = v;
        }
        if let Ok(v) = std::env::var("NEWS_API_KEY") {
            self.news_api_key = v;
        }
        self
    }
}

/// Static mapping from service name to endpoint list and call parameters.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: HashMap<String, ServiceConfig>,
    order: Vec<String>,
}

impl ServiceRegistry {
    pub fn new(settings: &Settings) -> Self {
        let table = vec![
            ServiceConfig::new(
                "ip_lookup",
                Endpoint::new(
                    "https://ip-api.com/json/{}?fields=status,message,country,regionName,city,isp",
                    Provider::IpApi,
                ),
                vec![
                    Endpoint::new("https://freeipapi.com/api/json/{}", Provider::FreeIpApi),
                    Endpoint::new(
                        "http://ip-api.com/json/{}?fields=country,regionName,city,isp",
                        Provider::IpApiLean,
                    ),
                ],
                settings,
            ),
            ServiceConfig::new(
                "cryptocurrency",
                Endpoint::new(
                    "https://api.coingecko.com/api/v3/simple/price",
                    Provider::CoinGecko,
                ),
                vec![
                    Endpoint::new("https://api.coincap.io/v2/assets", Provider::CoinCap),
                    Endpoint::new(
                        "https://min-api.cryptocompare.com/data/price",
                        Provider::CryptoCompare,
                    ),
                ],
                settings,
            ),
            ServiceConfig::new(
                "quotes",
                Endpoint::new("https://api.quotable.io/random", Provider::Quotable),
                vec![Endpoint::new(
                    "https://zenquotes.io/api/random",
                    Provider::ZenQuotes,
                )],
                settings,
            ),
            ServiceConfig::new(
                "jokes",
                Endpoint::new(
                    "https://v2.jokeapi.dev/joke/Any?safe-mode",
                    Provider::JokeApi,
                ),
                vec![Endpoint::new(
                    "https://official-joke-api.appspot.com/random_joke",
                    Provider::OfficialJoke,
                )],
                settings,
            ),
            ServiceConfig::new(
                "exchange_rate",
                Endpoint::new(
                    "https://api.exchangerate-api.com/v4/latest/{}",
                    Provider::ExchangeRateApi,
                ),
                vec![
                    Endpoint::new("https://api.fixer.io/latest?base={}", Provider::Fixer),
                    Endpoint::new("backup://local-rates", Provider::LocalRates),
                ],
                settings,
            ),
            ServiceConfig::new(
                "weather",
                Endpoint::new(
                    "https://api.openweathermap.org/data/2.5/weather",
                    Provider::OpenWeather,
                ),
                vec![Endpoint::new(
                    "https://api.weatherapi.com/v1/current.json",
                    Provider::WeatherApi,
                )],
                settings,
            )
            .with_api_key(&settings.weather_api_key),
            ServiceConfig::new(
                "news",
                Endpoint::new("https://newsapi.org/v2/top-headlines", Provider::NewsApi),
                vec![Endpoint::new(
                    "https://newsdata.io/api/1/news",
                    Provider::NewsData,
                )],
                settings,
            )
            .with_api_key(&settings.news_api_key),
            ServiceConfig::new(
                "url_shortener",
                Endpoint::new("https://tinyurl.com/api-create.php", Provider::TinyUrl),
                vec![Endpoint::new("https://is.gd/create.php", Provider::IsGd)],
                settings,
            ),
            ServiceConfig::new(
                "random_facts",
                Endpoint::new(
                    "https://uselessfacts.jsph.pl/api/v2/facts/random",
                    Provider::UselessFacts,
                ),
                vec![],
                settings,
            ),
        ];

        let order = table.iter().map(|c| c.name.clone()).collect();
        let services = table.into_iter().map(|c| (c.name.clone(), c)).collect();
        Self { services, order }
    }

    /// Unknown names return an endpoint-less configuration rather than an
    /// error, so callers treat "not found" the same as "no endpoints".
    pub fn get(&self, name: &str) -> ServiceConfig {
        self.services
            .get(name)
            .cloned()
            .unwrap_or_else(|| ServiceConfig::unknown(name))
    }

    /// Registered service names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_comes_before_fallbacks() {
        let registry = ServiceRegistry::new(&Settings::default());
        let config = registry.get("ip_lookup");
        let urls: Vec<_> = config.endpoints().map(|e| e.url.as_str()).collect();
        assert_eq!(urls.len(), 3);
        assert!(urls[0].starts_with("https://ip-api.com"));
        assert!(urls[1].starts_with("https://freeipapi.com"));
    }

    #[test]
    fn unknown_service_has_no_endpoints() {
        let registry = ServiceRegistry::new(&Settings::default());
        let config = registry.get("does_not_exist");
        assert_eq!(config.name, "does_not_exist");
        assert_eq!(config.endpoints().count(), 0);
        assert!(config.enabled);
    }

    #[test]
    fn placeholder_substitution() {
        let ep = Endpoint::new("https://ip-api.com/json/{}?fields=country", Provider::IpApi);
        assert_eq!(
            ep.fill("8.8.8.8"),
            "https://ip-api.com/json/8.8.8.8?fields=country"
        );
        // No placeholder means the URL passes through untouched.
        let ep = Endpoint::new("https://api.quotable.io/random", Provider::Quotable);
        assert_eq!(ep.fill("x"), "https://api.quotable.io/random");
    }

    #[test]
    fn api_keys_resolve_from_settings() {
        let settings = Settings {
            weather_api_key: "wk".into(),
            ..Settings::default()
        };
        let registry = ServiceRegistry::new(&settings);
        assert_eq!(registry.get("weather").api_key.as_deref(), Some("wk"));
        // Empty key stays unset so tools can report it missing.
        assert_eq!(registry.get("news").api_key, None);
    }

    #[test]
    fn local_rates_endpoint_is_marked_local() {
        let registry = ServiceRegistry::new(&Settings::default());
        let config = registry.get("exchange_rate");
        let locals: Vec<_> = config.endpoints().filter(|e| e.is_local()).collect();
        assert_eq!(locals.len(), 1);
        assert_eq!(locals[0].provider, Provider::LocalRates);
    }
}
