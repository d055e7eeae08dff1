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

//! Unified error classification for endpoint attempts.
//!
//! Every failed attempt is mapped to a stable category and a fixed
//! human-readable message of the form `"<service> temporarily unavailable:
//! <suffix>"`. Classification also emits one structured log record; the log
//! is a side effect only and never drives control flow.

use thiserror::Error;
use tracing::error;

/// Failure from a single endpoint attempt.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("response decode failed: {0}")]
    Decode(String),

    #[error("connection failed: {0}")]
    Connect(String),

    /// Caller-supplied parameter failed validation. Reported immediately,
    /// never fed through the fallback loop.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Stable failure category, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Timeout,
    HttpStatus,
    Decode,
    Connect,
    InvalidInput,
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::HttpStatus => "http_status",
            ErrorCategory::Decode => "decode",
            ErrorCategory::Connect => "connect",
            ErrorCategory::InvalidInput => "invalid_input",
            ErrorCategory::Other => "other",
        }
    }
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::Timeout => ErrorCategory::Timeout,
            ApiError::Status(_) => ErrorCategory::HttpStatus,
            ApiError::Decode(_) => ErrorCategory::Decode,
            ApiError::Connect(_) => ErrorCategory::Connect,
            ApiError::InvalidInput(_) => ErrorCategory::InvalidInput,
            ApiError::Other(_) => ErrorCategory::Other,
        }
    }

    /// Shape mismatch in an otherwise well-formed response. Treated the same
    /// as a decode failure: the gateway moves on to the next endpoint.
    pub fn unexpected_shape(detail: impl Into<String>) -> Self {
        ApiError::Decode(detail.into())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        // Detection priority: timeout, HTTP status, decode, connect, other.
        if e.is_timeout() {
            ApiError::Timeout
        } else if let Some(status) = e.status() {
            ApiError::Status(status.as_u16())
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if e.is_connect() {
            ApiError::Connect(e.to_string())
        } else {
            ApiError::Other(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

/// Format the user-facing message for a failed attempt and emit the matching
/// structured log record.
pub fn describe_failure(err: &ApiError, service: &str, endpoint: &str) -> String {
    let category = err.category();
    error!(
        service = service,
        endpoint = endpoint,
        category = category.as_str(),
        error = %err,
        "endpoint attempt failed"
    );

    let suffix = match err {
        ApiError::Timeout => "request timed out".to_string(),
        ApiError::Status(code) => format!("HTTP {}", code),
        ApiError::Decode(_) => "response could not be decoded".to_string(),
        ApiError::Connect(_) => "connection failed".to_string(),
        ApiError::InvalidInput(detail) => detail.clone(),
        ApiError::Other(detail) => detail.clone(),
    };

    format!("{} temporarily unavailable: {}", service, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_stable() {
        assert_eq!(ApiError::Timeout.category(), ErrorCategory::Timeout);
        assert_eq!(ApiError::Status(502).category(), ErrorCategory::HttpStatus);
        assert_eq!(
            ApiError::Decode("bad json".into()).category(),
            ErrorCategory::Decode
        );
        assert_eq!(
            ApiError::Connect("refused".into()).category(),
            ErrorCategory::Connect
        );
        assert_eq!(
            ApiError::Other("boom".into()).category(),
            ErrorCategory::Other
        );
    }

    #[test]
    fn json_errors_classify_as_decode() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert_eq!(ApiError::from(err).category(), ErrorCategory::Decode);
    }

    #[test]
    fn messages_carry_service_name_and_suffix() {
        let msg = describe_failure(&ApiError::Timeout, "weather", "https://x/y");
        assert_eq!(msg, "weather temporarily unavailable: request timed out");

        let msg = describe_failure(&ApiError::Status(503), "news", "https://x/y");
        assert_eq!(msg, "news temporarily unavailable: HTTP 503");

        let msg = describe_failure(&ApiError::Decode("eof".into()), "quotes", "q");
        assert_eq!(
            msg,
            "quotes temporarily unavailable: response could not be decoded"
        );

        let msg = describe_failure(&ApiError::Connect("refused".into()), "jokes", "j");
        assert_eq!(msg, "jokes temporarily unavailable: connection failed");
    }
}
