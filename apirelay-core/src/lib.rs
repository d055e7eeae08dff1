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

//! Apirelay Core
//!
//! The multi-endpoint fallback gateway and its companions: the service
//! registry, the unified error classifier, the shared HTTP client and the
//! local backup content used when every remote endpoint is down.

pub mod backup;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;

pub use config::{Endpoint, Provider, ServiceConfig, ServiceRegistry, Settings};
pub use error::{ApiError, ErrorCategory};
pub use gateway::Gateway;
pub use http::HttpClient;
