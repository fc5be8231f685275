// Pagescope
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Health check handlers

use crate::error::{ApiBody, ApiResult, json_response};
use crate::streaming::{StreamInfo, StreamMetricsSnapshot, StreamRegistry};
use chrono::{DateTime, Utc};
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub active_streams: usize,
    pub audit_enabled: bool,
}

/// API version information
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiVersion {
    pub version: String,
    pub build: String,
    pub features: Vec<String>,
}

/// Stream metrics response
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamsResponse {
    #[serde(flatten)]
    pub metrics: StreamMetricsSnapshot,
    pub max_streams: usize,
    pub streams: Vec<StreamInfo>,
}

/// Health check handler
/// GET /api/v1/health
pub fn health_check(registry: &StreamRegistry, audit_enabled: bool) -> ApiResult<Response<ApiBody>> {
    info!("Processing health check request");

    let health_response = HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_streams: registry.active_count(),
        audit_enabled,
    };

    json_response(StatusCode::OK, &health_response)
}

/// Version information handler
/// GET /api/v1/version
pub fn version_info(audit_enabled: bool) -> ApiResult<Response<ApiBody>> {
    info!("Processing version info request");

    let mut features = vec!["static_analysis".to_string(), "sse_streaming".to_string()];
    if audit_enabled {
        features.push("lighthouse_audit".to_string());
    }

    let version_info = ApiVersion {
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: format!("{}+{}", env!("CARGO_PKG_VERSION"), option_env!("GIT_HASH").unwrap_or("unknown")),
        features,
    };

    json_response(StatusCode::OK, &version_info)
}

/// Stream metrics handler
/// GET /api/v1/streams
pub fn stream_metrics(registry: &StreamRegistry) -> ApiResult<Response<ApiBody>> {
    let response = StreamsResponse {
        metrics: registry.snapshot(),
        max_streams: registry.max_streams(),
        streams: registry.streams(),
    };

    json_response(StatusCode::OK, &response)
}
