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

//! HTTP routing for the API

use crate::config::Config;
use crate::error::{ApiBody, ApiError, ApiResult, full_body};
use crate::handlers::{analyze, health};
use crate::streaming::StreamRegistry;
use hyper::header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use pagescope_core::AnalysisOrchestrator;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Paths served by the router, all GET-only
const ROUTES: [&str; 4] = ["/analyze", "/api/v1/health", "/api/v1/version", "/api/v1/streams"];

/// HTTP router for the API
pub struct Router {
    config: Config,
    orchestrator: Arc<AnalysisOrchestrator>,
    registry: Arc<StreamRegistry>,
    cors_origin: HeaderValue,
}

impl Router {
    /// Create a router around an existing orchestrator
    pub fn new(config: Config, orchestrator: AnalysisOrchestrator) -> Self {
        let cors_origin = HeaderValue::from_str(&config.cors_origin).unwrap_or_else(|_| {
            warn!("Invalid CORS origin '{}', falling back to '*'", config.cors_origin);
            HeaderValue::from_static("*")
        });

        Self {
            registry: Arc::new(StreamRegistry::new(config.max_streams)),
            orchestrator: Arc::new(orchestrator),
            config,
            cors_origin,
        }
    }

    /// Create a router with the orchestrator described by `config.analysis`
    pub fn from_config(config: Config) -> ApiResult<Self> {
        let orchestrator = AnalysisOrchestrator::from_config(&config.analysis).map_err(|e| ApiError::InternalServerError {
            message: format!("Failed to initialise analysis pipeline: {}", e),
        })?;
        Ok(Self::new(config, orchestrator))
    }

    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }

    /// Handle a request; errors become problem+json, CORS is always applied
    pub async fn handle<B>(&self, req: Request<B>) -> Response<ApiBody> {
        let path = req.uri().path().to_string();

        let mut response = match self.route(&req).await {
            Ok(response) => response,
            Err(e) => e.into_response(&path),
        };

        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            response.headers_mut().insert(ALLOW, HeaderValue::from_static("GET, OPTIONS"));
        }
        response.headers_mut().insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.cors_origin.clone());
        response
    }

    /// Route a request to the appropriate handler
    pub async fn route<B>(&self, req: &Request<B>) -> ApiResult<Response<ApiBody>> {
        let path = req.uri().path();
        let method = req.method();

        info!("Routing request: {} {}", method, path);

        match (method, path) {
            (&Method::GET, "/analyze") => {
                let params = parse_query_params(req.uri().query().unwrap_or(""));
                analyze::analyze(&params, self.orchestrator.clone(), &self.registry, self.config.stream_buffer_size).await
            }
            (&Method::GET, "/api/v1/health") => health::health_check(&self.registry, self.config.analysis.audit_enabled),
            (&Method::GET, "/api/v1/version") => health::version_info(self.config.analysis.audit_enabled),
            (&Method::GET, "/api/v1/streams") => health::stream_metrics(&self.registry),
            (&Method::OPTIONS, _) => preflight(),
            (_, path) if ROUTES.contains(&path) => Err(ApiError::MethodNotAllowed {
                message: format!("{} is not supported on {}", method, path),
            }),
            _ => Err(ApiError::NotFound {
                message: format!("No route for {} {}", method, path),
            }),
        }
    }
}

fn preflight() -> ApiResult<Response<ApiBody>> {
    let mut response = Response::new(full_body(""));
    *response.status_mut() = StatusCode::NO_CONTENT;
    response.headers_mut().insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, OPTIONS"));
    response.headers_mut().insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Cache-Control, Content-Type"));
    Ok(response)
}

/// Parse query parameters from URL
fn parse_query_params(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            let key = percent_encoding::percent_decode_str(&key.replace('+', " ")).decode_utf8().unwrap_or_default().to_string();
            let value = percent_encoding::percent_decode_str(&value.replace('+', " ")).decode_utf8().unwrap_or_default().to_string();
            params.insert(key, value);
        }
    }

    params
}
