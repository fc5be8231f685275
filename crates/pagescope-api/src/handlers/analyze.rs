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

//! Streaming analysis handler

use crate::error::{ApiBody, ApiResult};
use crate::streaming::{SseStream, StreamRegistry, sse_response};
use hyper::Response;
use pagescope_core::{AnalysisOrchestrator, ChannelSink};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Start an analysis and stream its events
/// GET /analyze?url=<address>
///
/// A missing `url` is not an HTTP error: the stream carries a single
/// `analysis_error` event instead.
pub async fn analyze(params: &HashMap<String, String>, orchestrator: Arc<AnalysisOrchestrator>, registry: &Arc<StreamRegistry>, buffer_size: usize) -> ApiResult<Response<ApiBody>> {
    let url = params.get("url").cloned();

    if url.as_deref().map(str::trim).is_none_or(str::is_empty) {
        // Answered inline without a registry slot, so capacity never hides the error
        let (sink, receiver) = ChannelSink::new(buffer_size);
        orchestrator.run(url.as_deref(), sink).await;
        return sse_response(SseStream::unregistered(receiver));
    }

    let registration = registry.register(url.as_deref())?;

    info!("Processing analysis request {} for {}", registration.id(), url.as_deref().unwrap_or("<none>"));

    let (sink, receiver) = ChannelSink::new(buffer_size);
    tokio::spawn(async move {
        orchestrator.run(url.as_deref(), sink).await;
    });

    sse_response(SseStream::new(receiver, registration))
}
