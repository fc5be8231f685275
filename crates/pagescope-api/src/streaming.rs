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

//! Server-Sent Events transport and the registry of open analysis streams

use crate::error::{ApiBody, ApiError, ApiResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::Stream;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper::{Response, StatusCode};
use metrics::{counter, gauge};
use pagescope_core::StreamEvent;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One open analysis stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamInfo {
    pub id: String,
    pub url: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Stream counters
#[derive(Default)]
struct StreamMetrics {
    active_streams: RwLock<u64>,
    total_streams: RwLock<u64>,
    events_sent: RwLock<u64>,
    rejected_streams: RwLock<u64>,
}

/// Point-in-time copy of the stream counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMetricsSnapshot {
    pub active_streams: u64,
    pub total_streams: u64,
    pub events_sent: u64,
    pub rejected_streams: u64,
}

/// Process-wide registry of open analysis streams
pub struct StreamRegistry {
    streams: DashMap<String, StreamInfo>,
    metrics: StreamMetrics,
    max_streams: usize,
}

impl StreamRegistry {
    pub fn new(max_streams: usize) -> Self {
        Self {
            streams: DashMap::new(),
            metrics: StreamMetrics::default(),
            max_streams,
        }
    }

    /// Register a new stream; the returned guard removes it when dropped
    pub fn register(self: &Arc<Self>, url: Option<&str>) -> ApiResult<Registration> {
        let mut active = self.metrics.active_streams.write();
        if *active as usize >= self.max_streams {
            drop(active);
            *self.metrics.rejected_streams.write() += 1;
            counter!("pagescope_streams_rejected", 1);
            warn!("Rejecting analysis stream: {} streams already open", self.max_streams);
            return Err(ApiError::ServiceUnavailable {
                message: format!("Too many concurrent analyses (limit {})", self.max_streams),
            });
        }

        let info = StreamInfo {
            id: Uuid::new_v4().to_string(),
            url: url.map(str::to_string),
            started_at: Utc::now(),
        };
        let id = info.id.clone();
        self.streams.insert(id.clone(), info);

        *active += 1;
        gauge!("pagescope_streams_active", *active as f64);
        drop(active);

        *self.metrics.total_streams.write() += 1;
        counter!("pagescope_streams_total", 1);
        debug!("Registered analysis stream {}", id);

        Ok(Registration { id, registry: self.clone() })
    }

    fn deregister(&self, id: &str) {
        if self.streams.remove(id).is_some() {
            let mut active = self.metrics.active_streams.write();
            *active = active.saturating_sub(1);
            gauge!("pagescope_streams_active", *active as f64);
            debug!("Deregistered analysis stream {}", id);
        }
    }

    fn record_event(&self) {
        *self.metrics.events_sent.write() += 1;
        counter!("pagescope_stream_events_sent", 1);
    }

    pub fn active_count(&self) -> usize {
        self.streams.len()
    }

    pub fn max_streams(&self) -> usize {
        self.max_streams
    }

    pub fn streams(&self) -> Vec<StreamInfo> {
        self.streams.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn snapshot(&self) -> StreamMetricsSnapshot {
        StreamMetricsSnapshot {
            active_streams: *self.metrics.active_streams.read(),
            total_streams: *self.metrics.total_streams.read(),
            events_sent: *self.metrics.events_sent.read(),
            rejected_streams: *self.metrics.rejected_streams.read(),
        }
    }
}

/// Registry entry for one stream, removed on drop
pub struct Registration {
    id: String,
    registry: Arc<StreamRegistry>,
}

impl Registration {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.deregister(&self.id);
    }
}

/// SSE body over a request's event channel
///
/// The registration is released when the channel ends (the terminal event was
/// delivered) or when hyper drops the body because the client went away.
pub struct SseStream {
    receiver: mpsc::Receiver<StreamEvent>,
    registration: Option<Registration>,
}

impl SseStream {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>, registration: Registration) -> Self {
        Self {
            receiver,
            registration: Some(registration),
        }
    }

    /// Stream outside the registry, for responses that never start an analysis
    pub fn unregistered(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver, registration: None }
    }
}

impl Stream for SseStream {
    type Item = Result<Frame<Bytes>, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if let Some(registration) = &self.registration {
                    registration.registry.record_event();
                }
                Poll::Ready(Some(Ok(Frame::data(format_sse_event(event.event_name(), &event.payload())))))
            }
            Poll::Ready(None) => {
                if let Some(registration) = self.registration.take() {
                    info!("Analysis stream {} finished", registration.id());
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Format one named Server-Sent Event
pub fn format_sse_event(name: &str, payload: &Value) -> Bytes {
    Bytes::from(format!("event: {}\ndata: {}\n\n", name, payload))
}

/// Create a Server-Sent Events HTTP response
pub fn sse_response(stream: SseStream) -> ApiResult<Response<ApiBody>> {
    let body: ApiBody = StreamBody::new(stream).boxed_unsync();

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/event-stream")
        .header("cache-control", "no-cache")
        .header("connection", "keep-alive")
        .header("x-accel-buffering", "no")
        .body(body)?)
}
