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

//! Event sinks: where a request's stream events are delivered

use crate::error::SinkError;
use crate::models::StreamEvent;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Ordered, per-request event channel
#[async_trait]
pub trait EventSink: Send {
    /// Deliver one event; `Disconnected` once the receiver is gone
    async fn emit(&mut self, event: StreamEvent) -> Result<(), SinkError>;

    /// End the stream
    async fn close(&mut self);
}

/// Sink backed by a bounded tokio channel
#[derive(Debug)]
pub struct ChannelSink {
    sender: Option<mpsc::Sender<StreamEvent>>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender: Some(sender) }, receiver)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&mut self, event: StreamEvent) -> Result<(), SinkError> {
        let sender = self.sender.as_ref().ok_or(SinkError::Disconnected)?;
        sender.send(event).await.map_err(|_| SinkError::Disconnected)
    }

    async fn close(&mut self) {
        self.sender.take();
    }
}

#[derive(Debug, Default)]
struct Recorded {
    events: Vec<StreamEvent>,
    closes: usize,
}

/// In-memory sink; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Recorded>>,
    disconnect_after: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose receiver goes away after `n` accepted events
    pub fn disconnecting_after(n: usize) -> Self {
        Self {
            inner: Arc::default(),
            disconnect_after: Some(n),
        }
    }

    pub fn events(&self) -> Vec<StreamEvent> {
        self.inner.lock().events.clone()
    }

    pub fn close_count(&self) -> usize {
        self.inner.lock().closes
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn emit(&mut self, event: StreamEvent) -> Result<(), SinkError> {
        let mut recorded = self.inner.lock();
        if self.disconnect_after.is_some_and(|limit| recorded.events.len() >= limit) {
            return Err(SinkError::Disconnected);
        }
        recorded.events.push(event);
        Ok(())
    }

    async fn close(&mut self) {
        self.inner.lock().closes += 1;
    }
}
