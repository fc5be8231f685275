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

//! Dynamic rendering audit
//!
//! A [`RenderingEngine`] hands out one [`EngineSession`] per audit. The
//! session lives inside a [`SessionGuard`] so it is shut down on every exit
//! path: success, error, timeout, and cancellation of the owning task.

pub mod chrome;
pub mod report;

use crate::config::AnalysisConfig;
use crate::error::AuditError;
use crate::models::{AuditCategory, AuditReport};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, info, warn};
use url::Url;

pub use chrome::ChromeEngine;

/// Launches rendering engine sessions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RenderingEngine: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn EngineSession>, AuditError>;
}

/// One running engine instance
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngineSession: Send {
    /// Audit `url` and return the raw Lighthouse JSON
    async fn run_audit(&mut self, url: &str, categories: &[AuditCategory]) -> Result<String, AuditError>;

    /// Release the engine; called exactly once per session
    async fn shutdown(&mut self) -> Result<(), AuditError>;
}

/// Owns a session for the duration of one audit
pub struct SessionGuard {
    session: Option<Box<dyn EngineSession>>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn EngineSession>) -> Self {
        Self { session: Some(session) }
    }

    pub async fn run_audit(&mut self, url: &str, categories: &[AuditCategory]) -> Result<String, AuditError> {
        match self.session.as_mut() {
            Some(session) => session.run_audit(url, categories).await,
            None => Err(AuditError::Run("engine session already released".to_string())),
        }
    }

    /// Shut the session down; failures are logged, never returned
    pub async fn release(mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.shutdown().await {
                warn!("Failed to release rendering engine session: {}", e);
            } else {
                debug!("Rendering engine session released");
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        // Reached only when the owning future was dropped mid-audit.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Audit cancelled, releasing rendering engine session in background");
                handle.spawn(async move {
                    if let Err(e) = session.shutdown().await {
                        warn!("Failed to release cancelled rendering engine session: {}", e);
                    }
                });
            }
            Err(_) => warn!("No runtime available to release rendering engine session"),
        }
    }
}

/// Produces an audit report for an address
#[async_trait]
pub trait PageAuditor: Send + Sync {
    /// Never fails: errors become a degraded report
    async fn audit(&self, url: &Url) -> AuditReport;
}

/// Lighthouse audit over a pluggable rendering engine
pub struct LighthouseAuditor {
    engine: Arc<dyn RenderingEngine>,
    timeout: Duration,
}

impl LighthouseAuditor {
    pub fn new(engine: Arc<dyn RenderingEngine>, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    /// Headless Chrome + Lighthouse CLI as configured
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(Arc::new(ChromeEngine::from_config(config)), config.audit_timeout())
    }

    pub async fn try_audit(&self, url: &str) -> Result<AuditReport, AuditError> {
        let session = time::timeout(self.timeout, self.engine.launch()).await.map_err(|_| AuditError::Timeout(self.timeout))??;
        let mut guard = SessionGuard::new(session);

        let raw = time::timeout(self.timeout, guard.run_audit(url, &AuditCategory::ALL)).await;
        guard.release().await;

        let raw = raw.map_err(|_| AuditError::Timeout(self.timeout))??;
        report::parse_report(&raw)
    }
}

#[async_trait]
impl PageAuditor for LighthouseAuditor {
    async fn audit(&self, url: &Url) -> AuditReport {
        info!("Starting Lighthouse audit for {}", url);

        match self.try_audit(url.as_str()).await {
            Ok(report) => {
                info!("Lighthouse audit complete for {}", url);
                report
            }
            Err(e) => {
                warn!("Lighthouse analysis failed for {}: {}", url, e);
                AuditReport::degraded(format!("Lighthouse failed: {}", e))
            }
        }
    }
}
