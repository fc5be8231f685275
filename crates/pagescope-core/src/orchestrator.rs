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

//! Analysis orchestrator
//!
//! Drives one request through `Idle → Fetching → {Analyzing, Failed} →
//! Completed`. Analyzer results are emitted in completion order and the sink
//! is closed exactly once, whatever the outcome.

use crate::analyzers::{StaticAnalyzer, default_analyzers};
use crate::audit::{LighthouseAuditor, PageAuditor};
use crate::config::AnalysisConfig;
use crate::document::PageDocument;
use crate::error::{AnalysisError, FetchError};
use crate::fetcher::{HttpFetcher, PageFetcher};
use crate::models::{AnalysisRequest, AnalyzerName, AuditReport, FailureKind, StreamEvent};
use crate::sink::EventSink;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::task::{Id, JoinSet};
use tracing::{debug, error, info, warn};

/// Lifecycle of a single analysis request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Idle,
    Fetching,
    Analyzing,
    Failed,
    Completed,
}

impl fmt::Display for AnalysisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisState::Idle => "idle",
            AnalysisState::Fetching => "fetching",
            AnalysisState::Analyzing => "analyzing",
            AnalysisState::Failed => "failed",
            AnalysisState::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// How a request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// Every analyzer reported and the summary was delivered
    Completed { total_results: usize },

    /// A terminal error event was delivered
    Failed { kind: FailureKind },

    /// The caller went away before the terminal event
    Disconnected,
}

/// Fans one fetched page out to every analyzer and streams the results
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    analyzers: Vec<Arc<dyn StaticAnalyzer>>,
    auditor: Option<Arc<dyn PageAuditor>>,
}

impl AnalysisOrchestrator {
    /// Default static analyzers, no dynamic audit
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            analyzers: default_analyzers(),
            auditor: None,
        }
    }

    pub fn with_analyzers(mut self, analyzers: Vec<Arc<dyn StaticAnalyzer>>) -> Self {
        self.analyzers = analyzers;
        self
    }

    pub fn with_auditor(mut self, auditor: Arc<dyn PageAuditor>) -> Self {
        self.auditor = Some(auditor);
        self
    }

    pub fn without_audit(mut self) -> Self {
        self.auditor = None;
        self
    }

    /// HTTP fetcher, default analyzers, and the Lighthouse audit when enabled
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, FetchError> {
        let orchestrator = Self::new(Arc::new(HttpFetcher::from_config(config)?));
        if config.audit_enabled {
            Ok(orchestrator.with_auditor(Arc::new(LighthouseAuditor::from_config(config))))
        } else {
            Ok(orchestrator)
        }
    }

    /// Analyze `raw_url`, streaming every event into `sink`, then close it
    pub async fn run<S: EventSink>(&self, raw_url: Option<&str>, mut sink: S) -> AnalysisOutcome {
        let outcome = self.drive(raw_url, &mut sink).await;
        sink.close().await;
        info!("Analysis of {} finished: {:?}", raw_url.unwrap_or("<none>"), outcome);
        outcome
    }

    async fn drive<S: EventSink>(&self, raw_url: Option<&str>, sink: &mut S) -> AnalysisOutcome {
        let mut state = AnalysisState::Idle;

        let request = match AnalysisRequest::parse(raw_url) {
            Ok(request) => request,
            Err(e) => {
                advance(&mut state, AnalysisState::Failed);
                return fail(sink, AnalysisError::from(e), raw_url.map(str::trim).filter(|u| !u.is_empty())).await;
            }
        };

        advance(&mut state, AnalysisState::Fetching);
        info!("Starting analysis for {}", request.as_str());

        let page = match self.fetcher.fetch(&request.url).await {
            Ok(page) => page,
            Err(e) => {
                advance(&mut state, AnalysisState::Failed);
                return fail(sink, AnalysisError::from(e), Some(request.as_str())).await;
            }
        };

        advance(&mut state, AnalysisState::Analyzing);
        let body: Arc<str> = Arc::from(page.body);
        let mut tasks = JoinSet::new();
        let mut sources: HashMap<Id, AnalyzerName> = HashMap::new();

        for analyzer in &self.analyzers {
            let analyzer = analyzer.clone();
            let body = body.clone();
            let name = analyzer.name();
            let handle = tasks.spawn_blocking(move || {
                let document = PageDocument::parse(&body);
                StreamEvent::Partial {
                    source: name,
                    results: analyzer.analyze(&document),
                    report: None,
                }
            });
            sources.insert(handle.id(), name);
        }

        if let Some(auditor) = &self.auditor {
            let auditor = auditor.clone();
            let url = request.url.clone();
            let handle = tasks.spawn(async move {
                let report = auditor.audit(&url).await;
                audit_event(report)
            });
            sources.insert(handle.id(), AnalyzerName::Audit);
        }

        debug!("Spawned {} analyzer(s) for {}", sources.len(), request.as_str());

        let mut total_results = 0;
        while let Some(joined) = tasks.join_next().await {
            let event = match joined {
                Ok(event) => event,
                Err(e) => match sources.get(&e.id()).copied() {
                    Some(source) => {
                        error!("{} analyzer faulted for {}: {}", source, request.as_str(), e);
                        contained_fault(source)
                    }
                    None => {
                        advance(&mut state, AnalysisState::Failed);
                        let fault = AnalysisError::Internal(e.to_string());
                        return fail(sink, fault, Some(request.as_str())).await;
                    }
                },
            };

            total_results += event.result_count();
            debug!("Emitting {} ({} results)", event.event_name(), event.result_count());
            if sink.emit(event).await.is_err() {
                warn!("Client disconnected during analysis of {}, abandoning remaining analyzers", request.as_str());
                return AnalysisOutcome::Disconnected;
            }
        }

        advance(&mut state, AnalysisState::Completed);
        if sink.emit(StreamEvent::Complete { total_results }).await.is_err() {
            warn!("Client disconnected before completion of {}", request.as_str());
            return AnalysisOutcome::Disconnected;
        }

        AnalysisOutcome::Completed { total_results }
    }
}

fn advance(state: &mut AnalysisState, next: AnalysisState) {
    debug!("Analysis state {} -> {}", state, next);
    *state = next;
}

fn audit_event(report: AuditReport) -> StreamEvent {
    StreamEvent::Partial {
        source: AnalyzerName::Audit,
        results: report.to_check_results(),
        report: Some(report),
    }
}

/// Partial event standing in for an analyzer that panicked
fn contained_fault(source: AnalyzerName) -> StreamEvent {
    match source {
        AnalyzerName::Audit => audit_event(AuditReport::degraded("Audit task failed unexpectedly")),
        _ => StreamEvent::Partial {
            source,
            results: Vec::new(),
            report: None,
        },
    }
}

async fn fail<S: EventSink>(sink: &mut S, err: AnalysisError, url: Option<&str>) -> AnalysisOutcome {
    let kind = err.kind();
    match &err {
        AnalysisError::Internal(_) => error!("Analysis of {} aborted: {}", url.unwrap_or("<none>"), err),
        _ => warn!("Analysis of {} failed ({}): {}", url.unwrap_or("<none>"), kind, err),
    }

    match sink.emit(StreamEvent::failed(kind, url)).await {
        Ok(()) => AnalysisOutcome::Failed { kind },
        Err(_) => AnalysisOutcome::Disconnected,
    }
}
