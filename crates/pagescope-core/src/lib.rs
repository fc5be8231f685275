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

//! Pagescope analysis core
//!
//! Fetches a single page, runs the static markup analyzers and the dynamic
//! Lighthouse audit against it concurrently, and streams each analyzer's
//! result to an [`sink::EventSink`] as soon as it is available.

pub mod analyzers;
pub mod audit;
pub mod config;
pub mod document;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod orchestrator;
pub mod sink;

pub use analyzers::{StaticAnalyzer, default_analyzers};
pub use audit::{ChromeEngine, LighthouseAuditor, PageAuditor, RenderingEngine};
pub use config::AnalysisConfig;
pub use document::PageDocument;
pub use error::{AnalysisError, AuditError, FetchError, InputError, SinkError};
pub use fetcher::{FetchOutcome, FetchedPage, HttpFetcher, PageFetcher};
pub use models::{AnalysisRequest, AnalyzerName, AuditReport, CheckResult, FailureKind, StreamEvent};
pub use orchestrator::{AnalysisOrchestrator, AnalysisOutcome, AnalysisState};
pub use sink::{ChannelSink, EventSink, MemorySink};
