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

//! Data models shared by the analyzers, the orchestrator and the transports

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use url::Url;

// ====== Check Results ======

/// Outcome of a single check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Check title, unique within one analyzer's output
    pub title: String,

    /// Human-readable explanation including the observed values
    pub description: String,

    /// Whether the page passed the check
    pub pass: bool,

    /// Grouping label used for presentation
    pub category: String,
}

impl CheckResult {
    pub fn new(title: impl Into<String>, description: impl Into<String>, pass: bool, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            pass,
            category: category.into(),
        }
    }
}

/// Identifies the analyzer that produced a partial result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerName {
    /// Structural / head section analyzer
    Head,
    /// Content / body analyzer
    Body,
    /// Dynamic rendering audit
    Audit,
}

impl AnalyzerName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerName::Head => "head",
            AnalyzerName::Body => "body",
            AnalyzerName::Audit => "audit",
        }
    }

    /// Name of the stream event announcing this analyzer's results
    pub fn event_name(&self) -> &'static str {
        match self {
            AnalyzerName::Head => "head_checks_complete",
            AnalyzerName::Body => "body_checks_complete",
            AnalyzerName::Audit => "audit_complete",
        }
    }
}

impl std::fmt::Display for AnalyzerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ====== Requests ======

/// A validated analysis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub url: Url,
}

impl AnalysisRequest {
    /// Validate a raw address parameter
    ///
    /// Only absolute `http` and `https` URLs are accepted.
    pub fn parse(raw: Option<&str>) -> Result<Self, InputError> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or(InputError::MissingUrl)?;

        let url = Url::parse(raw).map_err(|e| InputError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(Self { url }),
            scheme => Err(InputError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", scheme),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

// ====== Audit Reports ======

/// Lighthouse categories requested from the rendering engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AuditCategory {
    #[serde(rename = "performance")]
    Performance,
    #[serde(rename = "accessibility")]
    Accessibility,
    #[serde(rename = "best-practices")]
    BestPractices,
    #[serde(rename = "seo")]
    Seo,
}

impl AuditCategory {
    pub const ALL: [AuditCategory; 4] = [AuditCategory::Performance, AuditCategory::Accessibility, AuditCategory::BestPractices, AuditCategory::Seo];

    /// Category id as used by Lighthouse
    pub fn id(&self) -> &'static str {
        match self {
            AuditCategory::Performance => "performance",
            AuditCategory::Accessibility => "accessibility",
            AuditCategory::BestPractices => "best-practices",
            AuditCategory::Seo => "seo",
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            AuditCategory::Performance => "Performance",
            AuditCategory::Accessibility => "Accessibility",
            AuditCategory::BestPractices => "Best Practices",
            AuditCategory::Seo => "SEO",
        }
    }
}

/// Presentation verdict for a single audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Pass,
    Fail,
    Warning,
    NotApplicable,
    Info,
}

/// A single scored audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub score: Option<f64>,
    pub display_value: String,
    pub score_display_mode: String,
    pub verdict: Verdict,
}

/// Audits belonging to one category, in report order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAudits {
    pub title: String,
    pub audits: Vec<AuditItem>,
}

/// Result of one dynamic rendering audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Category scores as integer percentages
    pub scores: BTreeMap<AuditCategory, u8>,

    /// Per-category audit lists
    pub audits: BTreeMap<AuditCategory, CategoryAudits>,

    /// Reason the audit was degraded, if it failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditReport {
    /// Zero-scored report standing in for a failed audit
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            scores: AuditCategory::ALL.into_iter().map(|c| (c, 0)).collect(),
            audits: BTreeMap::new(),
            error: Some(reason.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    pub fn score(&self, category: AuditCategory) -> u8 {
        self.scores.get(&category).copied().unwrap_or(0)
    }

    /// Flatten the audits into check results, category by category
    pub fn to_check_results(&self) -> Vec<CheckResult> {
        self.audits
            .values()
            .flat_map(|category| {
                category.audits.iter().map(move |audit| {
                    let description = if audit.display_value.is_empty() {
                        audit.description.clone()
                    } else {
                        format!("{} ({})", audit.description, audit.display_value)
                    };
                    CheckResult::new(&audit.title, description, audit.verdict == Verdict::Pass, format!("Lighthouse / {}", category.title))
                })
            })
            .collect()
    }
}

// ====== Stream Events ======

/// User-facing failure classification carried by `analysis_error` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    #[serde(rename = "missing_url")]
    MissingUrl,
    #[serde(rename = "invalid_url")]
    InvalidUrl,
    #[serde(rename = "timeout_error")]
    Timeout,
    #[serde(rename = "dns_error")]
    Dns,
    #[serde(rename = "blocked_error")]
    Blocked,
    #[serde(rename = "not_found")]
    NotFound,
    #[serde(rename = "server_error")]
    ServerError,
    #[serde(rename = "generic_fetch_error")]
    GenericFetch,
    #[serde(rename = "network_error")]
    Network,
    #[serde(rename = "internal_error")]
    Internal,
}

impl FailureKind {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16) -> Self {
        match status {
            403 => FailureKind::Blocked,
            404 => FailureKind::NotFound,
            500..=599 => FailureKind::ServerError,
            _ => FailureKind::GenericFetch,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MissingUrl => "missing_url",
            FailureKind::InvalidUrl => "invalid_url",
            FailureKind::Timeout => "timeout_error",
            FailureKind::Dns => "dns_error",
            FailureKind::Blocked => "blocked_error",
            FailureKind::NotFound => "not_found",
            FailureKind::ServerError => "server_error",
            FailureKind::GenericFetch => "generic_fetch_error",
            FailureKind::Network => "network_error",
            FailureKind::Internal => "internal_error",
        }
    }

    /// Message shown to the caller; technical detail is only logged
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureKind::MissingUrl => "Please provide a website address to analyze.",
            FailureKind::InvalidUrl => "The website address is not a valid http(s) URL.",
            FailureKind::Timeout => "The website took too long to respond. Please try again later.",
            FailureKind::Dns => "Couldn't find the website's address. Check for typos in the URL.",
            FailureKind::Blocked => "The website blocked our analysis. Please try another URL.",
            FailureKind::NotFound => "The website page was not found. Please check the URL.",
            FailureKind::ServerError => "The website's server encountered an error. Please try again later.",
            FailureKind::GenericFetch => "We couldn't analyze the website. It might be down or blocking our tool.",
            FailureKind::Network => "Something went wrong connecting to the website. Check your internet or the URL.",
            FailureKind::Internal => "Something went wrong while analyzing the website. Please try again.",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event delivered to the caller while a request is analyzed
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// One analyzer finished
    Partial {
        source: AnalyzerName,
        results: Vec<CheckResult>,
        report: Option<AuditReport>,
    },

    /// Every analyzer finished
    Complete { total_results: usize },

    /// The request could not be analyzed
    Failed { kind: FailureKind, message: String, url: Option<String> },
}

impl StreamEvent {
    pub fn failed(kind: FailureKind, url: Option<&str>) -> Self {
        StreamEvent::Failed {
            kind,
            message: kind.user_message().to_string(),
            url: url.map(str::to_string),
        }
    }

    /// Wire event name
    pub fn event_name(&self) -> &'static str {
        match self {
            StreamEvent::Partial { source, .. } => source.event_name(),
            StreamEvent::Complete { .. } => "analysis_complete",
            StreamEvent::Failed { .. } => "analysis_error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Partial { .. })
    }

    pub fn result_count(&self) -> usize {
        match self {
            StreamEvent::Partial { results, .. } => results.len(),
            _ => 0,
        }
    }

    /// JSON payload carried in the event's `data` field
    pub fn payload(&self) -> Value {
        match self {
            StreamEvent::Partial { source, results, report } => {
                let mut payload = json!({
                    "source": source,
                    "results": results,
                });
                if let Some(report) = report {
                    payload["report"] = json!(report);
                }
                payload
            }
            StreamEvent::Complete { total_results } => json!({
                "message": "All analysis complete!",
                "totalResults": total_results,
            }),
            StreamEvent::Failed { kind, message, url } => {
                let mut payload = json!({
                    "type": kind,
                    "message": message,
                });
                if let Some(url) = url {
                    payload["url"] = json!(url);
                }
                payload
            }
        }
    }
}
