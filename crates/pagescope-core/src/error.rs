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

//! Error types for the analysis pipeline

use crate::models::FailureKind;
use std::time::Duration;
use thiserror::Error;

/// Invalid analysis input, detected before any network access
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("No URL was provided")]
    MissingUrl,

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Classified failure to retrieve the page markup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("DNS resolution failed: {0}")]
    Dns(String),

    #[error("Failed to fetch URL (Status: {status}). Response body preview: {detail}")]
    Http { status: u16, detail: String },

    #[error("Network error: {0}")]
    Network(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Timeout(_) => FailureKind::Timeout,
            FetchError::Dns(_) => FailureKind::Dns,
            FetchError::Http { status, .. } => FailureKind::from_status(*status),
            FetchError::Network(_) => FailureKind::Network,
        }
    }
}

/// Failure of the dynamic rendering audit
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Failed to launch rendering engine: {0}")]
    Launch(String),

    #[error("Audit run failed: {0}")]
    Run(String),

    #[error("Audit timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid audit report: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to deliver an event to the caller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("Event stream receiver disconnected")]
    Disconnected,
}

/// Terminal failure of a whole analysis request
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Internal analyzer fault: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// User-facing classification of this failure
    pub fn kind(&self) -> FailureKind {
        match self {
            AnalysisError::Input(InputError::MissingUrl) => FailureKind::MissingUrl,
            AnalysisError::Input(InputError::InvalidUrl { .. }) => FailureKind::InvalidUrl,
            AnalysisError::Fetch(e) => e.kind(),
            AnalysisError::Internal(_) => FailureKind::Internal,
        }
    }
}
