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

//! Static markup analyzers
//!
//! Each analyzer is a fixed table of [`Check`] descriptors evaluated in order
//! against a parsed [`PageDocument`]. Checks are pure: a missing element is a
//! failing result, never an error.

pub mod body;
pub mod head;

use crate::document::PageDocument;
use crate::models::{AnalyzerName, CheckResult};
use std::sync::Arc;

pub use body::BodyAnalyzer;
pub use head::HeadAnalyzer;

/// Verdict and explanation produced by a check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub pass: bool,
    pub description: String,
}

impl Evaluation {
    pub fn new(pass: bool, description: impl Into<String>) -> Self {
        Self {
            pass,
            description: description.into(),
        }
    }

    pub fn pass(description: impl Into<String>) -> Self {
        Self::new(true, description)
    }

    pub fn fail(description: impl Into<String>) -> Self {
        Self::new(false, description)
    }
}

/// A single check descriptor
pub struct Check {
    pub title: &'static str,
    pub category: &'static str,
    pub evaluate: fn(&PageDocument) -> Evaluation,
}

impl Check {
    pub fn run(&self, document: &PageDocument) -> CheckResult {
        let evaluation = (self.evaluate)(document);
        CheckResult::new(self.title, evaluation.description, evaluation.pass, self.category)
    }
}

/// Analyzer over the fetched markup
pub trait StaticAnalyzer: Send + Sync {
    fn name(&self) -> AnalyzerName;

    /// Checks in presentation order
    fn checks(&self) -> &'static [Check];

    fn analyze(&self, document: &PageDocument) -> Vec<CheckResult> {
        self.checks().iter().map(|check| check.run(document)).collect()
    }

    fn analyze_markup(&self, markup: &str) -> Vec<CheckResult> {
        self.analyze(&PageDocument::parse(markup))
    }
}

/// The analyzer set used for every request
pub fn default_analyzers() -> Vec<Arc<dyn StaticAnalyzer>> {
    vec![Arc::new(HeadAnalyzer), Arc::new(BodyAnalyzer)]
}

/// Text length in characters, not bytes
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}
