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

//! Mapping from a raw Lighthouse result to an [`AuditReport`]

use crate::error::AuditError;
use crate::models::{AuditCategory, AuditItem, AuditReport, CategoryAudits, Verdict};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// Audit refs in this group are raw timings without a verdict
const METRICS_GROUP: &str = "metrics";
const NOT_APPLICABLE: &str = "notApplicable";

#[derive(Debug, Deserialize)]
struct LighthouseResult {
    #[serde(default)]
    categories: HashMap<String, LhrCategory>,
    #[serde(default)]
    audits: HashMap<String, LhrAudit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LhrCategory {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    audit_refs: Vec<LhrAuditRef>,
}

#[derive(Debug, Deserialize)]
struct LhrAuditRef {
    id: String,
    #[serde(default)]
    group: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LhrAudit {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    display_value: Option<String>,
    #[serde(default)]
    score_display_mode: Option<String>,
}

/// Parse Lighthouse JSON output
pub fn parse_report(raw: &str) -> Result<AuditReport, AuditError> {
    let lhr: LighthouseResult = serde_json::from_str(raw)?;
    Ok(build_report(&lhr))
}

fn build_report(lhr: &LighthouseResult) -> AuditReport {
    let mut scores = BTreeMap::new();
    let mut audits = BTreeMap::new();

    for category in AuditCategory::ALL {
        let lhr_category = lhr.categories.get(category.id());
        scores.insert(category, score_percent(lhr_category.and_then(|c| c.score)));

        let Some(lhr_category) = lhr_category else {
            continue;
        };

        let items = lhr_category
            .audit_refs
            .iter()
            .filter(|audit_ref| audit_ref.group.as_deref() != Some(METRICS_GROUP))
            .filter_map(|audit_ref| lhr.audits.get(&audit_ref.id))
            .map(to_item)
            .collect();

        audits.insert(
            category,
            CategoryAudits {
                title: lhr_category.title.clone().unwrap_or_else(|| category.default_title().to_string()),
                audits: items,
            },
        );
    }

    AuditReport { scores, audits, error: None }
}

fn to_item(audit: &LhrAudit) -> AuditItem {
    let mode = audit.score_display_mode.clone().unwrap_or_default();
    AuditItem {
        id: audit.id.clone(),
        title: audit.title.clone(),
        description: strip_learn_more(&audit.description),
        score: audit.score,
        display_value: audit.display_value.clone().unwrap_or_default(),
        verdict: verdict(audit.score, &mode),
        score_display_mode: mode,
    }
}

/// Category score (0.0-1.0) as a rounded percentage; absent scores count as 0
pub fn score_percent(score: Option<f64>) -> u8 {
    score.map(|s| (s * 100.0).round().clamp(0.0, 100.0) as u8).unwrap_or(0)
}

pub fn verdict(score: Option<f64>, score_display_mode: &str) -> Verdict {
    let not_applicable = score_display_mode == NOT_APPLICABLE;
    match score {
        Some(s) if s == 1.0 => Verdict::Pass,
        Some(s) if s == 0.0 => Verdict::Fail,
        Some(s) if s > 0.0 && s < 1.0 && !not_applicable => Verdict::Warning,
        _ if not_applicable => Verdict::NotApplicable,
        _ => Verdict::Info,
    }
}

fn strip_learn_more(description: &str) -> String {
    static LEARN_MORE: OnceLock<Regex> = OnceLock::new();
    let re = LEARN_MORE.get_or_init(|| Regex::new(r"\[Learn more[^\]]*\]\([^)]*\)\.?").expect("learn-more pattern is valid"));
    re.replace_all(description, "").trim().to_string()
}
