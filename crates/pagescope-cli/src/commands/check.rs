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

//! Offline checklist over a local file or a fetched page

use super::CommandContext;
use anyhow::{Context, Result};
use pagescope_core::{AnalysisRequest, CheckResult, HttpFetcher, PageDocument, PageFetcher, default_analyzers};
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

pub async fn run_check(ctx: &CommandContext, target: &str, json: bool) -> Result<()> {
    let markup = load_markup(ctx, target).await?;
    let document = PageDocument::parse(&markup);

    let mut by_analyzer = Map::new();
    let mut all = Vec::new();
    for analyzer in default_analyzers() {
        let results = analyzer.analyze(&document);
        by_analyzer.insert(analyzer.name().to_string(), serde_json::to_value(&results)?);
        all.extend(results);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&Value::Object(by_analyzer))?);
    } else {
        print!("{}", render_checklist(target, &all));
    }

    Ok(())
}

/// Local file if it exists, otherwise fetch `target` as a URL
async fn load_markup(ctx: &CommandContext, target: &str) -> Result<String> {
    let path = Path::new(target);
    if path.is_file() {
        info!("Reading markup from {}", path.display());
        return tokio::fs::read_to_string(path).await.with_context(|| format!("failed to read {}", path.display()));
    }

    let request = AnalysisRequest::parse(Some(target)).with_context(|| format!("'{}' is neither a readable file nor a valid URL", target))?;
    let fetcher = HttpFetcher::from_config(&ctx.config)?;
    let page = fetcher.fetch(&request.url).await.with_context(|| format!("failed to fetch {}", request.as_str()))?;
    Ok(page.body)
}

/// Human-readable checklist grouped by category, in first-seen order
pub fn render_checklist(target: &str, results: &[CheckResult]) -> String {
    let mut categories: Vec<&str> = Vec::new();
    for result in results {
        if !categories.contains(&result.category.as_str()) {
            categories.push(&result.category);
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "Checklist for {}", target);
    for category in categories {
        let _ = writeln!(out, "\n{}", category);
        for result in results.iter().filter(|r| r.category == category) {
            let mark = if result.pass { "✅" } else { "❌" };
            let _ = writeln!(out, "  {} {}: {}", mark, result.title, result.description);
        }
    }

    let passed = results.iter().filter(|r| r.pass).count();
    let _ = writeln!(out, "\n{}/{} checks passed", passed, results.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagescope_core::AnalysisConfig;
    use std::io::Write;

    #[test]
    fn test_checklist_groups_by_category() {
        let results = vec![
            CheckResult::new("Title Tag", "ok", true, "Head"),
            CheckResult::new("Images", "2 missing", false, "Content"),
            CheckResult::new("Canonical", "missing", false, "Head"),
        ];

        let rendered = render_checklist("page.html", &results);

        let head = rendered.find("\nHead\n").unwrap();
        let content = rendered.find("\nContent\n").unwrap();
        assert!(head < content);
        assert!(rendered.contains("  ✅ Title Tag: ok"));
        assert!(rendered.contains("  ❌ Canonical: missing"));
        assert!(rendered.ends_with("1/3 checks passed\n"));
    }

    #[tokio::test]
    async fn test_local_file_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<html><head><title>Local</title></head></html>").unwrap();
        let ctx = CommandContext { config: AnalysisConfig::default() };

        let markup = load_markup(&ctx, file.path().to_str().unwrap()).await.unwrap();
        assert!(markup.contains("<title>Local</title>"));
    }

    #[tokio::test]
    async fn test_unreadable_target_is_rejected() {
        let ctx = CommandContext { config: AnalysisConfig::default() };
        let err = load_markup(&ctx, "definitely/not/here.html").await.unwrap_err();
        assert!(err.to_string().contains("neither a readable file nor a valid URL"));
    }
}
