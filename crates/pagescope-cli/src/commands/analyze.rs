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

use super::CommandContext;
use anyhow::{Context, Result};
use pagescope_core::{AnalysisOrchestrator, AnalysisOutcome, ChannelSink, StreamEvent};
use serde_json::json;
use tracing::debug;

const EVENT_BUFFER: usize = 16;

/// Stream a full analysis to stdout, one JSON line per event
pub async fn run_analysis(ctx: &CommandContext, url: &str, no_audit: bool) -> Result<AnalysisOutcome> {
    let mut config = ctx.config.clone();
    if no_audit {
        config.audit_enabled = false;
    }

    let orchestrator = AnalysisOrchestrator::from_config(&config).context("failed to build analysis pipeline")?;
    let (sink, mut receiver) = ChannelSink::new(EVENT_BUFFER);

    let url = url.to_string();
    let run = tokio::spawn(async move { orchestrator.run(Some(url.as_str()), sink).await });

    while let Some(event) = receiver.recv().await {
        println!("{}", event_line(&event));
    }

    let outcome = run.await.context("analysis task failed")?;
    debug!("Analysis outcome: {:?}", outcome);

    Ok(outcome)
}

/// One event as a single JSON line
pub fn event_line(event: &StreamEvent) -> String {
    json!({
        "event": event.event_name(),
        "data": event.payload(),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagescope_core::FailureKind;

    #[test]
    fn test_event_line() {
        let line = event_line(&StreamEvent::failed(FailureKind::NotFound, Some("https://example.com/x")));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert!(!line.contains('\n'));
        assert_eq!(value["event"], "analysis_error");
        assert_eq!(value["data"]["type"], "not_found");
        assert_eq!(value["data"]["url"], "https://example.com/x");
    }

    #[tokio::test]
    async fn test_invalid_url_fails_without_fetching() {
        let mut config = pagescope_core::AnalysisConfig::default();
        config.audit_enabled = false;
        let ctx = CommandContext { config };

        let outcome = run_analysis(&ctx, "not a url", true).await.unwrap();
        assert_eq!(outcome, AnalysisOutcome::Failed { kind: FailureKind::InvalidUrl });
    }
}
