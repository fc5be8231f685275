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

//! Markup fetcher: one bounded GET per request, failures classified

use crate::config::AnalysisConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use std::error::Error as StdError;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Longest response body prefix kept for a failed fetch
pub const MAX_DETAIL_CHARS: usize = 200;

/// Successfully retrieved page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub body: String,
}

pub type FetchOutcome = Result<FetchedPage, FetchError>;

/// Retrieves the raw markup for an address
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> FetchOutcome;
}

/// HTTP(S) fetcher backed by reqwest
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self, FetchError> {
        Self::new(config.fetch_timeout(), &config.user_agent)
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if is_dns_failure(&err) {
            FetchError::Dns(error_chain(&err))
        } else {
            FetchError::Network(error_chain(&err))
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> FetchOutcome {
        info!("Fetching markup for {}", url);

        let response = self.client.get(url.clone()).send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let final_url = response.url().to_string();
        debug!("Fetch response status for {}: {}", url, status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "No response body available".to_string());
            let detail: String = body.chars().take(MAX_DETAIL_CHARS).collect();
            warn!("Fetch of {} failed with status {}: {}", url, status, detail);
            return Err(FetchError::Http {
                status: status.as_u16(),
                detail,
            });
        }

        // Any content type is accepted and decoded as text.
        let body = response.text().await.map_err(|e| self.classify(e))?;
        info!("Fetched {} bytes of markup from {}", body.len(), final_url);

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }
}

/// Whether any error in the source chain reports a name-resolution failure
pub fn is_dns_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        let message = e.to_string().to_lowercase();
        if message.contains("dns error") || message.contains("failed to lookup address") || message.contains("name or service not known") || message.contains("no such host") {
            return true;
        }
        current = e.source();
    }
    false
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}
