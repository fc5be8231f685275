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

//! Configuration for the analysis pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36 Pagescope/0.1";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Settings shared by every analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Markup fetch timeout in seconds
    pub fetch_timeout_secs: u64,

    /// Run the Lighthouse audit alongside the static analyzers
    pub audit_enabled: bool,

    /// Upper bound for launching the engine and for the audit run, in seconds
    pub audit_timeout_secs: u64,

    /// Chrome / Chromium executable
    pub chrome_path: PathBuf,

    /// Lighthouse CLI executable
    pub lighthouse_path: PathBuf,

    /// User agent sent with the markup fetch
    pub user_agent: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
            audit_enabled: true,
            audit_timeout_secs: 120,
            chrome_path: PathBuf::from("google-chrome"),
            lighthouse_path: PathBuf::from("lighthouse"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from `PAGESCOPE_*` environment variables
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Load a TOML file, then apply environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply overrides from a variable lookup; unparsable values are ignored
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("PAGESCOPE_FETCH_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.fetch_timeout_secs = v;
        }
        if let Some(v) = lookup("PAGESCOPE_AUDIT_ENABLED").and_then(|v| v.parse().ok()) {
            self.audit_enabled = v;
        }
        if let Some(v) = lookup("PAGESCOPE_AUDIT_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.audit_timeout_secs = v;
        }
        if let Some(v) = lookup("PAGESCOPE_CHROME_PATH") {
            self.chrome_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("PAGESCOPE_LIGHTHOUSE_PATH") {
            self.lighthouse_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("PAGESCOPE_USER_AGENT") {
            self.user_agent = v;
        }
        self
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn audit_timeout(&self) -> Duration {
        Duration::from_secs(self.audit_timeout_secs)
    }
}
