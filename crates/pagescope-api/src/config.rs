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

//! Configuration management for the API server

use pagescope_core::AnalysisConfig;
use std::env;

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server to
    pub bind_address: String,

    /// Value of `access-control-allow-origin` on every response
    pub cors_origin: String,

    /// Events buffered per stream before the orchestrator waits
    pub stream_buffer_size: usize,

    /// Concurrent analysis streams accepted before answering 503
    pub max_streams: usize,

    /// Settings passed to every analysis
    pub analysis: AnalysisConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
            cors_origin: "*".to_string(),
            stream_buffer_size: 32,
            max_streams: 256,
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from a variable lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            bind_address: lookup("PAGESCOPE_BIND_ADDRESS").unwrap_or(defaults.bind_address),

            cors_origin: lookup("PAGESCOPE_CORS_ORIGIN").unwrap_or(defaults.cors_origin),

            stream_buffer_size: lookup("PAGESCOPE_STREAM_BUFFER_SIZE").and_then(|v| v.parse().ok()).unwrap_or(defaults.stream_buffer_size),

            max_streams: lookup("PAGESCOPE_MAX_STREAMS").and_then(|v| v.parse().ok()).unwrap_or(defaults.max_streams),

            analysis: defaults.analysis.with_overrides(&lookup),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_environment() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.bind_address, "0.0.0.0:4000");
        assert_eq!(config.cors_origin, "*");
        assert_eq!(config.stream_buffer_size, 32);
        assert_eq!(config.max_streams, 256);
        assert!(config.analysis.audit_enabled);
    }

    #[test]
    fn test_environment_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PAGESCOPE_BIND_ADDRESS", "127.0.0.1:9000"),
            ("PAGESCOPE_CORS_ORIGIN", "https://app.example"),
            ("PAGESCOPE_MAX_STREAMS", "4"),
            ("PAGESCOPE_STREAM_BUFFER_SIZE", "not-a-number"),
            ("PAGESCOPE_AUDIT_ENABLED", "false"),
        ]);

        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.cors_origin, "https://app.example");
        assert_eq!(config.max_streams, 4);
        assert_eq!(config.stream_buffer_size, 32);
        assert!(!config.analysis.audit_enabled);
    }
}
