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

pub mod analyze;
pub mod check;
pub mod config;

use anyhow::{Context, Result};
use pagescope_core::AnalysisConfig;
use std::path::Path;

pub struct CommandContext {
    pub config: AnalysisConfig,
}

impl CommandContext {
    /// Config file when given, otherwise defaults; environment overrides apply to both
    pub fn resolve(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => AnalysisConfig::load_from_file(path).with_context(|| format!("failed to load config from {}", path.display()))?,
            None => AnalysisConfig::from_env(),
        };
        Ok(Self { config })
    }
}
