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

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

use crate::commands::CommandContext;
use anyhow::Result;
use pagescope_core::AnalysisOutcome;
use tracing::Level;

/// CLI for single-page website analysis
#[derive(Parser, Debug)]
#[command(name = "pagescope", about = "Pagescope SEO, accessibility and performance analysis")]
pub struct Cli {
    /// Path to configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for configuration inspection
#[derive(Subcommand, Debug)]
#[command(about = "Inspect the effective configuration")]
pub enum ConfigCommands {
    /// Show current effective configuration as TOML
    Show,
}

/// Top-level commands for pagescope
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the static checklist against a local HTML file or a URL
    Check {
        /// HTML file path or http(s) URL
        target: String,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the full streamed analysis and print each event as a JSON line
    Analyze {
        /// Address to analyze
        url: String,

        /// Skip the Lighthouse audit
        #[arg(long)]
        no_audit: bool,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let ctx = CommandContext::resolve(cli.config.as_deref())?;

    // Dispatch commands
    match cli.command {
        Commands::Check { target, json } => {
            commands::check::run_check(&ctx, &target, json).await?;
        }
        Commands::Analyze { url, no_audit } => {
            let outcome = commands::analyze::run_analysis(&ctx, &url, no_audit).await?;
            if !matches!(outcome, AnalysisOutcome::Completed { .. }) {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Config { command } => {
            commands::config::handle_config_command(&ctx, command)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_command() {
        let cli = Cli::try_parse_from(["pagescope", "check", "index.html", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { ref target, json: true } if target == "index.html"));
    }

    #[test]
    fn test_parse_analyze_with_global_flags() {
        let cli = Cli::try_parse_from(["pagescope", "analyze", "https://example.com", "--no-audit", "-v", "--config", "pagescope.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("pagescope.toml")));
        assert!(matches!(cli.command, Commands::Analyze { no_audit: true, .. }));
    }

    #[test]
    fn test_config_requires_subcommand() {
        assert!(Cli::try_parse_from(["pagescope", "config"]).is_err());
        assert!(Cli::try_parse_from(["pagescope", "config", "show"]).is_ok());
    }
}
