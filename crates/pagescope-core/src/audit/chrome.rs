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

//! Headless Chrome driven by the Lighthouse CLI

use super::{EngineSession, RenderingEngine};
use crate::config::AnalysisConfig;
use crate::error::AuditError;
use crate::models::AuditCategory;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, trace, warn};

const DEVTOOLS_PREFIX: &str = "DevTools listening on ws://";

/// Longest stderr tail kept in a failed audit's error
const MAX_STDERR_CHARS: usize = 500;

const CHROME_FLAGS: &[&str] = &[
    "--headless=new",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--no-default-browser-check",
    "--remote-debugging-port=0",
];

static PROFILE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Launches one headless Chrome per audit
#[derive(Debug, Clone)]
pub struct ChromeEngine {
    chrome_path: PathBuf,
    lighthouse_path: PathBuf,
}

impl ChromeEngine {
    pub fn new(chrome_path: impl Into<PathBuf>, lighthouse_path: impl Into<PathBuf>) -> Self {
        Self {
            chrome_path: chrome_path.into(),
            lighthouse_path: lighthouse_path.into(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(&config.chrome_path, &config.lighthouse_path)
    }
}

/// Scratch Chrome profile, deleted on drop unless already removed
///
/// Owned by the launch future first, so a launch abandoned mid-wait still
/// cleans up.
struct ProfileDir {
    path: PathBuf,
    removed: bool,
}

impl ProfileDir {
    fn new() -> Self {
        let n = PROFILE_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            path: std::env::temp_dir().join(format!("pagescope-chrome-{}-{}", std::process::id(), n)),
            removed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn remove(&mut self) {
        if !self.removed {
            log_removal(&self.path, tokio::fs::remove_dir_all(&self.path).await);
            self.removed = true;
        }
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        if !self.removed {
            log_removal(&self.path, std::fs::remove_dir_all(&self.path));
        }
    }
}

#[async_trait]
impl RenderingEngine for ChromeEngine {
    async fn launch(&self) -> Result<Box<dyn EngineSession>, AuditError> {
        let mut profile_dir = ProfileDir::new();
        debug!("Launching {} with profile {}", self.chrome_path.display(), profile_dir.path().display());

        let mut child = Command::new(&self.chrome_path)
            .args(CHROME_FLAGS)
            .arg(format!("--user-data-dir={}", profile_dir.path().display()))
            .arg("about:blank")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AuditError::Launch(format!("{}: {}", self.chrome_path.display(), e)))?;

        let port = match wait_for_devtools(&mut child).await {
            Ok(port) => port,
            Err(e) => {
                let _ = child.kill().await;
                profile_dir.remove().await;
                return Err(e);
            }
        };

        info!("Chrome ready on debugging port {}", port);
        Ok(Box::new(ChromeSession {
            child,
            port,
            profile_dir,
            lighthouse_path: self.lighthouse_path.clone(),
        }))
    }
}

/// Read Chrome's stderr until the DevTools endpoint is announced
async fn wait_for_devtools(child: &mut Child) -> Result<u16, AuditError> {
    let stderr = child.stderr.take().ok_or_else(|| AuditError::Launch("Chrome stderr not captured".to_string()))?;
    let mut lines = BufReader::new(stderr).lines();

    while let Some(line) = lines.next_line().await? {
        if let Some(port) = parse_devtools_port(&line) {
            // Keep draining so Chrome never blocks on a full pipe.
            tokio::spawn(async move {
                while let Ok(Some(line)) = lines.next_line().await {
                    trace!("chrome: {}", line);
                }
            });
            return Ok(port);
        }
        trace!("chrome: {}", line);
    }

    Err(AuditError::Launch("Chrome exited before opening a debugging port".to_string()))
}

/// Port from a `DevTools listening on ws://host:port/...` line
pub fn parse_devtools_port(line: &str) -> Option<u16> {
    let rest = &line[line.find(DEVTOOLS_PREFIX)? + DEVTOOLS_PREFIX.len()..];
    let authority = rest.split('/').next()?;
    authority.rsplit_once(':')?.1.parse().ok()
}

fn log_removal(dir: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove Chrome profile {}: {}", dir.display(), e),
    }
}

/// Running Chrome instance plus its scratch profile
pub struct ChromeSession {
    child: Child,
    port: u16,
    profile_dir: ProfileDir,
    lighthouse_path: PathBuf,
}

#[async_trait]
impl EngineSession for ChromeSession {
    async fn run_audit(&mut self, url: &str, categories: &[AuditCategory]) -> Result<String, AuditError> {
        let only: Vec<&str> = categories.iter().map(|c| c.id()).collect();
        debug!("Running Lighthouse against {} via port {}", url, self.port);

        let output = Command::new(&self.lighthouse_path)
            .arg(url)
            .arg(format!("--port={}", self.port))
            .arg("--output=json")
            .arg("--output-path=stdout")
            .arg("--quiet")
            .arg(format!("--only-categories={}", only.join(",")))
            .arg("--disable-storage-reset")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AuditError::Run(format!("{}: {}", self.lighthouse_path.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr.trim().chars().rev().take(MAX_STDERR_CHARS).collect::<Vec<_>>().into_iter().rev().collect();
            return Err(AuditError::Run(format!("Lighthouse exited with {}: {}", output.status, tail)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn shutdown(&mut self) -> Result<(), AuditError> {
        let killed = match self.child.kill().await {
            Ok(()) => Ok(()),
            // Already exited
            Err(e) if e.kind() == ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(AuditError::Io(e)),
        };
        self.profile_dir.remove().await;
        debug!("Chrome on port {} shut down", self.port);
        killed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devtools_port() {
        let line = "DevTools listening on ws://127.0.0.1:38211/devtools/browser/5b1e-44c1";
        assert_eq!(parse_devtools_port(line), Some(38211));

        let prefixed = "[0101/000000.000:INFO] DevTools listening on ws://[::1]:9222/devtools/browser/x";
        assert_eq!(parse_devtools_port(prefixed), Some(9222));
    }

    #[test]
    fn test_unrelated_lines_have_no_port() {
        assert_eq!(parse_devtools_port("[WARNING:gpu_init.cc] Passthrough is not supported"), None);
        assert_eq!(parse_devtools_port("DevTools listening on ws://localhost/devtools"), None);
    }

    #[test]
    fn test_sandbox_flags() {
        for flag in ["--headless=new", "--no-sandbox", "--disable-setuid-sandbox", "--remote-debugging-port=0"] {
            assert!(CHROME_FLAGS.contains(&flag), "missing {}", flag);
        }
    }

    #[test]
    fn test_profile_dirs_are_unique() {
        assert_ne!(ProfileDir::new().path(), ProfileDir::new().path());
    }

    #[test]
    fn test_profile_dir_removed_on_drop() {
        let profile = ProfileDir::new();
        let path = profile.path().to_path_buf();
        std::fs::create_dir_all(path.join("Default")).unwrap();

        drop(profile);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_explicit_removal_is_not_repeated_on_drop() {
        let mut profile = ProfileDir::new();
        let path = profile.path().to_path_buf();
        std::fs::create_dir_all(&path).unwrap();

        profile.remove().await;
        assert!(!path.exists());

        // A directory recreated after removal belongs to someone else now
        std::fs::create_dir_all(&path).unwrap();
        drop(profile);
        assert!(path.exists());
        std::fs::remove_dir_all(&path).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_abandoned_launch_removes_profile() {
        use std::os::unix::fs::PermissionsExt;

        let scratch = tempfile::tempdir().unwrap();
        let marker = scratch.path().join("profile-path");
        let script = scratch.path().join("fake-chrome");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nfor arg in \"$@\"; do\n  case \"$arg\" in --user-data-dir=*) dir=\"${{arg#--user-data-dir=}}\";; esac\ndone\nmkdir -p \"$dir\"\necho \"$dir\" > \"{}\"\nexec sleep 30\n",
                marker.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = ChromeEngine::new(&script, "lighthouse");
        let mut launch = engine.launch();

        // Wait until the fake browser has created its profile, then abandon the launch
        let mut created = None;
        for _ in 0..100 {
            tokio::select! {
                _ = &mut launch => panic!("launch should not complete without a debugging port"),
                _ = tokio::time::sleep(std::time::Duration::from_millis(20)) => {}
            }
            let written = std::fs::read_to_string(&marker).unwrap_or_default();
            if written.ends_with('\n') {
                created = Some(PathBuf::from(written.trim()));
                break;
            }
        }
        let profile = created.expect("fake chrome never started");
        assert!(profile.exists());

        drop(launch);
        assert!(!profile.exists());
    }

    #[tokio::test]
    async fn test_missing_chrome_binary_fails_launch() {
        let engine = ChromeEngine::new("/nonexistent/pagescope-chrome", "lighthouse");
        let err = engine.launch().await.err().unwrap();
        assert!(matches!(err, AuditError::Launch(_)));
    }
}
