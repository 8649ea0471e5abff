use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Where emulator logs and screenshots land on disk.
///
/// Constructed once at startup and threaded into every component that writes
/// files; nothing in the crate holds a process-wide artifact path.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root from `WEARCTL_ARTIFACTS`, falling back to `./artifacts`.
    pub fn from_env() -> Self {
        let root = std::env::var("WEARCTL_ARTIFACTS")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("artifacts"));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.root.join("screenshots")
    }

    /// Create the directory tree if it is missing.
    pub fn ensure(&self) -> Result<()> {
        for dir in [self.root.clone(), self.logs_dir(), self.screenshots_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }

    /// Timestamped log file path for `identifier` (e.g. the AVD name).
    pub fn log_file(&self, identifier: &str) -> PathBuf {
        self.logs_dir()
            .join(format!("{}_{}.log", identifier, timestamp()))
    }

    /// Timestamped screenshot path for `identifier` (the serial, usually).
    pub fn screenshot_file(&self, identifier: &str) -> PathBuf {
        self.screenshots_dir()
            .join(format!("{}_{}.png", identifier, timestamp()))
    }
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d-%H%M%S").to_string()
}
