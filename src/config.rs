use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Name of the per-project state directory.
pub const STATE_DIR: &str = ".novelsmith";

/// On-disk layout of a novelsmith project.
///
/// Everything the engine writes lives under `<project>/.novelsmith/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub project_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl ProjectPaths {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        let state_dir = project_dir.join(STATE_DIR);
        Self {
            project_dir,
            state_dir,
        }
    }

    /// Resolve the project directory to an absolute path first.
    pub fn resolve(project_dir: &Path) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        Ok(Self::new(project_dir))
    }

    pub fn config_file(&self) -> PathBuf {
        self.state_dir.join("novel.toml")
    }

    /// The current project document.
    pub fn project_file(&self) -> PathBuf {
        self.state_dir.join("project.json")
    }

    /// Timestamped snapshots of earlier saves.
    pub fn saves_dir(&self) -> PathBuf {
        self.state_dir.join("saves")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.state_dir.join("exports")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }

    pub fn styles_dir(&self) -> PathBuf {
        self.state_dir.join("styles")
    }

    /// Exclusive lock held by a running process.
    pub fn lock_file(&self) -> PathBuf {
        self.state_dir.join("run.lock")
    }

    /// Live status written by a running process for `status`.
    pub fn status_file(&self) -> PathBuf {
        self.state_dir.join("status.json")
    }

    pub fn pause_signal(&self) -> PathBuf {
        self.state_dir.join("pause")
    }

    pub fn stop_signal(&self) -> PathBuf {
        self.state_dir.join("stop")
    }

    pub fn save_signal(&self) -> PathBuf {
        self.state_dir.join("save.request")
    }

    pub fn is_initialized(&self) -> bool {
        self.state_dir.is_dir()
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            self.state_dir.clone(),
            self.saves_dir(),
            self.exports_dir(),
            self.log_dir(),
            self.styles_dir(),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}
