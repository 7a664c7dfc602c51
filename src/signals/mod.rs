//! Run control from other processes.
//!
//! `novelsmith pause|continue|stop|save` talk to a running process through
//! marker files in `.novelsmith/`:
//!
//! - `pause` - present while the run should be paused; removed by `continue`
//! - `stop` - consumed by the watcher, ends the run at the next task boundary
//! - `save.request` - consumed by the watcher, saves at the next task boundary
//!
//! The watcher only flips [`RunSignals`] flags. The run lock on `run.lock`
//! tells the commands whether a run is active.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ProjectPaths;
use crate::errors::OrchestratorError;
use crate::orchestrator::RunSignals;

const WATCH_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Pause,
    Continue,
    Stop,
    Save,
}

impl ControlSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlSignal::Pause => "pause",
            ControlSignal::Continue => "continue",
            ControlSignal::Stop => "stop",
            ControlSignal::Save => "save",
        }
    }
}

/// Leave `signal` for the running process.
pub fn send_signal(paths: &ProjectPaths, signal: ControlSignal) -> Result<()> {
    let write = |path: PathBuf| {
        std::fs::write(&path, signal.as_str())
            .with_context(|| format!("Failed to create signal file: {}", path.display()))
    };
    match signal {
        ControlSignal::Pause => write(paths.pause_signal()),
        ControlSignal::Continue => remove_if_exists(&paths.pause_signal()),
        ControlSignal::Stop => write(paths.stop_signal()),
        ControlSignal::Save => write(paths.save_signal()),
    }
}

/// Remove signal files left behind by an earlier process.
pub fn clear_stale(paths: &ProjectPaths) -> Result<()> {
    for path in [paths.pause_signal(), paths.stop_signal(), paths.save_signal()] {
        remove_if_exists(&path)?;
    }
    Ok(())
}

fn remove_if_exists(path: &std::path::Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove signal file: {}", path.display())),
    }
}

/// Apply the current signal files to `signals` once.
pub fn poll_signals(paths: &ProjectPaths, signals: &RunSignals) {
    if paths.stop_signal().exists() {
        if let Err(e) = remove_if_exists(&paths.stop_signal()) {
            warn!(error = %e, "Could not consume stop signal");
        }
        info!("Stop signal received");
        signals.stop();
        return;
    }

    if paths.save_signal().exists() {
        if let Err(e) = remove_if_exists(&paths.save_signal()) {
            warn!(error = %e, "Could not consume save signal");
        }
        debug!("Save signal received");
        signals.request_save();
    }

    if paths.pause_signal().exists() {
        if signals.pause() {
            info!("Pause signal received");
        }
    } else if signals.resume() {
        info!("Continue signal received");
    }
}

/// Poll the signal files in the background until the handle is aborted.
pub fn spawn_watcher(paths: ProjectPaths, signals: RunSignals) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(WATCH_INTERVAL);
        loop {
            interval.tick().await;
            poll_signals(&paths, &signals);
        }
    })
}

/// Exclusive lock held for the lifetime of a run.
#[derive(Debug)]
pub struct RunLock {
    file: File,
}

impl RunLock {
    /// Take the project lock, failing if another process holds it.
    pub fn acquire(paths: &ProjectPaths) -> Result<Self, OrchestratorError> {
        let path = paths.lock_file();
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;
        FileExt::try_lock_exclusive(&file)
            .map_err(|_| OrchestratorError::ProjectLocked { path: path.clone() })?;

        file.set_len(0)
            .and_then(|_| writeln!(file, "{}", std::process::id()))
            .with_context(|| format!("Failed to write lock file: {}", path.display()))?;
        Ok(Self { file })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(error = %e, "Failed to release run lock");
        }
    }
}

/// Whether another process currently holds the run lock.
pub fn is_run_active(paths: &ProjectPaths) -> bool {
    let Ok(file) = OpenOptions::new().read(true).write(true).open(paths.lock_file()) else {
        return false;
    };
    match FileExt::try_lock_exclusive(&file) {
        Ok(()) => {
            let _ = FileExt::unlock(&file);
            false
        }
        Err(_) => true,
    }
}
