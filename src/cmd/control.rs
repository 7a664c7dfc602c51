//! Control a running novel from another terminal: `novelsmith pause|continue|stop|save`.

use anyhow::Result;
use console::style;
use std::path::Path;

use novelsmith::config::ProjectPaths;
use novelsmith::signals::{ControlSignal, is_run_active, send_signal};

/// Send `signal` if a run is active; otherwise say so.
fn signal_active_run(project_dir: &Path, signal: ControlSignal, done: &str) -> Result<()> {
    let paths = ProjectPaths::new(project_dir);
    if !paths.is_initialized() || !is_run_active(&paths) {
        println!("No novel run is currently active.");
        return Ok(());
    }

    send_signal(&paths, signal)?;
    println!("{}", style(done).yellow());
    Ok(())
}

pub fn cmd_pause(project_dir: &Path) -> Result<()> {
    signal_active_run(
        project_dir,
        ControlSignal::Pause,
        "Pause signal sent. The run pauses before its next task.",
    )
}

/// Lifts a pause even when no run is active, so a stale pause file never
/// blocks the next run.
pub fn cmd_continue(project_dir: &Path) -> Result<()> {
    let paths = ProjectPaths::new(project_dir);
    let was_paused = paths.pause_signal().exists();
    send_signal(&paths, ControlSignal::Continue)?;
    if was_paused {
        println!("{}", style("Continue signal sent.").green());
    } else {
        println!("The run is not paused.");
    }
    Ok(())
}

pub fn cmd_stop(project_dir: &Path) -> Result<()> {
    signal_active_run(
        project_dir,
        ControlSignal::Stop,
        "Stop signal sent. The run saves and stops before its next task.",
    )
}

pub fn cmd_save(project_dir: &Path) -> Result<()> {
    signal_active_run(
        project_dir,
        ControlSignal::Save,
        "Save requested. The run saves before its next task.",
    )
}
