use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::project::Project;
use crate::util::write_atomic;
use crate::workflow::{Role, StageName, Task};

/// Run flags shared between the controller and the signal watcher.
///
/// Cloning shares the same flags. `paused` is only ever set while `running`.
#[derive(Debug, Clone, Default)]
pub struct RunSignals {
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    save_requested: Arc<AtomicBool>,
}

impl RunSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Returns whether the run was actually paused.
    pub fn pause(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        !self.paused.swap(true, Ordering::SeqCst)
    }

    /// Returns whether a pause was lifted.
    pub fn resume(&self) -> bool {
        self.paused.swap(false, Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn request_save(&self) {
        self.save_requested.store(true, Ordering::SeqCst);
    }

    /// Consume a pending save request.
    pub fn take_save_request(&self) -> bool {
        self.save_requested.swap(false, Ordering::SeqCst)
    }
}

/// Progress of the current run.
///
/// `completed_tasks` never exceeds `total_tasks`.
#[derive(Debug, Clone)]
pub struct RunState {
    pub signals: RunSignals,
    pub run_id: Uuid,
    pub current_stage: Option<StageName>,
    pub current_chapter: Option<u32>,
    pub current_task: Option<String>,
    pub current_role: Option<Role>,
    pub completed_tasks: u32,
    pub total_tasks: u32,
    pub started_at: DateTime<Utc>,
    pub task_started_at: Option<DateTime<Utc>>,
}

impl RunState {
    pub fn new(signals: RunSignals) -> Self {
        Self {
            signals,
            run_id: Uuid::new_v4(),
            current_stage: None,
            current_chapter: None,
            current_task: None,
            current_role: None,
            completed_tasks: 0,
            total_tasks: 0,
            started_at: Utc::now(),
            task_started_at: None,
        }
    }

    /// Reset counters for a new run covering `total` tasks.
    pub fn reset(&mut self, total: u32) {
        self.completed_tasks = 0;
        self.total_tasks = total;
        self.started_at = Utc::now();
        self.current_stage = None;
        self.current_chapter = None;
        self.current_task = None;
        self.current_role = None;
        self.task_started_at = None;
    }

    pub fn enter_stage(&mut self, stage: StageName, chapter: Option<u32>) {
        self.current_stage = Some(stage);
        self.current_chapter = chapter;
    }

    pub fn begin_task(&mut self, task: &Task) {
        self.current_task = Some(task.name.clone());
        self.current_role = Some(task.role);
        self.task_started_at = Some(Utc::now());
    }

    pub fn complete_task(&mut self) {
        self.completed_tasks = (self.completed_tasks + 1).min(self.total_tasks);
    }

    /// Count tasks of a stage skipped because its artifacts already exist.
    pub fn credit_skipped(&mut self, n: u32) {
        self.completed_tasks = (self.completed_tasks + n).min(self.total_tasks);
    }

    /// Drop tasks that will not run from the total.
    pub fn remove_from_total(&mut self, n: u32) {
        self.total_tasks = self.total_tasks.saturating_sub(n).max(self.completed_tasks);
    }

    /// Add tasks that were not planned, such as a chapter retry.
    pub fn extend_total(&mut self, n: u32) {
        self.total_tasks += n;
    }
}

/// Snapshot of a live run written to `status.json` for `novelsmith status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub run_id: Uuid,
    pub pid: u32,
    pub title: String,
    pub running: bool,
    pub paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<StageName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_chapter: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_role: Option<Role>,
    pub completed_tasks: u32,
    pub total_tasks: u32,
    pub chapters_written: usize,
    pub target_chapters: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StatusReport {
    pub fn capture(project: &Project, state: &RunState) -> Self {
        Self {
            run_id: state.run_id,
            pid: std::process::id(),
            title: project.title.clone(),
            running: state.signals.is_running(),
            paused: state.signals.is_paused(),
            current_stage: state.current_stage,
            current_chapter: state.current_chapter,
            current_task: state.current_task.clone(),
            current_role: state.current_role,
            completed_tasks: state.completed_tasks,
            total_tasks: state.total_tasks,
            chapters_written: project.chapters.len(),
            target_chapters: project.target_chapters,
            started_at: state.started_at,
            updated_at: Utc::now(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run status")?;
        write_atomic(path, &json)
            .with_context(|| format!("Failed to write status file: {}", path.display()))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read status file: {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse status file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::LengthClass;
    use crate::workflow::write_chapter_task;
    use tempfile::tempdir;

    #[test]
    fn test_pause_requires_running() {
        let signals = RunSignals::new();
        assert!(!signals.pause());
        assert!(!signals.is_paused());

        signals.start();
        assert!(signals.pause());
        assert!(!signals.pause(), "second pause is a no-op");
        assert!(signals.is_paused());
        assert!(signals.resume());
        assert!(!signals.resume());
    }

    #[test]
    fn test_stop_clears_pause() {
        let signals = RunSignals::new();
        signals.start();
        signals.pause();
        signals.stop();
        assert!(!signals.is_running());
        assert!(!signals.is_paused());
    }

    #[test]
    fn test_clones_share_flags() {
        let signals = RunSignals::new();
        let watcher = signals.clone();
        signals.start();
        watcher.request_save();
        assert!(signals.take_save_request());
        assert!(!signals.take_save_request());
        watcher.stop();
        assert!(!signals.is_running());
    }

    #[test]
    fn test_counters_never_exceed_total() {
        let mut state = RunState::new(RunSignals::new());
        state.reset(3);
        state.credit_skipped(2);
        state.complete_task();
        state.complete_task();
        assert_eq!(state.completed_tasks, 3);

        state.remove_from_total(2);
        assert_eq!(state.total_tasks, 3, "total never drops below completed");

        state.extend_total(7);
        assert_eq!(state.total_tasks, 10);
    }

    #[test]
    fn test_begin_task_records_role_and_time() {
        let mut state = RunState::new(RunSignals::new());
        state.begin_task(&write_chapter_task(2));
        assert_eq!(state.current_task.as_deref(), Some("Write chapter 2"));
        assert_eq!(state.current_role, Some(Role::Narrative));
        assert!(state.task_started_at.is_some());
    }

    #[test]
    fn test_status_report_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.json");
        let project = Project::new("T", "g", "c", LengthClass::Short).unwrap();
        let mut state = RunState::new(RunSignals::new());
        state.reset(29);
        state.enter_stage(StageName::Creation, Some(1));

        let report = StatusReport::capture(&project, &state);
        report.write(&path).unwrap();
        let back = StatusReport::read(&path).unwrap();
        assert_eq!(back, report);
        assert_eq!(back.current_chapter, Some(1));
        assert_eq!(back.target_chapters, 20);
        assert!(!dir.path().join("status.json.tmp").exists());
    }
}
