//! Saving and loading the project document.
//!
//! A save writes `.novelsmith/project.json` through a temporary file and a
//! rename, then copies the same document into `.novelsmith/saves/` as a
//! timestamped snapshot. Loading restores the [`Project`] and the coarse run
//! counters; [`reconstruct`] then primes the backend with a summary of where
//! the story stands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::backend::{GenerationBackend, ModelConfig, Provider};
use crate::config::ProjectPaths;
use crate::errors::PersistenceError;
use crate::orchestrator::RunState;
use crate::project::{PlotStage, Project};
use crate::util::{safe_file_stem, write_atomic};
use crate::workflow::prompts::reconstruction_prompt;
use crate::workflow::{StageName, Task, TaskKind};

/// Format version written into every document.
pub const SAVE_FORMAT_VERSION: u32 = 1;

/// Extras key holding the backend's reply to the resume priming prompt.
pub const RECONSTRUCTED_CONTEXT_KEY: &str = "reconstructed_context";

/// Generation settings in effect when the document was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSettings {
    pub provider: Provider,
    pub model: String,
    pub auto_approve: bool,
    pub pause_on_milestone: bool,
    pub task_interval_ms: u64,
    pub chapter_words: u32,
}

impl SavedSettings {
    /// Human-readable `name: saved -> current` lines for every changed setting.
    pub fn differences(&self, current: &SavedSettings) -> Vec<String> {
        let mut changes = Vec::new();
        let mut compare = |name: &str, saved: String, now: String| {
            if saved != now {
                changes.push(format!("{}: {} -> {}", name, saved, now));
            }
        };
        compare("provider", self.provider.to_string(), current.provider.to_string());
        compare("model", self.model.clone(), current.model.clone());
        compare(
            "auto_approve",
            self.auto_approve.to_string(),
            current.auto_approve.to_string(),
        );
        compare(
            "pause_on_milestone",
            self.pause_on_milestone.to_string(),
            current.pause_on_milestone.to_string(),
        );
        compare(
            "task_interval_ms",
            self.task_interval_ms.to_string(),
            current.task_interval_ms.to_string(),
        );
        compare(
            "chapter_words",
            self.chapter_words.to_string(),
            current.chapter_words.to_string(),
        );
        changes
    }
}

/// Coarse run counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRunState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<StageName>,
    pub completed_tasks: u32,
    pub total_tasks: u32,
    pub last_save_time: DateTime<Utc>,
}

/// Where a resumed run picks up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<StageName>,
    pub next_chapter_number: u32,
    /// Task that would have run next when the save was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_kind: Option<TaskKind>,
    pub is_revising: bool,
}

impl ResumeDescriptor {
    /// One line naming the task the save interrupted, if any.
    pub fn interruption(&self) -> Option<String> {
        let task = self.pending_task.as_deref()?;
        let mut line = task.to_string();
        let chapter = self.pending_kind.and_then(|kind| kind.chapter());
        match (chapter, self.current_stage) {
            (Some(n), Some(stage)) => line.push_str(&format!(" (chapter {}, {} stage)", n, stage)),
            (Some(n), None) => line.push_str(&format!(" (chapter {})", n)),
            (None, Some(stage)) => line.push_str(&format!(" ({} stage)", stage)),
            (None, None) => {}
        }
        if self.is_revising {
            line.push_str(", mid-revision");
        }
        Some(line)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastChapterSummary {
    pub chapter: u32,
    pub key_events: String,
    pub open_hook: String,
}

/// Derived summary for people reading the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_chapter: Option<LastChapterSummary>,
    pub plot_stage: PlotStage,
    pub chapters_written: usize,
    pub target_chapters: u32,
}

impl ContextSummary {
    pub fn of(project: &Project) -> Self {
        Self {
            last_chapter: project.last_chapter().map(|c| LastChapterSummary {
                chapter: c.number,
                key_events: c.leading_lines(3),
                open_hook: c.trailing_lines(3),
            }),
            plot_stage: project.plot_stage(),
            chapters_written: project.chapters.len(),
            target_chapters: project.target_chapters,
        }
    }
}

/// The persisted project document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDocument {
    pub version: u32,
    pub project: Project,
    pub state: SavedRunState,
    pub settings: SavedSettings,
    pub workflow: ResumeDescriptor,
    pub context: ContextSummary,
}

impl SaveDocument {
    pub fn capture(
        project: &Project,
        state: &RunState,
        settings: &SavedSettings,
        pending: Option<&Task>,
    ) -> Self {
        Self {
            version: SAVE_FORMAT_VERSION,
            project: project.clone(),
            state: SavedRunState {
                current_stage: state.current_stage,
                completed_tasks: state.completed_tasks,
                total_tasks: state.total_tasks,
                last_save_time: Utc::now(),
            },
            settings: settings.clone(),
            workflow: ResumeDescriptor {
                current_stage: state.current_stage,
                next_chapter_number: project.next_chapter_number(),
                pending_task: pending.map(|t| t.name.clone()),
                pending_kind: pending.map(|t| t.kind),
                is_revising: state.current_stage == Some(StageName::Revision),
            },
            context: ContextSummary::of(project),
        }
    }
}

/// Reads and writes project documents for one project directory.
#[derive(Debug, Clone)]
pub struct PersistenceManager {
    paths: ProjectPaths,
    settings: SavedSettings,
}

impl PersistenceManager {
    pub fn new(paths: ProjectPaths, settings: SavedSettings) -> Self {
        Self { paths, settings }
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    /// Save the project and return the path of the current document.
    pub fn save(
        &self,
        project: &Project,
        state: &RunState,
        pending: Option<&Task>,
    ) -> Result<PathBuf, PersistenceError> {
        let doc = SaveDocument::capture(project, state, &self.settings, pending);
        let json = serde_json::to_string_pretty(&doc).map_err(PersistenceError::Serialize)?;

        let target = self.paths.project_file();
        write_document(&target, &json)?;

        let snapshot = self.paths.saves_dir().join(format!(
            "{}_{}.json",
            safe_file_stem(&project.title),
            doc.state.last_save_time.format("%Y%m%d_%H%M%S")
        ));
        write_document(&snapshot, &json)?;

        info!(
            path = %target.display(),
            chapters = project.chapters.len(),
            next_chapter = doc.workflow.next_chapter_number,
            "Project saved"
        );
        Ok(target)
    }

    /// Load the current project document.
    pub fn load(&self) -> Result<SaveDocument, PersistenceError> {
        let path = self.paths.project_file();
        if !path.exists() {
            return Err(PersistenceError::NotFound(self.paths.state_dir.clone()));
        }
        load_from(&path)
    }
}

/// Load a project document from any path, such as a snapshot.
pub fn load_from(path: &Path) -> Result<SaveDocument, PersistenceError> {
    let content = std::fs::read_to_string(path).map_err(|source| PersistenceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: SaveDocument =
        serde_json::from_str(&content).map_err(|source| PersistenceError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
    if doc.version > SAVE_FORMAT_VERSION {
        warn!(
            version = doc.version,
            supported = SAVE_FORMAT_VERSION,
            "Project document is newer than this build"
        );
    }
    debug!(path = %path.display(), chapters = doc.project.chapters.len(), "Project loaded");
    Ok(doc)
}

fn write_document(path: &Path, content: &str) -> Result<(), PersistenceError> {
    write_atomic(path, content).map_err(|source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Prime the backend after a load.
///
/// Stores the reply under [`RECONSTRUCTED_CONTEXT_KEY`] and returns `true`.
/// A failed call is logged and the resume carries on unprimed. Projects with
/// nothing written yet are not primed.
pub async fn reconstruct(
    project: &mut Project,
    backend: &dyn GenerationBackend,
    model: &ModelConfig,
) -> bool {
    if project.chapters.is_empty() && project.context.history().is_empty() {
        debug!("Nothing to reconstruct for an empty project");
        return false;
    }

    let prompt = reconstruction_prompt(project);
    match backend.generate(&prompt, model).await {
        Ok(reply) => {
            project.context.set_extra(RECONSTRUCTED_CONTEXT_KEY, &reply);
            info!(
                backend = backend.name(),
                chapters = project.chapters.len(),
                "Context reconstructed"
            );
            true
        }
        Err(err) => {
            warn!(backend = backend.name(), error = %err, "Context reconstruction failed, resuming unprimed");
            false
        }
    }
}
