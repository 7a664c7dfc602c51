use std::sync::Arc;
use tracing::{debug, info, warn};

use super::RunState;
use crate::backend::{GenerationBackend, ModelConfig};
use crate::errors::OrchestratorError;
use crate::export::MarkdownExporter;
use crate::project::{CommitReceipt, Project};
use crate::review::{ReviewDecision, ReviewGate, ReviewRequest};
use crate::ui::OrchestratorUI;
use crate::workflow::Task;
use crate::workflow::prompts::{PromptSettings, build_prompt};

/// Result of running one task to a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Committed {
        receipt: CommitReceipt,
        auto_approved: bool,
    },
    /// Generation failed and the reviewer chose to move on without output.
    Skipped,
}

impl TaskOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, TaskOutcome::Committed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub auto_approve: bool,
    pub pause_on_milestone: bool,
    pub auto_export_chapters: bool,
    pub model: ModelConfig,
    pub prompts: PromptSettings,
}

/// Runs single tasks: prompt, generate, review, commit.
pub struct TaskExecutor {
    backend: Arc<dyn GenerationBackend>,
    gate: ReviewGate,
    settings: ExecutorSettings,
    exporter: Option<MarkdownExporter>,
    ui: Option<Arc<OrchestratorUI>>,
}

impl TaskExecutor {
    pub fn new(backend: Arc<dyn GenerationBackend>, gate: ReviewGate, settings: ExecutorSettings) -> Self {
        Self {
            backend,
            gate,
            settings,
            exporter: None,
            ui: None,
        }
    }

    /// Export chapters touched by a commit through `exporter`.
    pub fn with_exporter(mut self, exporter: MarkdownExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn with_ui(mut self, ui: Option<Arc<OrchestratorUI>>) -> Self {
        self.ui = ui;
        self
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    /// Whether a successful output goes to a human before it is committed.
    pub fn needs_review(&self, task: &Task) -> bool {
        (task.milestone && self.settings.pause_on_milestone) || !self.settings.auto_approve
    }

    /// Run `task` until its output is committed or it is skipped.
    ///
    /// A rejected output is regenerated from the same prompt; a modify
    /// regenerates with the reviewer's correction appended and goes back to
    /// review. Generation failures always go to the reviewer. Fails only when
    /// the review surface disappears.
    pub async fn execute(
        &self,
        task: &Task,
        project: &mut Project,
        state: &mut RunState,
    ) -> Result<TaskOutcome, OrchestratorError> {
        state.begin_task(task);
        if let Some(ref ui) = self.ui {
            ui.start_task(task.role.label(), &task.name);
        }
        info!(role = %task.role, task = %task.name, milestone = task.milestone, "Task started");

        let needs_review = self.needs_review(task);
        let mut feedback: Option<String> = None;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let prompt = build_prompt(task, project, &self.settings.prompts, feedback.as_deref());
            debug!(
                task = %task.name,
                attempt,
                prompt_chars = prompt.chars().count(),
                backend = self.backend.name(),
                "Generating"
            );

            match self.backend.generate(&prompt, &self.settings.model).await {
                Ok(output) => {
                    if !needs_review {
                        return Ok(self.commit(task, project, &output, true));
                    }
                    let request = ReviewRequest {
                        role: task.role,
                        task_name: task.name.clone(),
                        chapter: task.kind.chapter(),
                        content: output.clone(),
                        error: None,
                        attempt,
                    };
                    match self.gate.request(request).await? {
                        ReviewDecision::Approve => {
                            return Ok(self.commit(task, project, &output, false));
                        }
                        ReviewDecision::Reject => {
                            info!(task = %task.name, attempt, "Output rejected, regenerating");
                            feedback = None;
                        }
                        ReviewDecision::Modify(text) => {
                            info!(task = %task.name, attempt, "Changes requested, regenerating");
                            feedback = Some(text);
                        }
                    }
                }
                Err(err) => {
                    let reason = err.reason();
                    warn!(task = %task.name, attempt, error = %reason, "Generation failed");
                    if let Some(ref ui) = self.ui {
                        ui.task_failed(&task.name, &reason);
                    }
                    let request = ReviewRequest {
                        role: task.role,
                        task_name: task.name.clone(),
                        chapter: task.kind.chapter(),
                        content: String::new(),
                        error: Some(reason),
                        attempt,
                    };
                    match self.gate.request(request).await? {
                        ReviewDecision::Approve => {
                            info!(task = %task.name, "Task skipped after failed generation");
                            if let Some(ref ui) = self.ui {
                                ui.task_skipped(&task.name, "skipped after failure");
                            }
                            return Ok(TaskOutcome::Skipped);
                        }
                        ReviewDecision::Reject => feedback = None,
                        ReviewDecision::Modify(text) => feedback = Some(text),
                    }
                }
            }
        }
    }

    fn commit(&self, task: &Task, project: &mut Project, output: &str, auto_approved: bool) -> TaskOutcome {
        let receipt = project.commit(task, output);
        info!(
            task = %task.name,
            sequence = receipt.sequence,
            chapter = ?receipt.chapter,
            auto_approved,
            "Task committed"
        );
        if let Some(ref ui) = self.ui {
            ui.task_committed(&task.name, auto_approved);
        }

        if let (Some(number), Some(exporter)) = (receipt.chapter, &self.exporter)
            && self.settings.auto_export_chapters
        {
            match exporter.export_chapter(project, number) {
                Ok(path) => {
                    if let Some(ref ui) = self.ui {
                        ui.exported(&path);
                    }
                }
                Err(e) => warn!(chapter = number, error = %e, "Chapter export failed"),
            }
        }

        TaskOutcome::Committed {
            receipt,
            auto_approved,
        }
    }
}
