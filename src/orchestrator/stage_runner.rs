use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{RevisionPolicy, RunSignals, RunState, StatusReport, TaskExecutor};
use crate::errors::OrchestratorError;
use crate::persistence::PersistenceManager;
use crate::project::Project;
use crate::ui::OrchestratorUI;
use crate::workflow::{Stage, Task, TaskKind};

const PAUSE_POLL: Duration = Duration::from_millis(100);

/// How a stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    /// A stop request arrived before the stage finished.
    Halted,
    /// The chapter draft was skipped, so the rest of the stage was dropped.
    ChapterAbandoned,
}

/// Runs the tasks of one stage in order.
pub struct StageRunner<'a> {
    pub executor: &'a TaskExecutor,
    pub persistence: &'a PersistenceManager,
    pub signals: &'a RunSignals,
    pub policy: RevisionPolicy,
    pub task_interval: Duration,
    pub ui: Option<Arc<OrchestratorUI>>,
}

impl StageRunner<'_> {
    pub async fn run_stage(
        &self,
        stage: &Stage,
        project: &mut Project,
        state: &mut RunState,
    ) -> Result<StageOutcome, OrchestratorError> {
        state.enter_stage(stage.name, stage.chapter);
        info!(stage = %stage.name, chapter = ?stage.chapter, tasks = stage.len(), "Stage started");
        if let Some(ref ui) = self.ui {
            ui.start_stage(&stage.title(), stage.len());
        }

        let len = stage.len();
        for (i, task) in stage.tasks.iter().enumerate() {
            if !self.wait_while_paused().await {
                info!(stage = %stage.name, task = %task.name, "Stop requested, halting stage");
                return Ok(StageOutcome::Halted);
            }

            if self.signals.take_save_request() {
                self.save(project, state, Some(task));
            }

            if !self.policy.should_run(task, project) {
                info!(task = %task.name, policy = %self.policy, "Skipped by revision policy");
                state.remove_from_total(1);
                if let Some(ref ui) = self.ui {
                    ui.task_skipped(&task.name, "revision not needed");
                    ui.stage_progress(i + 1, len);
                }
                continue;
            }

            self.publish_status(project, state);
            let outcome = self.executor.execute(task, project, state).await?;
            state.complete_task();
            self.publish_status(project, state);
            if let Some(ref ui) = self.ui {
                ui.stage_progress(i + 1, len);
            }

            if !outcome.is_committed() && matches!(task.kind, TaskKind::WriteChapter(_)) {
                let dropped = (len - i - 1) as u32;
                warn!(task = %task.name, dropped, "Chapter draft skipped, dropping the rest of the stage");
                state.remove_from_total(dropped);
                return Ok(StageOutcome::ChapterAbandoned);
            }

            if i + 1 < len && !self.task_interval.is_zero() {
                tokio::time::sleep(self.task_interval).await;
            }
        }

        debug!(stage = %stage.name, "Stage finished");
        Ok(StageOutcome::Completed)
    }

    /// Block while paused. Returns `false` once the run is no longer running.
    async fn wait_while_paused(&self) -> bool {
        if !self.signals.is_running() {
            return false;
        }
        if !self.signals.is_paused() {
            return true;
        }

        info!("Run paused");
        if let Some(ref ui) = self.ui {
            ui.paused();
        }
        while self.signals.is_paused() {
            tokio::time::sleep(PAUSE_POLL).await;
        }
        if !self.signals.is_running() {
            return false;
        }
        info!("Run resumed");
        if let Some(ref ui) = self.ui {
            ui.resumed();
        }
        true
    }

    /// Save, logging rather than failing the run.
    pub fn save(&self, project: &Project, state: &RunState, pending: Option<&Task>) {
        match self.persistence.save(project, state, pending) {
            Ok(path) => {
                if let Some(ref ui) = self.ui {
                    ui.saved(&path);
                }
            }
            Err(e) => warn!(error = %e, "Save failed, continuing in memory"),
        }
    }

    fn publish_status(&self, project: &Project, state: &RunState) {
        let path = self.persistence.paths().status_file();
        if let Err(e) = StatusReport::capture(project, state).write(&path) {
            debug!(error = %e, "Could not write status file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GenerationBackend, ModelConfig, Provider};
    use crate::config::ProjectPaths;
    use crate::errors::GenerationError;
    use crate::orchestrator::ExecutorSettings;
    use crate::persistence::SavedSettings;
    use crate::project::LengthClass;
    use crate::review::ReviewGate;
    use crate::workflow::build_chapter_workflow;
    use crate::workflow::prompts::PromptSettings;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct Echo(AtomicUsize);

    #[async_trait]
    impl GenerationBackend for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, _: &str, _: &ModelConfig) -> Result<String, GenerationError> {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("output {n}\nScore: 9/10"))
        }
    }

    fn executor(gate: ReviewGate) -> TaskExecutor {
        counting_executor(gate).0
    }

    fn counting_executor(gate: ReviewGate) -> (TaskExecutor, Arc<Echo>) {
        let echo = Arc::new(Echo(AtomicUsize::new(0)));
        let executor = TaskExecutor::new(
            echo.clone(),
            gate,
            ExecutorSettings {
                auto_approve: true,
                pause_on_milestone: false,
                auto_export_chapters: false,
                model: ModelConfig {
                    provider: Provider::Gemini,
                    model: "m".into(),
                    temperature: 0.8,
                    max_output_tokens: 64,
                },
                prompts: PromptSettings::default(),
            },
        );
        (executor, echo)
    }

    fn persistence(dir: &std::path::Path) -> PersistenceManager {
        let paths = ProjectPaths::new(dir);
        paths.ensure_directories().unwrap();
        PersistenceManager::new(
            paths,
            SavedSettings {
                provider: Provider::Gemini,
                model: "m".into(),
                auto_approve: true,
                pause_on_milestone: false,
                task_interval_ms: 0,
                chapter_words: 3000,
            },
        )
    }

    fn project() -> Project {
        Project::new("T", "g", "c", LengthClass::Short).unwrap()
    }

    #[tokio::test]
    async fn test_runs_every_task_and_counts() {
        let dir = tempdir().unwrap();
        let (gate, _inbox) = ReviewGate::channel();
        let executor = executor(gate);
        let persistence = persistence(dir.path());
        let signals = RunSignals::new();
        signals.start();
        let runner = StageRunner {
            executor: &executor,
            persistence: &persistence,
            signals: &signals,
            policy: RevisionPolicy::Always,
            task_interval: Duration::ZERO,
            ui: None,
        };

        let mut p = project();
        let mut state = RunState::new(signals.clone());
        state.reset(7);
        let [creation, revision] = build_chapter_workflow(1);
        assert_eq!(runner.run_stage(&creation, &mut p, &mut state).await.unwrap(), StageOutcome::Completed);
        assert_eq!(runner.run_stage(&revision, &mut p, &mut state).await.unwrap(), StageOutcome::Completed);
        assert_eq!(state.completed_tasks, 7);
        assert_eq!(p.chapters.len(), 1);
        assert!(p.chapters[0].revised_at.is_some());
        assert!(persistence.paths().status_file().exists());
    }

    #[tokio::test]
    async fn test_policy_skip_removes_from_total() {
        let dir = tempdir().unwrap();
        let (gate, _inbox) = ReviewGate::channel();
        let executor = executor(gate);
        let persistence = persistence(dir.path());
        let signals = RunSignals::new();
        signals.start();
        let runner = StageRunner {
            executor: &executor,
            persistence: &persistence,
            signals: &signals,
            policy: RevisionPolicy::BelowScore(8.0),
            task_interval: Duration::ZERO,
            ui: None,
        };

        let mut p = project();
        let mut state = RunState::new(signals.clone());
        state.reset(7);
        let [creation, revision] = build_chapter_workflow(1);
        runner.run_stage(&creation, &mut p, &mut state).await.unwrap();
        runner.run_stage(&revision, &mut p, &mut state).await.unwrap();
        assert_eq!(state.completed_tasks, 4);
        assert_eq!(state.total_tasks, 4);
        assert!(p.chapters[0].revised_at.is_none());
    }

    #[tokio::test]
    async fn test_halts_when_not_running() {
        let dir = tempdir().unwrap();
        let (gate, _inbox) = ReviewGate::channel();
        let executor = executor(gate);
        let persistence = persistence(dir.path());
        let signals = RunSignals::new();
        let runner = StageRunner {
            executor: &executor,
            persistence: &persistence,
            signals: &signals,
            policy: RevisionPolicy::Always,
            task_interval: Duration::ZERO,
            ui: None,
        };

        let mut p = project();
        let mut state = RunState::new(signals.clone());
        let [creation, _] = build_chapter_workflow(1);
        assert_eq!(runner.run_stage(&creation, &mut p, &mut state).await.unwrap(), StageOutcome::Halted);
        assert!(p.chapters.is_empty());
    }

    #[tokio::test]
    async fn test_stop_while_paused_halts() {
        let dir = tempdir().unwrap();
        let (gate, _inbox) = ReviewGate::channel();
        let executor = executor(gate);
        let persistence = persistence(dir.path());
        let signals = RunSignals::new();
        signals.start();
        signals.pause();
        let runner = StageRunner {
            executor: &executor,
            persistence: &persistence,
            signals: &signals,
            policy: RevisionPolicy::Always,
            task_interval: Duration::ZERO,
            ui: None,
        };

        let stopper = signals.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            stopper.stop();
        });

        let mut p = project();
        let mut state = RunState::new(signals.clone());
        let [creation, _] = build_chapter_workflow(1);
        assert_eq!(runner.run_stage(&creation, &mut p, &mut state).await.unwrap(), StageOutcome::Halted);
        assert!(p.chapters.is_empty());
    }

    #[tokio::test]
    async fn test_pause_then_resume_completes_the_stage() {
        let dir = tempdir().unwrap();
        let (gate, _inbox) = ReviewGate::channel();
        let (executor, echo) = counting_executor(gate);
        let persistence = persistence(dir.path());
        let signals = RunSignals::new();
        signals.start();
        signals.pause();
        let runner = StageRunner {
            executor: &executor,
            persistence: &persistence,
            signals: &signals,
            policy: RevisionPolicy::Always,
            task_interval: Duration::ZERO,
            ui: None,
        };

        let resumer = {
            let signals = signals.clone();
            let echo = echo.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(250)).await;
                let calls_while_paused = echo.0.load(Ordering::SeqCst);
                signals.resume();
                calls_while_paused
            })
        };

        let mut p = project();
        let mut state = RunState::new(signals.clone());
        state.reset(4);
        let [creation, _] = build_chapter_workflow(1);
        assert_eq!(runner.run_stage(&creation, &mut p, &mut state).await.unwrap(), StageOutcome::Completed);

        assert_eq!(resumer.await.unwrap(), 0, "nothing is generated while paused");
        assert_eq!(echo.0.load(Ordering::SeqCst), 4);
        assert_eq!(state.completed_tasks, 4);
        assert_eq!(p.chapters.len(), 1);
    }

    #[tokio::test]
    async fn test_save_request_honored_at_task_boundary() {
        let dir = tempdir().unwrap();
        let (gate, _inbox) = ReviewGate::channel();
        let executor = executor(gate);
        let persistence = persistence(dir.path());
        let signals = RunSignals::new();
        signals.start();
        signals.request_save();
        let runner = StageRunner {
            executor: &executor,
            persistence: &persistence,
            signals: &signals,
            policy: RevisionPolicy::Always,
            task_interval: Duration::ZERO,
            ui: None,
        };

        let mut p = project();
        let mut state = RunState::new(signals.clone());
        state.reset(4);
        let [creation, _] = build_chapter_workflow(1);
        runner.run_stage(&creation, &mut p, &mut state).await.unwrap();

        let doc = persistence.load().unwrap();
        assert_eq!(doc.workflow.pending_task.as_deref(), Some("Write chapter 1"));
        assert!(doc.project.chapters.is_empty());
    }
}
