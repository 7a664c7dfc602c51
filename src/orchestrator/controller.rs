use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{RevisionPolicy, RunSignals, RunState, StageOutcome, StageRunner, TaskExecutor};
use crate::errors::OrchestratorError;
use crate::persistence::PersistenceManager;
use crate::project::Project;
use crate::ui::OrchestratorUI;
use crate::workflow::{
    build_chapter_workflow, concept_stage, forward_planning_due, forward_planning_stage,
    planned_task_count, planning_stage,
};

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    SettingUp,
    Writing(u32),
    ForwardPlanning(u32),
    Complete,
    Stopped,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Complete,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Forward planning after every Nth chapter; 0 disables it.
    pub forward_planning_interval: u32,
    /// Save after every Nth chapter; 0 disables periodic saves.
    pub autosave_interval: u32,
    pub task_interval: Duration,
    pub revision: RevisionPolicy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            forward_planning_interval: 5,
            autosave_interval: 3,
            task_interval: Duration::from_millis(2000),
            revision: RevisionPolicy::Always,
        }
    }
}

/// Everything a stage needs besides the project and run state.
struct RunServices {
    executor: TaskExecutor,
    persistence: PersistenceManager,
    signals: RunSignals,
    settings: RunSettings,
    ui: Option<Arc<OrchestratorUI>>,
}

impl RunServices {
    fn runner(&self) -> StageRunner<'_> {
        StageRunner {
            executor: &self.executor,
            persistence: &self.persistence,
            signals: &self.signals,
            policy: self.settings.revision,
            task_interval: self.settings.task_interval,
            ui: self.ui.clone(),
        }
    }
}

/// Top-level driver: setup stages, the chapter loop and periodic forward
/// planning, until the target is reached or a stop is requested.
pub struct RunController {
    project: Project,
    state: RunState,
    services: RunServices,
    phase: RunPhase,
}

impl RunController {
    pub fn new(
        project: Project,
        executor: TaskExecutor,
        persistence: PersistenceManager,
        signals: RunSignals,
        settings: RunSettings,
    ) -> Self {
        Self {
            project,
            state: RunState::new(signals.clone()),
            services: RunServices {
                executor,
                persistence,
                signals,
                settings,
                ui: None,
            },
            phase: RunPhase::Idle,
        }
    }

    pub fn with_ui(mut self, ui: Option<Arc<OrchestratorUI>>) -> Self {
        self.services.ui = ui;
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn signals(&self) -> &RunSignals {
        &self.services.signals
    }

    pub fn into_project(self) -> Project {
        self.project
    }

    /// Drive the run to completion or until stopped.
    ///
    /// The project is saved when the run ends either way. The only error is a
    /// review surface that went away while a decision was pending.
    pub async fn run(&mut self) -> Result<RunOutcome, OrchestratorError> {
        self.services.signals.start();
        let start = self.project.next_chapter_number();
        let total = planned_task_count(
            start,
            self.project.target_chapters,
            self.services.settings.forward_planning_interval,
        );
        self.state.reset(total);
        info!(
            title = %self.project.title,
            start_chapter = start,
            target = self.project.target_chapters,
            total_tasks = total,
            run_id = %self.state.run_id,
            "Run started"
        );

        let ticker = self.services.ui.clone().map(|ui| {
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(1));
                loop {
                    interval.tick().await;
                    ui.tick();
                }
            })
        });

        let result = self.drive().await;

        if let Some(ticker) = ticker {
            ticker.abort();
        }
        self.services.signals.stop();
        self.services.runner().save(&self.project, &self.state, None);

        let outcome = result?;
        self.phase = match outcome {
            RunOutcome::Complete => RunPhase::Complete,
            RunOutcome::Stopped => RunPhase::Stopped,
        };

        let chapters = self.project.chapters.len();
        info!(
            outcome = ?outcome,
            chapters,
            completed_tasks = self.state.completed_tasks,
            "Run finished"
        );
        if let Some(ref ui) = self.services.ui {
            match outcome {
                RunOutcome::Complete => ui.finish_complete(chapters),
                RunOutcome::Stopped => ui.finish_stopped(chapters),
            }
        }
        Ok(outcome)
    }

    async fn drive(&mut self) -> Result<RunOutcome, OrchestratorError> {
        self.phase = RunPhase::SettingUp;
        if self.run_setup().await? == StageOutcome::Halted {
            return Ok(RunOutcome::Stopped);
        }

        let per_chapter: u32 = build_chapter_workflow(1).iter().map(|s| s.len() as u32).sum();
        let runner = self.services.runner();

        loop {
            let k = self.project.next_chapter_number();
            if k > self.project.target_chapters {
                return Ok(RunOutcome::Complete);
            }
            self.phase = RunPhase::Writing(k);

            let [creation, revision] = build_chapter_workflow(k);
            match runner.run_stage(&creation, &mut self.project, &mut self.state).await? {
                StageOutcome::Halted => return Ok(RunOutcome::Stopped),
                StageOutcome::ChapterAbandoned => {
                    self.state.remove_from_total(revision.len() as u32);
                    self.state.extend_total(per_chapter);
                    info!(chapter = k, "Chapter draft skipped, retrying the chapter");
                    continue;
                }
                StageOutcome::Completed => {}
            }
            if runner.run_stage(&revision, &mut self.project, &mut self.state).await?
                == StageOutcome::Halted
            {
                return Ok(RunOutcome::Stopped);
            }

            info!(chapter = k, written = self.project.chapters.len(), "Chapter complete");
            if let Some(ref ui) = self.services.ui {
                ui.chapter_complete(k);
            }

            if forward_planning_due(
                k,
                self.project.target_chapters,
                self.services.settings.forward_planning_interval,
            ) {
                self.phase = RunPhase::ForwardPlanning(k);
                if let Some(ref ui) = self.services.ui {
                    ui.forward_planning(k);
                }
                let stage = forward_planning_stage();
                if runner.run_stage(&stage, &mut self.project, &mut self.state).await?
                    == StageOutcome::Halted
                {
                    return Ok(RunOutcome::Stopped);
                }
            }

            let interval = self.services.settings.autosave_interval;
            if interval > 0 && k % interval == 0 {
                runner.save(&self.project, &self.state, None);
            }
        }
    }

    /// Run the concept and planning stages unless their artifacts exist.
    async fn run_setup(&mut self) -> Result<StageOutcome, OrchestratorError> {
        let runner = self.services.runner();

        let concept = concept_stage();
        if self.project.context.concept_complete() {
            info!("Concept artifacts present, skipping concept stage");
            self.state.credit_skipped(concept.len() as u32);
        } else if runner.run_stage(&concept, &mut self.project, &mut self.state).await?
            == StageOutcome::Halted
        {
            return Ok(StageOutcome::Halted);
        }

        let planning = planning_stage();
        if self.project.context.planning_complete() {
            info!("Chapter outline present, skipping planning stage");
            self.state.credit_skipped(planning.len() as u32);
        } else if runner.run_stage(&planning, &mut self.project, &mut self.state).await?
            == StageOutcome::Halted
        {
            return Ok(StageOutcome::Halted);
        }

        Ok(StageOutcome::Completed)
    }
}
