//! Shared fixtures for the engine tests: a recording backend, a scripted
//! review surface and a controller builder wired to a temp directory.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use novelsmith::backend::{GenerationBackend, ModelConfig, Provider};
use novelsmith::config::ProjectPaths;
use novelsmith::errors::GenerationError;
use novelsmith::orchestrator::{
    ExecutorSettings, RevisionPolicy, RunController, RunSettings, RunSignals, TaskExecutor,
};
use novelsmith::persistence::{PersistenceManager, SavedSettings};
use novelsmith::project::{LengthClass, Project};
use novelsmith::review::{ReviewDecision, ReviewGate, ReviewRequest, ReviewSurface, serve_reviews};
use novelsmith::workflow::prompts::PromptSettings;

type CallHook = Box<dyn Fn(usize) + Send + Sync>;

/// Backend that numbers its replies and records every prompt.
///
/// When `stop_after` is set, the run's signals are stopped once that many
/// calls have been answered. Call numbers in `failing` return an error, and
/// `on_call` sees each call number before it is answered.
#[derive(Default)]
pub struct Recording {
    prompts: Mutex<Vec<String>>,
    stop_after: Option<(usize, RunSignals)>,
    failing: Vec<usize>,
    on_call: Option<CallHook>,
}

impl Recording {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stopping_after(calls: usize, signals: RunSignals) -> Arc<Self> {
        Arc::new(Self {
            stop_after: Some((calls, signals)),
            ..Self::default()
        })
    }

    pub fn failing_on(calls: &[usize]) -> Arc<Self> {
        Arc::new(Self {
            failing: calls.to_vec(),
            ..Self::default()
        })
    }

    pub fn observing(hook: impl Fn(usize) + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            on_call: Some(Box::new(hook)),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for Recording {
    fn name(&self) -> &str {
        "recording"
    }

    async fn generate(&self, prompt: &str, _: &ModelConfig) -> Result<String, GenerationError> {
        let n = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        if let Some(hook) = &self.on_call {
            hook(n);
        }
        if self.failing.contains(&n) {
            return Err(GenerationError::Transport {
                provider: "recording".into(),
                reason: format!("call {n} refused"),
            });
        }
        if let Some((limit, signals)) = &self.stop_after
            && n == *limit
        {
            signals.stop();
        }
        Ok(format!("Output {n}\n\nThe tide came in.\nScore: 9/10"))
    }
}

/// Review surface answering from a fixed script, then approving.
pub struct Script {
    decisions: Vec<ReviewDecision>,
    seen: Arc<Mutex<Vec<ReviewRequest>>>,
}

impl Script {
    pub fn new(decisions: Vec<ReviewDecision>) -> (Self, Arc<Mutex<Vec<ReviewRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                decisions,
                seen: seen.clone(),
            },
            seen,
        )
    }
}

#[async_trait]
impl ReviewSurface for Script {
    async fn review(&mut self, request: &ReviewRequest) -> anyhow::Result<ReviewDecision> {
        self.seen.lock().unwrap().push(request.clone());
        if self.decisions.is_empty() {
            Ok(ReviewDecision::Approve)
        } else {
            Ok(self.decisions.remove(0))
        }
    }
}

pub fn model() -> ModelConfig {
    ModelConfig {
        provider: Provider::Gemini,
        model: "test-model".into(),
        temperature: 0.8,
        max_output_tokens: 256,
    }
}

pub fn project(target: u32) -> Project {
    Project::new("Salt Road", "fantasy", "Smugglers on a drowned coast", LengthClass::Short)
        .unwrap()
        .with_target_chapters(target)
}

pub fn persistence(dir: &Path) -> PersistenceManager {
    let paths = ProjectPaths::new(dir);
    paths.ensure_directories().unwrap();
    PersistenceManager::new(
        paths,
        SavedSettings {
            provider: Provider::Gemini,
            model: "test-model".into(),
            auto_approve: true,
            pause_on_milestone: false,
            task_interval_ms: 0,
            chapter_words: 3000,
        },
    )
}

/// Options for [`controller`].
pub struct Harness {
    pub auto_approve: bool,
    pub pause_on_milestone: bool,
    pub decisions: Vec<ReviewDecision>,
    pub revision: RevisionPolicy,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            auto_approve: true,
            pause_on_milestone: false,
            decisions: Vec::new(),
            revision: RevisionPolicy::Always,
        }
    }
}

/// Build a controller over `project` and spawn its review surface.
pub fn controller(
    dir: &Path,
    project: Project,
    backend: Arc<Recording>,
    signals: RunSignals,
    harness: Harness,
) -> (RunController, Arc<Mutex<Vec<ReviewRequest>>>) {
    let (gate, inbox) = ReviewGate::channel();
    let (surface, seen) = Script::new(harness.decisions);
    tokio::spawn(serve_reviews(inbox, surface));

    let executor = TaskExecutor::new(
        backend,
        gate,
        ExecutorSettings {
            auto_approve: harness.auto_approve,
            pause_on_milestone: harness.pause_on_milestone,
            auto_export_chapters: false,
            model: model(),
            prompts: PromptSettings::default(),
        },
    );
    let settings = RunSettings {
        forward_planning_interval: 5,
        autosave_interval: 3,
        task_interval: Duration::ZERO,
        revision: harness.revision,
    };
    let controller = RunController::new(project, executor, persistence(dir), signals, settings);
    (controller, seen)
}
