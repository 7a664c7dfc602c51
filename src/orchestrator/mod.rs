//! Workflow orchestration engine.
//!
//! | Component | Role |
//! |-----------|------|
//! | [`RunController`] | setup stages, chapter loop, forward planning, saves |
//! | [`StageRunner`] | one stage's tasks with pause, stop and inter-task delay |
//! | [`TaskExecutor`] | prompt, generate, review, commit for a single task |
//! | [`RevisionPolicy`] | whether the conditional revision tasks run |
//!
//! Exactly one task runs at a time. The controller owns the [`Project`] and
//! the [`RunState`] and lends them down for the duration of a stage.
//!
//! [`Project`]: crate::project::Project

mod controller;
mod executor;
pub mod policy;
mod stage_runner;
mod state;

pub use controller::{RunController, RunOutcome, RunPhase, RunSettings};
pub use executor::{ExecutorSettings, TaskExecutor, TaskOutcome};
pub use policy::RevisionPolicy;
pub use stage_runner::{StageOutcome, StageRunner};
pub use state::{RunSignals, RunState, StatusReport};
