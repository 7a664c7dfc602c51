//! Fixed workflow definitions.
//!
//! Two setup stages run once per project, a creation/revision pair is built
//! for every chapter number, and a forward-planning stage is injected by the
//! run controller at fixed chapter intervals.

pub mod prompts;
mod role;
mod stage;
mod task;

pub use role::Role;
pub use stage::{Stage, StageName};
pub use task::{CommitShape, Task, TaskKind};

pub fn concept_stage() -> Stage {
    Stage {
        name: StageName::Concept,
        chapter: None,
        tasks: vec![
            Task::new(
                Role::Architect,
                TaskKind::CoreConcept,
                "Core concept",
                "Define the world, its rules and the central premise",
            )
            .milestone(),
            Task::new(
                Role::Character,
                TaskKind::CharacterConcept,
                "Character concept",
                "Design the protagonist and principal cast",
            ),
            Task::new(
                Role::Plot,
                TaskKind::PlotStructure,
                "Story structure",
                "Lay out the main plot line and overall structure",
            ),
            Task::new(
                Role::Director,
                TaskKind::ConceptReview,
                "Concept review",
                "Review the overall concept and settle the creative direction",
            )
            .milestone(),
        ],
    }
}

pub fn planning_stage() -> Stage {
    Stage {
        name: StageName::Planning,
        chapter: None,
        tasks: vec![
            Task::new(
                Role::Plot,
                TaskKind::ChapterPlanning,
                "Chapter planning",
                "Write the detailed chapter-by-chapter outline",
            )
            .milestone(),
            Task::new(
                Role::Character,
                TaskKind::CharacterDevelopment,
                "Character development",
                "Deepen character backstories and growth arcs",
            ),
            Task::new(
                Role::Architect,
                TaskKind::WorldBuilding,
                "World building",
                "Flesh out geography, history and culture",
            ),
            Task::new(
                Role::Quality,
                TaskKind::PlanningAssessment,
                "Planning assessment",
                "Assess the feasibility and quality of the plan",
            ),
            Task::new(
                Role::Director,
                TaskKind::PlanningReview,
                "Planning sign-off",
                "Confirm the plan and authorize writing to begin",
            )
            .milestone(),
        ],
    }
}

/// The narrative writing task for chapter `n`.
pub fn write_chapter_task(n: u32) -> Task {
    Task::new(
        Role::Narrative,
        TaskKind::WriteChapter(n),
        format!("Write chapter {}", n),
        format!("Write the full text of chapter {}", n),
    )
}

/// The creation and revision stages for chapter `n`, in run order.
pub fn build_chapter_workflow(n: u32) -> [Stage; 2] {
    let creation = Stage {
        name: StageName::Creation,
        chapter: Some(n),
        tasks: vec![
            write_chapter_task(n),
            Task::new(
                Role::Continuity,
                TaskKind::ContinuityCheck(n),
                "Continuity check",
                format!("Check chapter {} for contradictions", n),
            ),
            Task::new(
                Role::Quality,
                TaskKind::QualityAssessment(n),
                "Quality assessment",
                format!("Score chapter {} and list concrete improvements", n),
            ),
            Task::new(
                Role::Director,
                TaskKind::ChapterReview(n),
                "Chapter review",
                format!("Decide whether chapter {} needs revision", n),
            )
            .milestone(),
        ],
    };

    let revision = Stage {
        name: StageName::Revision,
        chapter: Some(n),
        tasks: vec![
            Task::new(
                Role::Narrative,
                TaskKind::ReviseChapter(n),
                "Revise chapter",
                format!("Revise chapter {} using the review feedback", n),
            )
            .conditional(),
            Task::new(
                Role::Continuity,
                TaskKind::Revalidate(n),
                "Revalidation",
                format!("Re-check the revised chapter {}", n),
            )
            .conditional(),
            Task::new(
                Role::Quality,
                TaskKind::FinalScore(n),
                "Final scoring",
                format!("Give chapter {} its final score", n),
            )
            .conditional(),
        ],
    };

    [creation, revision]
}

pub fn forward_planning_stage() -> Stage {
    Stage {
        name: StageName::Forward,
        chapter: None,
        tasks: vec![
            Task::new(
                Role::Quality,
                TaskKind::ProgressAnalysis,
                "Progress analysis",
                "Analyse the chapters written so far",
            ),
            Task::new(
                Role::Plot,
                TaskKind::ForwardPlanning,
                "Forward planning",
                "Plan the next stretch of chapters",
            ),
            Task::new(
                Role::Director,
                TaskKind::StrategicDecision,
                "Strategic decision",
                "Set the direction for the next stretch",
            )
            .milestone(),
        ],
    }
}

/// Whether a forward-planning pass follows chapter `k`.
pub fn forward_planning_due(k: u32, target: u32, interval: u32) -> bool {
    interval > 0 && k % interval == 0 && k < target
}

/// Total tasks a run covers when it writes chapters `start..=target`.
///
/// Setup stages are always counted; skipped ones are credited as completed.
pub fn planned_task_count(start: u32, target: u32, forward_interval: u32) -> u32 {
    let setup = (concept_stage().len() + planning_stage().len()) as u32;
    let per_chapter: u32 = build_chapter_workflow(1).iter().map(|s| s.len() as u32).sum();
    let forward = forward_planning_stage().len() as u32;

    (start.max(1)..=target)
        .map(|k| {
            if forward_planning_due(k, target, forward_interval) {
                per_chapter + forward
            } else {
                per_chapter
            }
        })
        .sum::<u32>()
        + setup
}
