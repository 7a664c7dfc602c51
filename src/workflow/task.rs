use serde::{Deserialize, Serialize};

use super::Role;
use crate::project::{ArtifactSlot, history_key};

/// Every kind of task the engine knows how to prompt for and commit.
///
/// Chapter-scoped kinds carry the chapter number they operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "chapter")]
pub enum TaskKind {
    CoreConcept,
    CharacterConcept,
    PlotStructure,
    ConceptReview,
    ChapterPlanning,
    CharacterDevelopment,
    WorldBuilding,
    PlanningAssessment,
    PlanningReview,
    WriteChapter(u32),
    ContinuityCheck(u32),
    QualityAssessment(u32),
    ChapterReview(u32),
    ReviseChapter(u32),
    Revalidate(u32),
    FinalScore(u32),
    ProgressAnalysis,
    ForwardPlanning,
    StrategicDecision,
}

/// Where a committed output lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitShape {
    /// Overwrite a typed latest-artifact slot.
    Slot(ArtifactSlot),
    /// Append a new chapter record; carries the number the task was built for.
    AppendChapter(u32),
    /// Replace the content of an existing chapter.
    ReviseChapter(u32),
    /// Attach the final score report to an existing chapter.
    ScoreChapter(u32),
    HistoryOnly,
}

impl TaskKind {
    /// Chapter this task operates on, if it is chapter-scoped.
    pub fn chapter(self) -> Option<u32> {
        match self {
            TaskKind::WriteChapter(n)
            | TaskKind::ContinuityCheck(n)
            | TaskKind::QualityAssessment(n)
            | TaskKind::ChapterReview(n)
            | TaskKind::ReviseChapter(n)
            | TaskKind::Revalidate(n)
            | TaskKind::FinalScore(n) => Some(n),
            _ => None,
        }
    }

    pub fn commit_shape(self) -> CommitShape {
        match self {
            TaskKind::CoreConcept => CommitShape::Slot(ArtifactSlot::Worldview),
            TaskKind::CharacterConcept | TaskKind::CharacterDevelopment => {
                CommitShape::Slot(ArtifactSlot::Characters)
            }
            TaskKind::PlotStructure => CommitShape::Slot(ArtifactSlot::PlotStructure),
            TaskKind::ChapterPlanning => CommitShape::Slot(ArtifactSlot::Outline),
            TaskKind::ForwardPlanning => CommitShape::Slot(ArtifactSlot::ForwardPlan),
            TaskKind::WriteChapter(n) => CommitShape::AppendChapter(n),
            TaskKind::ReviseChapter(n) => CommitShape::ReviseChapter(n),
            TaskKind::FinalScore(n) => CommitShape::ScoreChapter(n),
            TaskKind::ConceptReview
            | TaskKind::WorldBuilding
            | TaskKind::PlanningAssessment
            | TaskKind::PlanningReview
            | TaskKind::ContinuityCheck(_)
            | TaskKind::QualityAssessment(_)
            | TaskKind::ChapterReview(_)
            | TaskKind::Revalidate(_)
            | TaskKind::ProgressAnalysis
            | TaskKind::StrategicDecision => CommitShape::HistoryOnly,
        }
    }
}

/// One unit of work assigned to a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub role: Role,
    pub name: String,
    pub description: String,
    pub milestone: bool,
    /// Whether the revision policy may skip this task.
    pub conditional: bool,
    pub kind: TaskKind,
}

impl Task {
    pub fn new(role: Role, kind: TaskKind, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            role,
            name: name.into(),
            description: description.into(),
            milestone: false,
            conditional: false,
            kind,
        }
    }

    pub fn milestone(mut self) -> Self {
        self.milestone = true;
        self
    }

    pub fn conditional(mut self) -> Self {
        self.conditional = true;
        self
    }

    /// Generic `${role}_${task_name}` history key for this task.
    pub fn history_key(&self) -> String {
        history_key(self.role, &self.name)
    }
}
