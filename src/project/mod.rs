//! The project aggregate: run parameters, the shared context store and the
//! chapter sequence.
//!
//! [`Project::commit`] is the only path that mutates artifacts. It applies the
//! task's [`CommitShape`] and then appends the generic history entry.

mod chapter;
mod context;

pub use chapter::ChapterRecord;
pub use context::{ArtifactSlot, ContextStore, HistoryEntry, history_key};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::str::FromStr;
use tracing::warn;

use crate::errors::ValidationError;
use crate::workflow::{CommitShape, Task};

/// Artifact key naming the chapter sequence.
pub const CHAPTERS_KEY: &str = "chapters";

/// Requested novel length, mapped to a target chapter count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthClass {
    Short,
    #[default]
    Medium,
    Long,
    /// Keep writing until stopped.
    Infinite,
}

impl LengthClass {
    pub fn target_chapters(self) -> u32 {
        match self {
            LengthClass::Short => 20,
            LengthClass::Medium => 40,
            LengthClass::Long => 60,
            LengthClass::Infinite => 999,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LengthClass::Short => "short",
            LengthClass::Medium => "medium",
            LengthClass::Long => "long",
            LengthClass::Infinite => "infinite",
        }
    }
}

impl FromStr for LengthClass {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(LengthClass::Short),
            "medium" => Ok(LengthClass::Medium),
            "long" => Ok(LengthClass::Long),
            "infinite" => Ok(LengthClass::Infinite),
            other => Err(ValidationError::UnknownLength(other.to_string())),
        }
    }
}

impl std::fmt::Display for LengthClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse position in the story arc, derived from chapter progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotStage {
    Opening,
    Development,
    Climax,
    Resolution,
}

impl PlotStage {
    pub fn from_progress(written: usize, target: u32) -> Self {
        let progress = if target == 0 {
            1.0
        } else {
            written as f64 / f64::from(target)
        };
        if progress < 0.2 {
            PlotStage::Opening
        } else if progress < 0.7 {
            PlotStage::Development
        } else if progress < 0.9 {
            PlotStage::Climax
        } else {
            PlotStage::Resolution
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlotStage::Opening => "opening",
            PlotStage::Development => "development",
            PlotStage::Climax => "climax",
            PlotStage::Resolution => "resolution",
        }
    }
}

/// What a commit changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Sequence number of the history entry written by the commit.
    pub sequence: u64,
    /// Chapter whose record was created or changed, if any.
    pub chapter: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    pub genre: String,
    pub concept: String,
    pub length: LengthClass,
    pub target_chapters: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_content: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub context: ContextStore,
    #[serde(default)]
    pub chapters: Vec<ChapterRecord>,
}

impl Project {
    /// Create an empty project, rejecting a blank title or concept.
    pub fn new(
        title: &str,
        genre: &str,
        concept: &str,
        length: LengthClass,
    ) -> Result<Self, ValidationError> {
        if title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if concept.trim().is_empty() {
            return Err(ValidationError::MissingConcept);
        }
        Ok(Self {
            title: title.trim().to_string(),
            genre: genre.trim().to_string(),
            concept: concept.trim().to_string(),
            length,
            target_chapters: length.target_chapters(),
            style: None,
            style_content: None,
            created_at: Utc::now(),
            context: ContextStore::new(),
            chapters: Vec::new(),
        })
    }

    pub fn with_style(mut self, name: &str, content: &str) -> Self {
        self.style = Some(name.to_string());
        self.style_content = Some(content.to_string());
        self
    }

    /// Override the chapter target derived from the length class.
    pub fn with_target_chapters(mut self, target: u32) -> Self {
        self.target_chapters = target;
        self
    }

    /// Number the next written chapter will receive.
    pub fn next_chapter_number(&self) -> u32 {
        self.chapters.len() as u32 + 1
    }

    pub fn chapter(&self, number: u32) -> Option<&ChapterRecord> {
        self.chapters.iter().find(|c| c.number == number)
    }

    pub fn last_chapter(&self) -> Option<&ChapterRecord> {
        self.chapters.last()
    }

    pub fn is_complete(&self) -> bool {
        self.next_chapter_number() > self.target_chapters
    }

    pub fn plot_stage(&self) -> PlotStage {
        PlotStage::from_progress(self.chapters.len(), self.target_chapters)
    }

    /// Apply an approved task output.
    ///
    /// Writes the typed slot or chapter change for the task kind, then the
    /// generic history entry. Revision and scoring of a chapter that does not
    /// exist are logged and recorded in history only.
    pub fn commit(&mut self, task: &Task, content: &str) -> CommitReceipt {
        let mut chapter = None;

        match task.kind.commit_shape() {
            CommitShape::Slot(slot) => self.context.set_slot(slot, content),
            CommitShape::AppendChapter(expected) => {
                let number = self.next_chapter_number();
                if number != expected {
                    warn!(
                        expected,
                        assigned = number,
                        "Chapter number differs from the written task, keeping sequence contiguous"
                    );
                }
                self.chapters.push(ChapterRecord::new(number, content));
                chapter = Some(number);
            }
            CommitShape::ReviseChapter(number) => {
                match self.chapters.iter_mut().find(|c| c.number == number) {
                    Some(record) => {
                        record.revise(content);
                        chapter = Some(number);
                    }
                    None => warn!(chapter = number, "Revision for a chapter that was never written"),
                }
            }
            CommitShape::ScoreChapter(number) => {
                match self.chapters.iter_mut().find(|c| c.number == number) {
                    Some(record) => {
                        record.mark_final_scored(content);
                        chapter = Some(number);
                    }
                    None => warn!(chapter = number, "Final score for a chapter that was never written"),
                }
            }
            CommitShape::HistoryOnly => {}
        }

        let sequence = self.context.record_history(
            task.role,
            &task.name,
            chapter.or(task.kind.chapter()),
            content,
        );
        CommitReceipt { sequence, chapter }
    }

    /// Resolve an artifact key against the whole project.
    ///
    /// `chapters` is the chapter sequence joined in order; every other key goes
    /// through [`ContextStore::get`].
    pub fn artifact(&self, key: &str) -> Option<Cow<'_, str>> {
        if key == CHAPTERS_KEY {
            if self.chapters.is_empty() {
                return None;
            }
            let joined = self
                .chapters
                .iter()
                .map(|c| c.content.trim())
                .collect::<Vec<_>>()
                .join("\n\n");
            return Some(Cow::Owned(joined));
        }
        self.context.get(key).map(Cow::Borrowed)
    }
}
