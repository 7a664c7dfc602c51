use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One generated chapter.
///
/// Records are appended by the narrative writing task (numbers start at 1 and
/// grow by one) and afterwards only mutated in place by revision and scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub number: u32,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_scored_at: Option<DateTime<Utc>>,
    /// Report produced by the final scoring task, kept alongside the text it scores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score_report: Option<String>,
}

impl ChapterRecord {
    pub fn new(number: u32, content: &str) -> Self {
        Self {
            number,
            content: content.to_string(),
            created_at: Utc::now(),
            revised_at: None,
            final_scored_at: None,
            final_score_report: None,
        }
    }

    /// Replace the chapter text with a revised version.
    pub fn revise(&mut self, content: &str) {
        self.content = content.to_string();
        self.revised_at = Some(Utc::now());
    }

    /// Attach the final scoring report.
    pub fn mark_final_scored(&mut self, report: &str) {
        self.final_score_report = Some(report.to_string());
        self.final_scored_at = Some(Utc::now());
    }

    /// Length in characters, the unit the exporter reports.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// The first `n` non-empty lines joined by spaces.
    ///
    /// A cheap proxy for the chapter's key events.
    pub fn leading_lines(&self, n: usize) -> String {
        self.non_empty_lines().take(n).collect::<Vec<_>>().join(" ")
    }

    /// The last `n` non-empty lines joined by spaces.
    ///
    /// A cheap proxy for the open hook the chapter ends on.
    pub fn trailing_lines(&self, n: usize) -> String {
        let lines: Vec<&str> = self.non_empty_lines().collect();
        let start = lines.len().saturating_sub(n);
        lines[start..].join(" ")
    }

    fn non_empty_lines(&self) -> impl Iterator<Item = &str> {
        self.content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }
}
