//! Revision policy for the conditional revision stage.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::project::{Project, history_key};
use crate::workflow::{Role, Task};

static SCORE_OUT_OF_TEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*/\s*10").expect("valid regex"));
static SCORE_FEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*分").expect("valid regex"));

/// When the revision stage of a chapter runs.
///
/// In `novel.toml`:
///
/// ```toml
/// [workflow]
/// revision = "always"            # or "never"
/// # revision = { below_score = 7.5 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionPolicy {
    #[default]
    Always,
    Never,
    /// Revise only when the quality score is below the threshold or missing.
    BelowScore(f32),
}

impl RevisionPolicy {
    /// Whether a conditional task should run against the current project.
    ///
    /// Unconditional tasks always run.
    pub fn should_run(&self, task: &Task, project: &Project) -> bool {
        if !task.conditional {
            return true;
        }
        match *self {
            RevisionPolicy::Always => true,
            RevisionPolicy::Never => false,
            RevisionPolicy::BelowScore(threshold) => {
                match chapter_score(project, task.kind.chapter()) {
                    Some(score) => score < threshold,
                    None => true,
                }
            }
        }
    }
}

impl std::fmt::Display for RevisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevisionPolicy::Always => write!(f, "always"),
            RevisionPolicy::Never => write!(f, "never"),
            RevisionPolicy::BelowScore(t) => write!(f, "below_score {}", t),
        }
    }
}

/// Score of the latest quality assessment committed for chapter `n`.
fn chapter_score(project: &Project, n: Option<u32>) -> Option<f32> {
    let key = history_key(Role::Quality, "Quality assessment");
    project
        .context
        .latest_for_chapter(&key, n?)
        .and_then(|entry| parse_score(&entry.content))
}

/// First score in a quality report, as `N/10` or `N分`.
pub fn parse_score(report: &str) -> Option<f32> {
    let out_of_ten = SCORE_OUT_OF_TEN
        .captures(report)
        .map(|c| (c.get(0).map_or(usize::MAX, |m| m.start()), c[1].to_string()));
    let fen = SCORE_FEN
        .captures(report)
        .map(|c| (c.get(0).map_or(usize::MAX, |m| m.start()), c[1].to_string()));

    let earliest = match (out_of_ten, fen) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    earliest.and_then(|(_, n)| n.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::LengthClass;
    use crate::workflow::build_chapter_workflow;

    fn project_with_quality(report: Option<&str>) -> Project {
        let mut project = Project::new("T", "g", "c", LengthClass::Short).unwrap();
        if let Some(report) = report {
            let [creation, _] = build_chapter_workflow(1);
            project.commit(&creation.tasks[0], "draft one");
            project.commit(&creation.tasks[2], report);
        }
        project
    }

    #[test]
    fn test_parse_score_formats() {
        assert_eq!(parse_score("Score: 7/10, solid pacing"), Some(7.0));
        assert_eq!(parse_score("overall 8.5 / 10"), Some(8.5));
        assert_eq!(parse_score("综合评分：6分"), Some(6.0));
        assert_eq!(parse_score("no number here"), None);
    }

    #[test]
    fn test_parse_score_takes_first_occurrence() {
        assert_eq!(parse_score("评分 9分, dialogue 5/10"), Some(9.0));
        assert_eq!(parse_score("dialogue 5/10, total 9分"), Some(5.0));
    }

    #[test]
    fn test_unconditional_tasks_always_run() {
        let [creation, _] = build_chapter_workflow(1);
        let project = project_with_quality(None);
        assert!(RevisionPolicy::Never.should_run(&creation.tasks[0], &project));
    }

    #[test]
    fn test_always_and_never() {
        let [_, revision] = build_chapter_workflow(1);
        let project = project_with_quality(None);
        assert!(RevisionPolicy::Always.should_run(&revision.tasks[0], &project));
        assert!(!RevisionPolicy::Never.should_run(&revision.tasks[0], &project));
    }

    #[test]
    fn test_below_score_threshold() {
        let [_, revision] = build_chapter_workflow(1);
        let policy = RevisionPolicy::BelowScore(7.5);
        assert!(policy.should_run(&revision.tasks[0], &project_with_quality(Some("Score: 6/10"))));
        assert!(!policy.should_run(&revision.tasks[0], &project_with_quality(Some("Score: 9/10"))));
        assert!(
            policy.should_run(&revision.tasks[0], &project_with_quality(Some("great chapter"))),
            "missing score means revise"
        );
        assert!(policy.should_run(&revision.tasks[0], &project_with_quality(None)));
    }

    #[test]
    fn test_below_score_reads_the_revised_chapters_own_assessment() {
        let mut project = project_with_quality(Some("Score: 9/10"));
        let [creation, revision] = build_chapter_workflow(2);
        project.commit(&creation.tasks[0], "draft two");

        let policy = RevisionPolicy::BelowScore(8.0);
        assert!(
            policy.should_run(&revision.tasks[0], &project),
            "chapter 2 has no assessment yet"
        );

        project.commit(&creation.tasks[2], "Score: 6/10");
        let [_, first_revision] = build_chapter_workflow(1);
        assert!(!policy.should_run(&first_revision.tasks[0], &project));
        assert!(policy.should_run(&revision.tasks[0], &project));
    }

    #[test]
    fn test_policy_toml_forms() {
        #[derive(Deserialize)]
        struct Wrapper {
            revision: RevisionPolicy,
        }
        let w: Wrapper = toml::from_str(r#"revision = "never""#).unwrap();
        assert_eq!(w.revision, RevisionPolicy::Never);
        let w: Wrapper = toml::from_str("revision = { below_score = 7.5 }").unwrap();
        assert_eq!(w.revision, RevisionPolicy::BelowScore(7.5));
    }
}
