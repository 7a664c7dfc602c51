use serde::{Deserialize, Serialize};

use super::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    Concept,
    Planning,
    Creation,
    Revision,
    Forward,
}

impl StageName {
    pub fn as_str(self) -> &'static str {
        match self {
            StageName::Concept => "concept",
            StageName::Planning => "planning",
            StageName::Creation => "creation",
            StageName::Revision => "revision",
            StageName::Forward => "forward",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StageName::Concept => "Concept design",
            StageName::Planning => "Detailed planning",
            StageName::Creation => "Chapter creation",
            StageName::Revision => "Revision",
            StageName::Forward => "Forward planning",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered list of tasks run as one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub name: StageName,
    /// Chapter the stage was built for, for per-chapter stages.
    pub chapter: Option<u32>,
    pub tasks: Vec<Task>,
}

impl Stage {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn milestone_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.milestone).count()
    }

    /// Display title, e.g. `Chapter creation (chapter 3)`.
    pub fn title(&self) -> String {
        match self.chapter {
            Some(n) => format!("{} (chapter {})", self.name.label(), n),
            None => self.name.label().to_string(),
        }
    }
}
