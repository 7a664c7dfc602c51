use serde::{Deserialize, Serialize};

/// The seven creative roles a task can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Architect,
    Character,
    Plot,
    Narrative,
    Continuity,
    Quality,
    Director,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Architect,
        Role::Character,
        Role::Plot,
        Role::Narrative,
        Role::Continuity,
        Role::Quality,
        Role::Director,
    ];

    /// Stable identifier used in history keys and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Architect => "architect",
            Role::Character => "character",
            Role::Plot => "plot",
            Role::Narrative => "narrative",
            Role::Continuity => "continuity",
            Role::Quality => "quality",
            Role::Director => "director",
        }
    }

    /// Human-facing name shown on the review surface.
    pub fn label(self) -> &'static str {
        match self {
            Role::Architect => "Chief Architect",
            Role::Character => "Character Designer",
            Role::Plot => "Plot Strategist",
            Role::Narrative => "Narrative Writer",
            Role::Continuity => "Continuity Checker",
            Role::Quality => "Quality Assessor",
            Role::Director => "Director",
        }
    }

    /// The persona line prepended to every prompt for this role.
    pub fn persona(self) -> &'static str {
        match self {
            Role::Architect => {
                "You are the chief architect of a novel. You own the world, its rules and the overall shape of the story."
            }
            Role::Character => {
                "You are the character designer. You build memorable, consistent characters with clear motivations and arcs."
            }
            Role::Plot => {
                "You are the plot strategist. You plan chapters, pacing, foreshadowing and turning points."
            }
            Role::Narrative => {
                "You are the narrative writer. You turn plans into vivid, readable prose."
            }
            Role::Continuity => {
                "You are the continuity checker. You catch contradictions in facts, timeline, character behaviour and world rules."
            }
            Role::Quality => {
                "You are the quality assessor. You score writing honestly and give concrete, actionable feedback."
            }
            Role::Director => {
                "You are the director. You make the final call on whether work meets the bar and where the story goes next."
            }
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
