//! The shared artifact store every task reads from.
//!
//! A commit writes twice: once into a typed "latest artifact" slot (when the
//! task kind has one) and once into the append-only history log keyed by
//! `${role}_${task_name}`. Nothing is ever removed; a missing key means the
//! task that produces it has not committed yet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::workflow::Role;

/// Typed slots holding the latest committed artifact of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSlot {
    Worldview,
    Characters,
    PlotStructure,
    Outline,
    ForwardPlan,
}

impl ArtifactSlot {
    pub const ALL: [ArtifactSlot; 5] = [
        ArtifactSlot::Worldview,
        ArtifactSlot::Characters,
        ArtifactSlot::PlotStructure,
        ArtifactSlot::Outline,
        ArtifactSlot::ForwardPlan,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ArtifactSlot::Worldview => "worldview",
            ArtifactSlot::Characters => "characters",
            ArtifactSlot::PlotStructure => "plot_structure",
            ArtifactSlot::Outline => "outline",
            ArtifactSlot::ForwardPlan => "forward_plan",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.key() == key)
    }
}

impl std::fmt::Display for ArtifactSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// One committed task output in the audit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub sequence: u64,
    pub role: Role,
    pub task_name: String,
    /// Chapter the committing task belonged to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<u32>,
    pub content: String,
    pub committed_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Generic `${role}_${task_name}` key this entry is addressed by.
    pub fn key(&self) -> String {
        history_key(self.role, &self.task_name)
    }
}

pub fn history_key(role: Role, task_name: &str) -> String {
    format!("{}_{}", role, task_name)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextStore {
    #[serde(default)]
    slots: BTreeMap<ArtifactSlot, String>,
    #[serde(default)]
    history: Vec<HistoryEntry>,
    #[serde(default)]
    extras: BTreeMap<String, String>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, slot: ArtifactSlot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    /// Whether the slot holds non-blank text.
    pub fn has(&self, slot: ArtifactSlot) -> bool {
        self.slot(slot).is_some_and(|text| !text.trim().is_empty())
    }

    pub(crate) fn set_slot(&mut self, slot: ArtifactSlot, content: &str) {
        self.slots.insert(slot, content.to_string());
    }

    /// Append a history entry and return its sequence number.
    pub(crate) fn record_history(
        &mut self,
        role: Role,
        task_name: &str,
        chapter: Option<u32>,
        content: &str,
    ) -> u64 {
        let sequence = self.history.len() as u64 + 1;
        self.history.push(HistoryEntry {
            sequence,
            role,
            task_name: task_name.to_string(),
            chapter,
            content: content.to_string(),
            committed_at: Utc::now(),
        });
        sequence
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Latest history entry stored under a generic `${role}_${task_name}` key.
    pub fn latest_for(&self, key: &str) -> Option<&HistoryEntry> {
        self.history.iter().rev().find(|entry| entry.key() == key)
    }

    /// Latest entry under `key` committed by a task of chapter `n`.
    pub fn latest_for_chapter(&self, key: &str, n: u32) -> Option<&HistoryEntry> {
        self.history
            .iter()
            .rev()
            .find(|entry| entry.chapter == Some(n) && entry.key() == key)
    }

    pub fn set_extra(&mut self, key: &str, value: &str) {
        self.extras.insert(key.to_string(), value.to_string());
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }

    /// Resolve a stored key: typed slots first, then extras, then history.
    ///
    /// Chapter text is not kept here; `Project::artifact` resolves `chapters`.
    pub fn get(&self, key: &str) -> Option<&str> {
        if let Some(slot) = ArtifactSlot::from_key(key) {
            return self.slot(slot);
        }
        if let Some(value) = self.extra(key) {
            return Some(value);
        }
        self.latest_for(key).map(|entry| entry.content.as_str())
    }

    /// Concept stage markers: worldview, characters and a story structure.
    ///
    /// Either the concept-stage structure or the planning-stage outline counts
    /// as the structured outline.
    pub fn concept_complete(&self) -> bool {
        self.has(ArtifactSlot::Worldview)
            && self.has(ArtifactSlot::Characters)
            && (self.has(ArtifactSlot::PlotStructure) || self.has(ArtifactSlot::Outline))
    }

    /// Planning stage marker: a non-empty chapter outline.
    pub fn planning_complete(&self) -> bool {
        self.has(ArtifactSlot::Outline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_keys_round_trip() {
        for slot in ArtifactSlot::ALL {
            assert_eq!(ArtifactSlot::from_key(slot.key()), Some(slot));
        }
        assert_eq!(ArtifactSlot::from_key("chapters"), None);
    }

    #[test]
    fn test_blank_slot_does_not_count() {
        let mut store = ContextStore::new();
        store.set_slot(ArtifactSlot::Worldview, "   \n");
        assert!(store.slot(ArtifactSlot::Worldview).is_some());
        assert!(!store.has(ArtifactSlot::Worldview));
    }

    #[test]
    fn test_history_is_append_only_and_latest_wins() {
        let mut store = ContextStore::new();
        let first = store.record_history(Role::Quality, "Quality assessment", Some(1), "6/10");
        let second = store.record_history(Role::Quality, "Quality assessment", Some(2), "8/10");
        assert_eq!((first, second), (1, 2));
        assert_eq!(store.history().len(), 2);
        assert_eq!(
            store.get("quality_Quality assessment"),
            Some("8/10"),
            "lookup resolves to the newest entry"
        );
    }

    #[test]
    fn test_get_resolves_slots_extras_and_history() {
        let mut store = ContextStore::new();
        store.set_slot(ArtifactSlot::Outline, "1. Arrival");
        store.set_extra("reconstructed_context", "primed");
        store.record_history(Role::Director, "Chapter review", Some(1), "approved");
        assert_eq!(store.get("outline"), Some("1. Arrival"));
        assert_eq!(store.get("reconstructed_context"), Some("primed"));
        assert_eq!(store.get("director_Chapter review"), Some("approved"));
        assert_eq!(store.get("worldview"), None);
    }

    #[test]
    fn test_chapter_lookup_ignores_other_chapters() {
        let mut store = ContextStore::new();
        let key = history_key(Role::Quality, "Quality assessment");
        store.record_history(Role::Quality, "Quality assessment", Some(1), "Score: 9/10");
        store.record_history(Role::Quality, "Quality assessment", Some(2), "Score: 5/10");
        store.record_history(Role::Quality, "Quality assessment", Some(1), "Score: 7/10");

        let one = store.latest_for_chapter(&key, 1).unwrap();
        assert_eq!((one.sequence, one.content.as_str()), (3, "Score: 7/10"));
        assert_eq!(store.latest_for_chapter(&key, 2).unwrap().content, "Score: 5/10");
        assert!(store.latest_for_chapter(&key, 3).is_none());
    }

    #[test]
    fn test_entries_without_chapter_deserialize() {
        let json = r#"{"sequence":1,"role":"architect","task_name":"Core concept",
            "content":"w","committed_at":"2026-01-01T00:00:00Z"}"#;
        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.chapter, None);
        assert!(!serde_json::to_string(&entry).unwrap().contains("chapter"));
    }

    #[test]
    fn test_concept_complete_accepts_outline_as_structure() {
        let mut store = ContextStore::new();
        store.set_slot(ArtifactSlot::Worldview, "w");
        store.set_slot(ArtifactSlot::Characters, "c");
        assert!(!store.concept_complete());
        store.set_slot(ArtifactSlot::Outline, "o");
        assert!(store.concept_complete());
        assert!(store.planning_complete());
    }

    #[test]
    fn test_concept_complete_with_plot_structure_but_no_outline() {
        let mut store = ContextStore::new();
        store.set_slot(ArtifactSlot::Worldview, "w");
        store.set_slot(ArtifactSlot::Characters, "c");
        store.set_slot(ArtifactSlot::PlotStructure, "three acts");
        assert!(store.concept_complete());
        assert!(!store.planning_complete());
    }

    #[test]
    fn test_store_serializes_with_string_slot_keys() {
        let mut store = ContextStore::new();
        store.set_slot(ArtifactSlot::PlotStructure, "acts");
        let json = serde_json::to_string(&store).unwrap();
        assert!(json.contains("\"plot_structure\":\"acts\""));
        let back: ContextStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
    }
}
