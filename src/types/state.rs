//! Quiz phase tags and the top-level quiz state

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    BankPhase, Face, LineId, LineState, OptionKey, Pick, SeverityLevel, SifCounters, SifResult,
};

/// The phase state machine: A → B → C → D → E → Archetype → Summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuizPhase {
    /// Choosing the three A-lines
    A,
    /// Duel questions on the A-lines
    B,
    /// Module questions on the non-A lines
    C,
    /// Verdict recomputation pass
    D,
    /// Anchor (Primary) selection
    E,
    /// Installed-face choice from the shortlist
    Archetype,
    /// Final result
    Summary,
}

impl QuizPhase {
    /// The phase that follows this one
    pub fn next(&self) -> Option<QuizPhase> {
        match self {
            QuizPhase::A => Some(QuizPhase::B),
            QuizPhase::B => Some(QuizPhase::C),
            QuizPhase::C => Some(QuizPhase::D),
            QuizPhase::D => Some(QuizPhase::E),
            QuizPhase::E => Some(QuizPhase::Archetype),
            QuizPhase::Archetype => Some(QuizPhase::Summary),
            QuizPhase::Summary => None,
        }
    }

    /// Short marker for terminal prompts
    pub fn emoji(&self) -> &'static str {
        match self {
            QuizPhase::A => "🧭",
            QuizPhase::B => "⚔",
            QuizPhase::C => "🧩",
            QuizPhase::D => "⚖",
            QuizPhase::E => "⚓",
            QuizPhase::Archetype => "🎭",
            QuizPhase::Summary => "🏁",
        }
    }
}

impl std::fmt::Display for QuizPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QuizPhase::A => "PHASE_A",
            QuizPhase::B => "PHASE_B",
            QuizPhase::C => "PHASE_C",
            QuizPhase::D => "PHASE_D",
            QuizPhase::E => "PHASE_E",
            QuizPhase::Archetype => "ARCHETYPE",
            QuizPhase::Summary => "SUMMARY",
        };
        write!(f, "{}", name)
    }
}

/// Set of question ids already shown and answered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsedQuestions(BTreeSet<String>);

impl UsedQuestions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an id as used. Idempotent; returns true on first insert.
    pub fn mark_used(&mut self, id: &str) -> bool {
        self.0.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl FromIterator<String> for UsedQuestions {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One append-only history record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub question_id: String,
    pub phase: BankPhase,
    pub line: LineId,
    pub choice: OptionKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick: Option<Pick>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<SeverityLevel>,
    pub answered_at: DateTime<Utc>,
}

/// Top-level quiz state, owned by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizState {
    pub phase: QuizPhase,
    pub lines: Vec<LineState>,
    pub anchor: Option<Face>,
    pub final_archetype: Option<String>,
    pub used_questions: UsedQuestions,
    pub question_history: Vec<HistoryEntry>,
    pub sif_counters: SifCounters,
    pub sif_shortlist: Vec<Face>,
    pub installed_choice: Option<Face>,
    pub sif_result: Option<SifResult>,
}

impl Default for QuizState {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizState {
    /// Fresh state: phase A, all seven lines empty
    pub fn new() -> Self {
        Self {
            phase: QuizPhase::A,
            lines: LineId::ALL.iter().map(|l| LineState::new(*l)).collect(),
            anchor: None,
            final_archetype: None,
            used_questions: UsedQuestions::new(),
            question_history: Vec::new(),
            sif_counters: SifCounters::new(),
            sif_shortlist: Vec::new(),
            installed_choice: None,
            sif_result: None,
        }
    }

    /// Record for a line
    pub fn line(&self, line: LineId) -> &LineState {
        // lines is always built from LineId::ALL in order
        &self.lines[line_index(line)]
    }

    pub(crate) fn line_mut(&mut self, line: LineId) -> &mut LineState {
        &mut self.lines[line_index(line)]
    }

    /// Lines selected in phase A
    pub fn a_lines(&self) -> Vec<LineId> {
        self.lines.iter().filter(|l| l.selected_a).map(|l| l.line).collect()
    }

    /// Lines not selected in phase A, canonical order
    pub fn non_a_lines(&self) -> Vec<LineId> {
        self.lines.iter().filter(|l| !l.selected_a).map(|l| l.line).collect()
    }
}

fn line_index(line: LineId) -> usize {
    LineId::ALL
        .iter()
        .position(|l| *l == line)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        let mut phase = QuizPhase::A;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            assert!(next > phase);
            seen.push(next);
            phase = next;
        }
        assert_eq!(seen.len(), 7);
        assert_eq!(phase, QuizPhase::Summary);
    }

    #[test]
    fn test_mark_used_idempotent() {
        let mut used = UsedQuestions::new();
        assert!(used.mark_used("q1"));
        assert!(!used.mark_used("q1"));
        assert_eq!(used.len(), 1);
    }

    #[test]
    fn test_new_state_has_seven_lines() {
        let state = QuizState::new();
        assert_eq!(state.lines.len(), 7);
        assert_eq!(state.line(LineId::Stress).line, LineId::Stress);
        assert!(state.a_lines().is_empty());
        assert_eq!(state.non_a_lines().len(), 7);
    }
}
