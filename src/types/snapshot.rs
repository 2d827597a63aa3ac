//! Persisted session snapshot layout
//!
//! Written behind the engine after each answer and read only when resuming.
//! Snapshots older than the TTL are treated as expired.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::SNAPSHOT_TTL_HOURS;
use crate::types::{
    BState, Decision, Face, HistoryEntry, LineId, QuizPhase, SeverityLevel, UsedQuestions, Verdict,
};

/// Phase C gate: progress is blocked while a severity probe is pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseCGate {
    /// Decisions may be recorded
    Idle,
    /// The named line reached F and needs a severity selection
    AwaitingSeverity(LineId),
    /// Every non-A line is complete
    Complete,
}

/// Phase B progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseBState {
    /// A-lines in traversal order
    pub a_lines: Vec<LineId>,
    pub lines: BTreeMap<LineId, BState>,
    #[serde(default)]
    pub verdicts: BTreeMap<LineId, Verdict>,
}

/// Phase C per-line record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModLineState {
    pub decisions: Vec<Decision>,
    pub verdict: Option<Verdict>,
    pub f_severity: Option<SeverityLevel>,
    pub f_severity_score: Option<f64>,
}

/// Phase C progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseCState {
    pub gate: PhaseCGate,
    pub lines: BTreeMap<LineId, ModLineState>,
}

/// A complete persisted session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub phase: QuizPhase,
    pub used_questions: UsedQuestions,
    pub question_history: Vec<HistoryEntry>,
    pub phase_b_state: Option<PhaseBState>,
    pub phase_c_state: Option<PhaseCState>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub anchor: Option<Face>,
    #[serde(default)]
    pub installed_choice: Option<Face>,
}

impl SessionSnapshot {
    /// Older than the TTL at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.last_updated) > Duration::hours(SNAPSHOT_TTL_HOURS)
    }
}
