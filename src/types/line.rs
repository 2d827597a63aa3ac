//! Lines, picks, verdicts and the per-line accumulated record

use serde::{Deserialize, Serialize};
use crate::{
    PICK_VALUE_C, PICK_VALUE_O, PICK_VALUE_F,
    SEVERITY_HIGH_SCORE, SEVERITY_MID_SCORE, SEVERITY_LOW_SCORE,
};
use crate::types::Archetype;

/// The seven fixed trait dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LineId {
    Control,
    Pace,
    Boundary,
    Truth,
    Recognition,
    Bonding,
    Stress,
}

impl LineId {
    /// All lines in canonical order
    pub const ALL: [LineId; 7] = [
        LineId::Control,
        LineId::Pace,
        LineId::Boundary,
        LineId::Truth,
        LineId::Recognition,
        LineId::Bonding,
        LineId::Stress,
    ];

    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            LineId::Control => "Control",
            LineId::Pace => "Pace",
            LineId::Boundary => "Boundary",
            LineId::Truth => "Truth",
            LineId::Recognition => "Recognition",
            LineId::Bonding => "Bonding",
            LineId::Stress => "Stress",
        }
    }

    /// Case-insensitive lookup by name
    pub fn from_name(name: &str) -> Option<LineId> {
        let name = name.trim();
        Self::ALL.iter().copied().find(|l| l.name().eq_ignore_ascii_case(name))
    }

    /// Archetype shown when the line's verdict is C
    pub fn clean_archetype(&self) -> Archetype {
        match self {
            LineId::Control => Archetype::Sovereign,
            LineId::Pace => Archetype::Navigator,
            LineId::Boundary => Archetype::Guardian,
            LineId::Truth => Archetype::Sage,
            LineId::Recognition => Archetype::Artisan,
            LineId::Bonding => Archetype::Caretaker,
            LineId::Stress => Archetype::Stoic,
        }
    }

    /// Archetype shown when the line's verdict is O or F
    pub fn shadow_archetype(&self) -> Archetype {
        match self {
            LineId::Control => Archetype::Rebel,
            LineId::Pace => Archetype::Visionary,
            LineId::Boundary => Archetype::Wanderer,
            LineId::Truth => Archetype::Advocate,
            LineId::Recognition => Archetype::Star,
            LineId::Bonding => Archetype::Loyalist,
            LineId::Stress => Archetype::Firebrand,
        }
    }
}

impl std::fmt::Display for LineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single answer pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pick {
    C,
    O,
    F,
}

impl Pick {
    /// Value used by the A-line face purity formula
    pub fn purity_value(&self) -> f64 {
        match self {
            Pick::C => PICK_VALUE_C,
            Pick::O => PICK_VALUE_O,
            Pick::F => PICK_VALUE_F,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Pick::C => 'C',
            Pick::O => 'O',
            Pick::F => 'F',
        }
    }
}

impl std::fmt::Display for Pick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Line outcome: clean, offset or fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    C,
    O,
    F,
}

impl Verdict {
    pub fn description(&self) -> &'static str {
        match self {
            Verdict::C => "clean",
            Verdict::O => "offset",
            Verdict::F => "fail",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Verdict::C => "C",
            Verdict::O => "O",
            Verdict::F => "F",
        };
        write!(f, "{}", name)
    }
}

/// Phase C decision slot, always recorded in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionType {
    CO1,
    CO2,
    CF,
}

impl DecisionType {
    pub const SEQUENCE: [DecisionType; 3] = [DecisionType::CO1, DecisionType::CO2, DecisionType::CF];

    /// Slot for the n-th decision (0-based)
    pub fn for_index(index: usize) -> Option<DecisionType> {
        Self::SEQUENCE.get(index).copied()
    }

    /// True for the CF slot
    pub fn is_cf(&self) -> bool {
        matches!(self, DecisionType::CF)
    }
}

/// One recorded Phase C decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(rename = "type")]
    pub decision_type: DecisionType,
    pub pick: Pick,
}

/// Severity probe answer for an F-verdict line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    High,
    Mid,
    Low,
}

impl SeverityLevel {
    pub fn score(&self) -> f64 {
        match self {
            SeverityLevel::High => SEVERITY_HIGH_SCORE,
            SeverityLevel::Mid => SEVERITY_MID_SCORE,
            SeverityLevel::Low => SEVERITY_LOW_SCORE,
        }
    }
}

impl std::fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SeverityLevel::High => "high",
            SeverityLevel::Mid => "mid",
            SeverityLevel::Low => "low",
        };
        write!(f, "{}", name)
    }
}

/// Phase B record (A-lines only)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BState {
    pub picks: Vec<Pick>,
    /// Running face purity: seed plus the value of every pick so far
    pub c_evidence: f64,
}

/// Phase C record (non-A lines only)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModState {
    pub decisions: Vec<Decision>,
}

impl ModState {
    /// Picks in recorded order
    pub fn picks(&self) -> Vec<Pick> {
        self.decisions.iter().map(|d| d.pick).collect()
    }
}

/// Per-line accumulated record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineState {
    pub line: LineId,
    pub selected_a: bool,
    #[serde(rename = "B")]
    pub b: BState,
    #[serde(rename = "mod")]
    pub module: ModState,
    pub verdict: Option<Verdict>,
    pub f_severity: Option<SeverityLevel>,
    pub f_severity_score: Option<f64>,
}

impl LineState {
    /// Fresh record for a line
    pub fn new(line: LineId) -> Self {
        Self {
            line,
            selected_a: false,
            b: BState::default(),
            module: ModState::default(),
            verdict: None,
            f_severity: None,
            f_severity_score: None,
        }
    }

    /// Picks along this line's answer path (B picks for A-lines, module picks otherwise)
    pub fn path(&self) -> Vec<Pick> {
        if self.selected_a {
            self.b.picks.clone()
        } else {
            self.module.picks()
        }
    }

    /// All required picks are in
    pub fn picks_complete(&self) -> bool {
        if self.selected_a {
            self.b.picks.len() == 2
        } else {
            self.module.decisions.len() == 3
        }
    }

    /// Picks complete and, for an F verdict, the severity probe answered
    pub fn is_complete(&self) -> bool {
        if !self.picks_complete() {
            return false;
        }
        match self.verdict {
            Some(Verdict::F) if !self.selected_a => self.f_severity.is_some(),
            Some(_) => true,
            None => false,
        }
    }

    /// Check the A / non-A field exclusivity
    pub fn check_invariant(&self) -> Result<(), String> {
        if self.selected_a && !self.module.decisions.is_empty() {
            return Err(format!("A-line {} carries module decisions", self.line));
        }
        if !self.selected_a && !self.b.picks.is_empty() {
            return Err(format!("non-A line {} carries B picks", self.line));
        }
        if self.b.picks.len() > 2 {
            return Err(format!("line {} has more than 2 B picks", self.line));
        }
        if self.module.decisions.len() > 3 {
            return Err(format!("line {} has more than 3 module decisions", self.line));
        }
        // phase D may downgrade F to O; the severity record stays
        if self.f_severity.is_some() && !matches!(self.verdict, Some(Verdict::F) | Some(Verdict::O)) {
            return Err(format!("line {} has a severity without a fail verdict", self.line));
        }
        Ok(())
    }
}

/// Partial update applied by the orchestrator's `update_line`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineUpdate {
    pub selected_a: Option<bool>,
    pub b: Option<BState>,
    pub module: Option<ModState>,
    pub verdict: Option<Option<Verdict>>,
    pub f_severity: Option<SeverityLevel>,
    pub f_severity_score: Option<f64>,
}

impl LineUpdate {
    /// Apply onto a copy of `line`
    pub fn applied_to(&self, line: &LineState) -> LineState {
        let mut next = line.clone();
        if let Some(selected) = self.selected_a {
            next.selected_a = selected;
        }
        if let Some(ref b) = self.b {
            next.b = b.clone();
        }
        if let Some(ref module) = self.module {
            next.module = module.clone();
        }
        if let Some(verdict) = self.verdict {
            next.verdict = verdict;
        }
        if let Some(level) = self.f_severity {
            next.f_severity = Some(level);
        }
        if let Some(score) = self.f_severity_score {
            next.f_severity_score = Some(score);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_lookup_is_case_insensitive() {
        assert_eq!(LineId::from_name("recognition"), Some(LineId::Recognition));
        assert_eq!(LineId::from_name("  PACE "), Some(LineId::Pace));
        assert_eq!(LineId::from_name("Speed"), None);
    }

    #[test]
    fn test_invariant_rejects_mixed_records() {
        let mut line = LineState::new(LineId::Truth);
        line.selected_a = true;
        line.module.decisions.push(Decision { decision_type: DecisionType::CO1, pick: Pick::C });
        assert!(line.check_invariant().is_err());

        let mut line = LineState::new(LineId::Truth);
        line.b.picks.push(Pick::O);
        assert!(line.check_invariant().is_err());
    }

    #[test]
    fn test_f_line_incomplete_until_severity() {
        let mut line = LineState::new(LineId::Stress);
        for (t, p) in [(DecisionType::CO1, Pick::C), (DecisionType::CO2, Pick::O), (DecisionType::CF, Pick::F)] {
            line.module.decisions.push(Decision { decision_type: t, pick: p });
        }
        line.verdict = Some(Verdict::F);
        assert!(line.picks_complete());
        assert!(!line.is_complete());

        line.f_severity = Some(SeverityLevel::Mid);
        line.f_severity_score = Some(0.5);
        assert!(line.is_complete());
    }

    #[test]
    fn test_serialized_field_names() {
        let line = LineState::new(LineId::Control);
        let json = serde_json::to_string(&line).unwrap();
        assert!(json.contains("\"selectedA\""));
        assert!(json.contains("\"B\""));
        assert!(json.contains("\"mod\""));
        assert!(json.contains("\"cEvidence\""));
    }
}
