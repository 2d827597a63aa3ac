//! Question bank records
//!
//! Questions are immutable once the bank is loaded. Keyed by
//! `(phase, lineId, type, order)`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Face, LineId, Pick, SeverityLevel};

/// Which flow a question belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BankPhase {
    /// Phase B duel questions (A-lines)
    #[serde(rename = "B")]
    Duel,
    /// Phase C module questions (non-A lines)
    #[serde(rename = "C")]
    Module,
    /// Severity probe for F-verdict lines
    #[serde(rename = "SEV")]
    Severity,
}

impl std::fmt::Display for BankPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BankPhase::Duel => "B",
            BankPhase::Module => "C",
            BankPhase::Severity => "SEV",
        };
        write!(f, "{}", name)
    }
}

/// Question type: C-vs-O or C-vs-F
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    CO,
    CF,
}

impl QuestionType {
    /// Whether a pick is legal for this type
    pub fn allows(&self, pick: Pick) -> bool {
        match self {
            QuestionType::CO => pick != Pick::F,
            QuestionType::CF => pick != Pick::O,
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QuestionType::CO => "CO",
            QuestionType::CF => "CF",
        };
        write!(f, "{}", name)
    }
}

/// Option key shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionKey {
    A,
    B,
    C,
}

impl OptionKey {
    pub fn from_input(input: &str) -> Option<OptionKey> {
        match input.trim().to_ascii_uppercase().as_str() {
            "A" | "1" => Some(OptionKey::A),
            "B" | "2" => Some(OptionKey::B),
            "C" | "3" => Some(OptionKey::C),
            _ => None,
        }
    }
}

impl std::fmt::Display for OptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OptionKey::A => "A",
            OptionKey::B => "B",
            OptionKey::C => "C",
        };
        write!(f, "{}", name)
    }
}

/// Declarative counter effects attached to an option
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Effects {
    pub fam_c: Vec<LineId>,
    pub fam_o: Vec<LineId>,
    pub fam_f: Vec<LineId>,
    pub face_c: Vec<Face>,
    pub face_o: Vec<Face>,
    pub face_f: Vec<Face>,
}

impl Effects {
    pub fn is_empty(&self) -> bool {
        self.fam_c.is_empty()
            && self.fam_o.is_empty()
            && self.fam_f.is_empty()
            && self.face_c.is_empty()
            && self.face_o.is_empty()
            && self.face_f.is_empty()
    }
}

/// One answer option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub label: String,
    /// C/O/F mapping for duel and module questions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick: Option<Pick>,
    /// Severity mapping for severity probes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<SeverityLevel>,
    #[serde(default)]
    pub effects: Effects,
}

/// An immutable bank entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub phase: BankPhase,
    pub line_id: LineId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuestionType>,
    #[serde(default = "default_order")]
    pub order: u8,
    pub prompt: String,
    pub options: BTreeMap<OptionKey, QuestionOption>,
}

fn default_order() -> u8 {
    1
}

impl Question {
    /// Look up an option
    pub fn option(&self, key: OptionKey) -> Option<&QuestionOption> {
        self.options.get(&key)
    }
}
