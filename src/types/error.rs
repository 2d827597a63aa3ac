//! Error types
//!
//! Only true contract violations are errors. Recoverable conditions (tie-break
//! needed, severity pending) are exposed as engine state instead.

use thiserror::Error;

use crate::types::{Face, LineId, QuestionType, QuizPhase};

/// Engine-level errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuizError {
    /// Decision triple outside the 8-entry verdict table
    #[error("invalid decision combination '{key}'")]
    InvalidDecisionCombination { key: String },

    /// Selector bucket empty or exhausted; never substituted
    #[error("question bank exhausted for {line} {question_type} order {order}: fix the bank or restart")]
    BankExhausted { line: LineId, question_type: QuestionType, order: u8 },

    #[error("missing severity question for line {0}")]
    MissingSeverityQuestion(LineId),

    #[error("phase A needs exactly 3 distinct lines, got {0:?}")]
    InvalidALineSelection(Vec<LineId>),

    #[error("line {line} is not expecting input: {detail}")]
    OutOfSequence { line: LineId, detail: String },

    #[error("line {0} is awaiting a severity selection")]
    SeverityPending(LineId),

    #[error("line {0} is incomplete")]
    IncompleteLine(LineId),

    #[error("line state invariant violated: {0}")]
    LineInvariant(String),

    #[error("cannot move from {from} to {to}: {reason}")]
    InvalidTransition { from: QuizPhase, to: QuizPhase, reason: String },

    #[error("operation requires phase {expected}, current phase is {actual}")]
    WrongPhase { expected: QuizPhase, actual: QuizPhase },

    #[error("option {option} of question {question_id} cannot be used here: {detail}")]
    InvalidOption { question_id: String, option: String, detail: String },

    #[error("no question is waiting for an answer")]
    NoActiveQuestion,

    #[error("{0} is not an anchor option")]
    InvalidAnchorChoice(Face),

    #[error("{0} is not on the install shortlist")]
    NotOnShortlist(Face),

    #[error("no anchor has been committed")]
    NoAnchor,

    #[error("no installed choice has been made")]
    NoInstalledChoice,

    #[error("no candidate face available for the secondary")]
    NoSecondaryCandidate,

    #[error("snapshot refers to unknown question '{0}'")]
    UnknownQuestion(String),
}

/// Load-time bank validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BankError {
    #[error("failed to parse bank: {0}")]
    Parse(String),

    #[error("failed to read bank: {0}")]
    Io(String),

    #[error("duplicate question id '{0}'")]
    DuplicateId(String),

    #[error("malformed question id '{0}'")]
    MalformedId(String),

    #[error("question '{0}' has no type")]
    MissingType(String),

    #[error("question '{0}' has fewer than two options")]
    TooFewOptions(String),

    #[error("question '{question_id}' option {option}: {detail}")]
    InvalidOption { question_id: String, option: String, detail: String },

    #[error("line {line} is missing {phase} question {question_type} order {order}")]
    MissingCombination { line: LineId, phase: String, question_type: QuestionType, order: u8 },

    #[error("line {0} has no severity question")]
    MissingSeverity(LineId),
}

/// Session store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("malformed session id '{0}'")]
    InvalidSessionId(String),
}
