//! Core types for sifquiz

mod line;
mod face;
mod question;
mod counters;
mod state;
mod sif;
mod error;
mod reason;
mod output;
mod snapshot;

pub use line::{LineId, Pick, Verdict, DecisionType, Decision, SeverityLevel, BState, ModState, LineState, LineUpdate};
pub use face::{Archetype, Face};
pub use question::{BankPhase, QuestionType, OptionKey, Effects, QuestionOption, Question};
pub use counters::{SifCounters, increment};
pub use state::{QuizPhase, UsedQuestions, HistoryEntry, QuizState};
pub use sif::{
    FaceSource, FaceCandidate, AnchorCandidates, IlBreakdown, ScoredFace, InstallRanking,
    SecondarySource, SecondaryResolution, Badge, ScorerKind, LegacyScore, SifContext, SifResult,
};
pub use error::{QuizError, BankError, StoreError};
pub use reason::ReasonCode;
pub use output::StepOutput;
pub use snapshot::{PhaseCGate, PhaseBState, ModLineState, PhaseCState, SessionSnapshot};
