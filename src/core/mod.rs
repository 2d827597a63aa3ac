//! Core engines for sifquiz

pub mod verdict;
pub mod bank;
pub mod selector;
pub mod telemetry;
pub mod phase_b;
pub mod phase_c;
pub mod phase_d;
pub mod phase_e;
pub mod sif;
pub mod engine;
pub mod store;

pub use verdict::{compute_verdict, compute_face_purity, module_purity, a_line_verdict, verdict_for_decisions};
pub use bank::QuestionBank;
pub use selector::QuestionSelector;
pub use telemetry::{TelemetryEvent, TelemetrySink, TracingTelemetry, NullTelemetry, RecordingTelemetry};
pub use phase_b::{PhaseBEngine, DuelProgress, DuelRequest, DuelOutcome};
pub use phase_c::{PhaseCEngine, ModuleRequest, ModuleOutcome};
pub use phase_d::{PhaseDEngine, PhaseDResult, LineVerdict};
pub use phase_e::{PhaseEEngine, AnchorStatus, AnchorCandidate, CandidateOrigin};
pub use sif::{SifEngine, line_face, line_purity, face_candidates};
pub use engine::QuizEngine;
pub use store::{SessionStore, FileStore, MemoryStore, generate_session_id, is_valid_session_id, session_key, save_session, load_session};
