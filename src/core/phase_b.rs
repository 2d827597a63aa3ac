//! Phase B Engine: two duel picks per A-line, one line at a time
//!
//! Per-line transitions:
//! - NoPick → Pick1Recorded: round 1 always asks (CO, 1)
//! - Pick1Recorded → Pick2Recorded: round 2 asks (CF, 1) if pick 1 was O, else (CO, 2)
//! - After pick 2 the face purity is fixed and the line is complete
//!
//! The next A-line opens only after the current one completes, since its
//! selection depends on the used-question set left by earlier lines.

use crate::core::verdict::{a_line_verdict, compute_face_purity};
use crate::FACE_PURITY_SEED;
use crate::types::{
    BState, LineId, LineUpdate, Pick, PhaseBState, QuestionType, QuizError, QuizState, Verdict,
};

/// Where a single A-line is in its duel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelProgress {
    NoPick,
    Pick1Recorded(Pick),
    Pick2Recorded,
}

impl DuelProgress {
    fn of(b: &BState) -> DuelProgress {
        match b.picks.as_slice() {
            [] => DuelProgress::NoPick,
            [first] => DuelProgress::Pick1Recorded(*first),
            _ => DuelProgress::Pick2Recorded,
        }
    }
}

/// The (type, order) a duel round asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuelRequest {
    pub line: LineId,
    pub round: u8,
    pub question_type: QuestionType,
    pub order: u8,
}

/// What recording a pick produced
#[derive(Debug, Clone, PartialEq)]
pub struct DuelOutcome {
    pub update: LineUpdate,
    pub line_complete: bool,
    pub purity: f64,
    pub verdict: Option<Verdict>,
}

/// Phase B state machine over the A-lines
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseBEngine {
    a_lines: Vec<LineId>,
}

impl PhaseBEngine {
    /// Engine over A-lines in traversal order
    pub fn new(a_lines: Vec<LineId>) -> Self {
        Self { a_lines }
    }

    pub fn a_lines(&self) -> &[LineId] {
        &self.a_lines
    }

    /// First A-line that still needs picks
    pub fn current_line(&self, state: &QuizState) -> Option<LineId> {
        self.a_lines
            .iter()
            .copied()
            .find(|l| state.line(*l).b.picks.len() < 2)
    }

    /// Progress of one A-line
    pub fn progress(&self, state: &QuizState, line: LineId) -> DuelProgress {
        DuelProgress::of(&state.line(line).b)
    }

    /// The question key the current line needs, or None when the phase is done
    pub fn current_request(&self, state: &QuizState) -> Option<DuelRequest> {
        let line = self.current_line(state)?;
        let request = match self.progress(state, line) {
            DuelProgress::NoPick => DuelRequest { line, round: 1, question_type: QuestionType::CO, order: 1 },
            DuelProgress::Pick1Recorded(Pick::O) => DuelRequest { line, round: 2, question_type: QuestionType::CF, order: 1 },
            DuelProgress::Pick1Recorded(_) => DuelRequest { line, round: 2, question_type: QuestionType::CO, order: 2 },
            DuelProgress::Pick2Recorded => return None,
        };
        Some(request)
    }

    /// Record a pick for `line`; it must be the current line
    pub fn record_pick(&self, state: &QuizState, line: LineId, pick: Pick) -> Result<DuelOutcome, QuizError> {
        let current = self.current_line(state).ok_or_else(|| QuizError::OutOfSequence {
            line,
            detail: "phase B is complete".to_string(),
        })?;
        if current != line {
            return Err(QuizError::OutOfSequence {
                line,
                detail: format!("current A-line is {}", current),
            });
        }

        let mut b = state.line(line).b.clone();
        if b.picks.is_empty() {
            b.c_evidence = FACE_PURITY_SEED;
        }
        b.picks.push(pick);
        b.c_evidence += pick.purity_value();

        let line_complete = b.picks.len() == 2;
        let (purity, verdict) = if line_complete {
            let purity = compute_face_purity(b.picks[0], b.picks[1]);
            b.c_evidence = purity;
            (purity, Some(a_line_verdict(&b.picks)))
        } else {
            (b.c_evidence, None)
        };

        tracing::debug!(line = %line, pick = %pick, purity, line_complete, "duel pick recorded");

        let update = LineUpdate {
            b: Some(b),
            verdict: verdict.map(Some),
            ..LineUpdate::default()
        };
        Ok(DuelOutcome { update, line_complete, purity, verdict })
    }

    /// Every A-line has both picks
    pub fn is_complete(&self, state: &QuizState) -> bool {
        self.current_line(state).is_none()
    }

    /// Persistable view of phase B
    pub fn snapshot(&self, state: &QuizState) -> PhaseBState {
        PhaseBState {
            a_lines: self.a_lines.clone(),
            lines: self.a_lines.iter().map(|l| (*l, state.line(*l).b.clone())).collect(),
            verdicts: self
                .a_lines
                .iter()
                .filter_map(|l| state.line(*l).verdict.map(|v| (*l, v)))
                .collect(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
