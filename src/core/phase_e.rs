//! Phase E Engine: anchor (Primary) selection
//!
//! Candidates are the lines tied at the top purity across all seven lines.
//! A single candidate is committed without interaction. Otherwise the user
//! picks one from the tied candidates plus the self-installed faces found on
//! the SIF shortlist.
//!
//! Commit status: IDLE → PROCESSING → COMMITTED. A second commit is ignored.

use serde::{Deserialize, Serialize};

use crate::core::sif::{line_face, line_purity};
use crate::PURITY_EPSILON;
use crate::types::{Face, LineId, QuizError, QuizState};

/// One-shot commit flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorStatus {
    Idle,
    /// Held only inside `select`; never observable between calls
    Processing,
    Committed,
}

/// Why a face is offered as an anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateOrigin {
    /// Tied at the top purity
    Purity,
    /// On the SIF shortlist
    SelfInstalled,
}

/// An anchor option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorCandidate {
    pub line: LineId,
    pub face: Face,
    pub purity: f64,
    pub origin: CandidateOrigin,
}

/// Anchor detection and tie-break state
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseEEngine {
    purity_candidates: Vec<AnchorCandidate>,
    self_installed: Vec<AnchorCandidate>,
    status: AnchorStatus,
    anchor: Option<Face>,
    auto_committed: bool,
}

impl PhaseEEngine {
    /// Detect candidates from the state; commits immediately when unique
    pub fn new(state: &QuizState) -> Self {
        let scored: Vec<AnchorCandidate> = state
            .lines
            .iter()
            .filter_map(|ls| {
                Some(AnchorCandidate {
                    line: ls.line,
                    face: line_face(ls)?,
                    purity: line_purity(ls),
                    origin: CandidateOrigin::Purity,
                })
            })
            .collect();

        let top = scored.iter().map(|c| c.purity).fold(f64::NEG_INFINITY, f64::max);
        let (purity_candidates, rest): (Vec<_>, Vec<_>) = scored
            .into_iter()
            .partition(|c| (c.purity - top).abs() < PURITY_EPSILON);

        let self_installed = rest
            .into_iter()
            .filter(|c| state.sif_shortlist.contains(&c.face))
            .map(|c| AnchorCandidate { origin: CandidateOrigin::SelfInstalled, ..c })
            .collect();

        let mut engine = Self {
            purity_candidates,
            self_installed,
            status: AnchorStatus::Idle,
            anchor: None,
            auto_committed: false,
        };

        if let [only] = engine.purity_candidates.as_slice() {
            engine.anchor = Some(only.face);
            engine.status = AnchorStatus::Committed;
            engine.auto_committed = true;
            tracing::info!(anchor = %only.face, purity = only.purity, "anchor auto-committed");
        } else {
            tracing::info!(
                tied = engine.purity_candidates.len(),
                self_installed = engine.self_installed.len(),
                "anchor tie-break required"
            );
        }
        engine
    }

    /// Engine restored with an already committed anchor, which must be
    /// one of the options the state offers
    pub fn committed(state: &QuizState, anchor: Face) -> Result<Self, QuizError> {
        let mut engine = Self::new(state);
        if !engine.options().iter().any(|c| c.face == anchor) {
            return Err(QuizError::InvalidAnchorChoice(anchor));
        }
        engine.anchor = Some(anchor);
        engine.status = AnchorStatus::Committed;
        Ok(engine)
    }

    pub fn status(&self) -> AnchorStatus {
        self.status
    }

    pub fn anchor(&self) -> Option<Face> {
        self.anchor
    }

    pub fn auto_committed(&self) -> bool {
        self.auto_committed
    }

    pub fn purity_candidates(&self) -> &[AnchorCandidate] {
        &self.purity_candidates
    }

    /// The user must choose before the phase can end
    pub fn needs_tie_break(&self) -> bool {
        self.status != AnchorStatus::Committed
    }

    /// Tie-break options: tied candidates first, then self-installed ones
    pub fn options(&self) -> Vec<AnchorCandidate> {
        self.purity_candidates
            .iter()
            .chain(self.self_installed.iter())
            .cloned()
            .collect()
    }

    /// Commit the user's choice. Returns the committed anchor; repeated
    /// calls after a commit return the first anchor unchanged.
    pub fn select(&mut self, face: Face) -> Result<Face, QuizError> {
        if let (AnchorStatus::Committed, Some(anchor)) = (self.status, self.anchor) {
            tracing::debug!(ignored = %face, anchor = %anchor, "anchor already committed");
            return Ok(anchor);
        }
        if !self.options().iter().any(|c| c.face == face) {
            return Err(QuizError::InvalidAnchorChoice(face));
        }

        self.status = AnchorStatus::Processing;
        self.anchor = Some(face);
        self.status = AnchorStatus::Committed;
        tracing::info!(anchor = %face, "anchor committed");
        Ok(face)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::verdict::compute_face_purity;
    use crate::types::{Decision, DecisionType, Pick};

    fn face(s: &str) -> Face {
        s.parse().unwrap()
    }

    fn state_with(a: [(LineId, [Pick; 2]); 3], m: [(LineId, [Pick; 3]); 4]) -> QuizState {
        let mut state = QuizState::new();
        for (l, picks) in a {
            let ls = state.line_mut(l);
            ls.selected_a = true;
            ls.b.picks = picks.to_vec();
            ls.b.c_evidence = compute_face_purity(picks[0], picks[1]);
        }
        for (l, picks) in m {
            state.line_mut(l).module.decisions = DecisionType::SEQUENCE
                .iter()
                .zip(picks)
                .map(|(t, p)| Decision { decision_type: *t, pick: p })
                .collect();
        }
        state
    }

    fn low_modules() -> [(LineId, [Pick; 3]); 4] {
        [
            (LineId::Truth, [Pick::O, Pick::O, Pick::C]),
            (LineId::Recognition, [Pick::O, Pick::O, Pick::F]),
            (LineId::Bonding, [Pick::C, Pick::O, Pick::F]),
            (LineId::Stress, [Pick::O, Pick::C, Pick::F]),
        ]
    }

    #[test]
    fn test_unique_top_auto_commits() {
        let state = state_with(
            [(LineId::Control, [Pick::C, Pick::C]), (LineId::Pace, [Pick::O, Pick::F]), (LineId::Boundary, [Pick::C, Pick::O])],
            low_modules(),
        );
        let engine = PhaseEEngine::new(&state);
        assert_eq!(engine.anchor(), Some(face("Control:Sovereign")));
        assert!(engine.auto_committed());
        assert!(!engine.needs_tie_break());
    }

    #[test]
    fn test_tie_requires_selection() {
        let state = state_with(
            [(LineId::Control, [Pick::C, Pick::C]), (LineId::Pace, [Pick::C, Pick::C]), (LineId::Boundary, [Pick::C, Pick::O])],
            low_modules(),
        );
        let mut engine = PhaseEEngine::new(&state);
        assert!(engine.needs_tie_break());
        assert_eq!(engine.status(), AnchorStatus::Idle);
        assert_eq!(engine.purity_candidates().len(), 2);

        let err = engine.select(face("Truth:Sage")).unwrap_err();
        assert_eq!(err, QuizError::InvalidAnchorChoice(face("Truth:Sage")));

        assert_eq!(engine.select(face("Pace:Navigator")).unwrap(), face("Pace:Navigator"));
        assert_eq!(engine.status(), AnchorStatus::Committed);
    }

    #[test]
    fn test_double_submit_keeps_first() {
        let state = state_with(
            [(LineId::Control, [Pick::C, Pick::C]), (LineId::Pace, [Pick::C, Pick::C]), (LineId::Boundary, [Pick::C, Pick::O])],
            low_modules(),
        );
        let mut engine = PhaseEEngine::new(&state);
        engine.select(face("Control:Sovereign")).unwrap();
        assert_eq!(engine.select(face("Pace:Navigator")).unwrap(), face("Control:Sovereign"));
        assert_eq!(engine.anchor(), Some(face("Control:Sovereign")));
    }

    #[test]
    fn test_commit_goes_from_idle_to_committed() {
        let state = state_with(
            [(LineId::Control, [Pick::C, Pick::C]), (LineId::Pace, [Pick::C, Pick::C]), (LineId::Boundary, [Pick::C, Pick::O])],
            low_modules(),
        );
        let mut engine = PhaseEEngine::new(&state);
        assert_eq!(engine.status(), AnchorStatus::Idle);
        assert!(engine.select(face("Truth:Sage")).is_err());
        assert_eq!(engine.status(), AnchorStatus::Idle);
        engine.select(face("Pace:Navigator")).unwrap();
        assert_eq!(engine.status(), AnchorStatus::Committed);
    }

    #[test]
    fn test_restored_anchor_must_be_an_option() {
        let state = state_with(
            [(LineId::Control, [Pick::C, Pick::C]), (LineId::Pace, [Pick::C, Pick::C]), (LineId::Boundary, [Pick::C, Pick::O])],
            low_modules(),
        );
        let engine = PhaseEEngine::committed(&state, face("Pace:Navigator")).unwrap();
        assert_eq!(engine.anchor(), Some(face("Pace:Navigator")));
        assert!(!engine.needs_tie_break());

        let err = PhaseEEngine::committed(&state, face("Stress:Firebrand")).unwrap_err();
        assert_eq!(err, QuizError::InvalidAnchorChoice(face("Stress:Firebrand")));
    }

    #[test]
    fn test_self_installed_options_from_shortlist() {
        let mut state = state_with(
            [(LineId::Control, [Pick::C, Pick::C]), (LineId::Pace, [Pick::C, Pick::C]), (LineId::Boundary, [Pick::O, Pick::F])],
            low_modules(),
        );
        state.sif_shortlist = vec![face("Boundary:Wanderer"), face("Control:Sovereign")];
        let mut engine = PhaseEEngine::new(&state);

        let options = engine.options();
        assert_eq!(options.len(), 3);
        let wanderer = options.iter().find(|c| c.face == face("Boundary:Wanderer")).unwrap();
        assert_eq!(wanderer.origin, CandidateOrigin::SelfInstalled);

        assert_eq!(engine.select(face("Boundary:Wanderer")).unwrap(), face("Boundary:Wanderer"));
    }

    #[test]
    fn test_module_purity_can_win() {
        let state = state_with(
            [(LineId::Control, [Pick::C, Pick::O]), (LineId::Pace, [Pick::O, Pick::F]), (LineId::Boundary, [Pick::C, Pick::O])],
            [
                (LineId::Truth, [Pick::C, Pick::C, Pick::C]),
                (LineId::Recognition, [Pick::O, Pick::O, Pick::F]),
                (LineId::Bonding, [Pick::C, Pick::O, Pick::F]),
                (LineId::Stress, [Pick::O, Pick::C, Pick::F]),
            ],
        );
        // CCC module purity 3.6 beats every A-line
        let engine = PhaseEEngine::new(&state);
        assert_eq!(engine.anchor(), Some(face("Truth:Sage")));
    }
}
