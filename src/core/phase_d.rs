//! Phase D Engine: non-interactive verdict recomputation over all seven lines
//!
//! A-lines: F picks coerced to O, both C ⇒ C, else O.
//! Non-A lines: fixed table; a raw F with a recorded family severity is
//! kept at severity 1.0 and downgraded to O otherwise.
//!
//! The pass runs once; later calls return the cached result.

use serde::{Deserialize, Serialize};

use crate::core::verdict::{a_line_verdict, compute_face_purity, module_purity, verdict_for_decisions};
use crate::SEVERITY_HIGH_SCORE;
use crate::types::{LineId, QuizError, QuizState, Verdict};

/// Recomputed verdict for one line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineVerdict {
    pub line: LineId,
    pub selected_a: bool,
    /// Verdict from picks alone
    pub raw_verdict: Verdict,
    /// Verdict after the severity override
    pub verdict: Verdict,
    /// Face purity (A-lines) or module purity (non-A lines)
    pub purity: f64,
    /// Severity score consulted, if any
    pub severity: Option<f64>,
}

impl LineVerdict {
    pub fn overridden(&self) -> bool {
        self.raw_verdict != self.verdict
    }
}

/// Phase D output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseDResult {
    pub lines: Vec<LineVerdict>,
}

impl PhaseDResult {
    pub fn line(&self, line: LineId) -> Option<&LineVerdict> {
        self.lines.iter().find(|l| l.line == line)
    }
}

/// One-shot recomputation pass
#[derive(Debug, Clone, Default)]
pub struct PhaseDEngine {
    computed: bool,
    result: PhaseDResult,
}

impl PhaseDEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_computed(&self) -> bool {
        self.computed
    }

    /// Cached result, if the pass has run
    pub fn result(&self) -> Option<&PhaseDResult> {
        if self.computed {
            Some(&self.result)
        } else {
            None
        }
    }

    /// Run the pass once; repeated calls return the cached result untouched
    pub fn compute(&mut self, state: &QuizState) -> Result<&PhaseDResult, QuizError> {
        if self.computed {
            return Ok(&self.result);
        }

        let mut lines = Vec::with_capacity(state.lines.len());
        for ls in &state.lines {
            if !ls.picks_complete() {
                return Err(QuizError::IncompleteLine(ls.line));
            }
            let verdict = if ls.selected_a {
                let picks = &ls.b.picks;
                let v = a_line_verdict(picks);
                LineVerdict {
                    line: ls.line,
                    selected_a: true,
                    raw_verdict: v,
                    verdict: v,
                    purity: compute_face_purity(picks[0], picks[1]),
                    severity: None,
                }
            } else {
                let raw = verdict_for_decisions(&ls.module.decisions)?;
                let severity = state.sif_counters.sev_f(ls.line);
                let verdict = match (raw, severity) {
                    (Verdict::F, Some(s)) if (s - SEVERITY_HIGH_SCORE).abs() < f64::EPSILON => Verdict::F,
                    (Verdict::F, Some(_)) => Verdict::O,
                    (v, _) => v,
                };
                LineVerdict {
                    line: ls.line,
                    selected_a: false,
                    raw_verdict: raw,
                    verdict,
                    purity: module_purity(&ls.module.decisions),
                    severity,
                }
            };
            if verdict.overridden() {
                tracing::debug!(line = %ls.line, raw = %verdict.raw_verdict, final_verdict = %verdict.verdict, "severity override");
            }
            lines.push(verdict);
        }

        self.result = PhaseDResult { lines };
        self.computed = true;
        tracing::info!(lines = self.result.lines.len(), "phase D verdicts recomputed");
        Ok(&self.result)
    }

    /// Forget the cached pass (full restart only)
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{increment, Decision, DecisionType, Pick};

    fn filled_state(module_picks: [Pick; 3]) -> QuizState {
        let mut state = QuizState::new();
        for l in [LineId::Control, LineId::Pace, LineId::Boundary] {
            let ls = state.line_mut(l);
            ls.selected_a = true;
            ls.b.picks = vec![Pick::C, Pick::C];
        }
        for l in [LineId::Truth, LineId::Recognition, LineId::Bonding, LineId::Stress] {
            state.line_mut(l).module.decisions = DecisionType::SEQUENCE
                .iter()
                .zip(module_picks)
                .map(|(t, p)| Decision { decision_type: *t, pick: p })
                .collect();
        }
        state
    }

    #[test]
    fn test_a_lines_recomputed() {
        let mut state = filled_state([Pick::C, Pick::C, Pick::C]);
        state.line_mut(LineId::Pace).b.picks = vec![Pick::O, Pick::F];
        let mut engine = PhaseDEngine::new();
        let result = engine.compute(&state).unwrap();
        let control = result.line(LineId::Control).unwrap();
        assert_eq!(control.verdict, Verdict::C);
        assert!((control.purity - 2.6).abs() < 1e-9);
        let pace = result.line(LineId::Pace).unwrap();
        assert_eq!(pace.verdict, Verdict::O);
        assert!((pace.purity - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_severity_override() {
        let mut state = filled_state([Pick::C, Pick::O, Pick::F]);
        increment(&mut state.sif_counters.sev_f, LineId::Truth, 1.0);
        increment(&mut state.sif_counters.sev_f, LineId::Recognition, 0.5);
        increment(&mut state.sif_counters.sev_f, LineId::Bonding, 0.0);

        let mut engine = PhaseDEngine::new();
        let result = engine.compute(&state).unwrap();
        assert_eq!(result.line(LineId::Truth).unwrap().verdict, Verdict::F);
        assert_eq!(result.line(LineId::Recognition).unwrap().verdict, Verdict::O);
        assert_eq!(result.line(LineId::Bonding).unwrap().verdict, Verdict::O);
        assert!(result.line(LineId::Bonding).unwrap().overridden());
        // no severity recorded: raw F stands
        assert_eq!(result.line(LineId::Stress).unwrap().verdict, Verdict::F);
    }

    #[test]
    fn test_second_call_returns_cache() {
        let state = filled_state([Pick::C, Pick::C, Pick::C]);
        let mut engine = PhaseDEngine::new();
        let first = engine.compute(&state).unwrap().clone();

        // a changed state is ignored once computed
        let changed = filled_state([Pick::O, Pick::O, Pick::F]);
        let second = engine.compute(&changed).unwrap();
        assert_eq!(&first, second);
        assert!(engine.is_computed());
    }

    #[test]
    fn test_incomplete_line_is_an_error() {
        let mut state = filled_state([Pick::C, Pick::C, Pick::C]);
        state.line_mut(LineId::Stress).module.decisions.pop();
        let mut engine = PhaseDEngine::new();
        assert_eq!(engine.compute(&state).unwrap_err(), QuizError::IncompleteLine(LineId::Stress));
        assert!(!engine.is_computed());
    }
}
