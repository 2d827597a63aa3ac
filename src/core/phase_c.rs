//! Phase C Engine: fixed CO1 → CO2 → CF decisions per non-A line
//!
//! After the third decision the verdict comes from the fixed table. An F
//! verdict closes the gate (`AwaitingSeverity`) until that line's severity
//! probe is answered; no other line may advance and the phase is not
//! complete while the gate is closed.

use crate::core::verdict::{module_purity, verdict_for_decisions};
use crate::types::{
    Decision, DecisionType, LineId, LineUpdate, ModLineState, ModState, PhaseCGate, PhaseCState,
    Pick, QuestionType, QuizError, QuizState, SeverityLevel, Verdict,
};

/// What the phase is waiting for next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleRequest {
    Decision { line: LineId, slot: DecisionType, question_type: QuestionType, order: u8 },
    Severity { line: LineId },
}

impl ModuleRequest {
    pub fn line(&self) -> LineId {
        match self {
            ModuleRequest::Decision { line, .. } | ModuleRequest::Severity { line } => *line,
        }
    }
}

/// What recording a decision or severity produced
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleOutcome {
    pub update: LineUpdate,
    pub slot: Option<DecisionType>,
    pub verdict: Option<Verdict>,
    pub severity_required: bool,
    pub purity: f64,
}

/// Question key for a decision slot
pub fn slot_key(slot: DecisionType) -> (QuestionType, u8) {
    match slot {
        DecisionType::CO1 => (QuestionType::CO, 1),
        DecisionType::CO2 => (QuestionType::CO, 2),
        DecisionType::CF => (QuestionType::CF, 1),
    }
}

/// Phase C state machine over the non-A lines
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseCEngine {
    lines: Vec<LineId>,
    gate: PhaseCGate,
}

impl PhaseCEngine {
    /// Engine over non-A lines in traversal order
    pub fn new(lines: Vec<LineId>) -> Self {
        Self { lines, gate: PhaseCGate::Idle }
    }

    /// Rebuild from a persisted gate
    pub fn with_gate(lines: Vec<LineId>, gate: PhaseCGate) -> Self {
        Self { lines, gate }
    }

    pub fn lines(&self) -> &[LineId] {
        &self.lines
    }

    pub fn gate(&self) -> PhaseCGate {
        self.gate
    }

    /// Line currently blocking the phase on a severity probe
    pub fn pending_severity(&self) -> Option<LineId> {
        match self.gate {
            PhaseCGate::AwaitingSeverity(line) => Some(line),
            _ => None,
        }
    }

    fn current_line(&self, state: &QuizState) -> Option<LineId> {
        self.lines
            .iter()
            .copied()
            .find(|l| state.line(*l).module.decisions.len() < 3)
    }

    /// Next expected input, or None when the phase is done
    pub fn current_request(&self, state: &QuizState) -> Option<ModuleRequest> {
        if let PhaseCGate::AwaitingSeverity(line) = self.gate {
            return Some(ModuleRequest::Severity { line });
        }
        let line = self.current_line(state)?;
        let slot = DecisionType::for_index(state.line(line).module.decisions.len())?;
        let (question_type, order) = slot_key(slot);
        Some(ModuleRequest::Decision { line, slot, question_type, order })
    }

    /// Record the next decision for `line`
    pub fn record_decision(
        &mut self,
        state: &QuizState,
        line: LineId,
        pick: Pick,
    ) -> Result<ModuleOutcome, QuizError> {
        if let PhaseCGate::AwaitingSeverity(pending) = self.gate {
            return Err(QuizError::SeverityPending(pending));
        }
        let current = self.current_line(state).ok_or_else(|| QuizError::OutOfSequence {
            line,
            detail: "phase C has no open line".to_string(),
        })?;
        if current != line {
            return Err(QuizError::OutOfSequence {
                line,
                detail: format!("current module line is {}", current),
            });
        }

        let mut module: ModState = state.line(line).module.clone();
        let slot = DecisionType::for_index(module.decisions.len()).ok_or_else(|| QuizError::OutOfSequence {
            line,
            detail: "all decisions recorded".to_string(),
        })?;
        module.decisions.push(Decision { decision_type: slot, pick });
        let purity = module_purity(&module.decisions);

        let mut verdict = None;
        let mut severity_required = false;
        if module.decisions.len() == 3 {
            let v = verdict_for_decisions(&module.decisions)?;
            verdict = Some(v);
            if v == Verdict::F {
                severity_required = true;
                self.gate = PhaseCGate::AwaitingSeverity(line);
                tracing::info!(line = %line, "fail verdict, severity probe required");
            }
        }

        tracing::debug!(line = %line, slot = ?slot, pick = %pick, purity, "module decision recorded");

        let update = LineUpdate {
            module: Some(module),
            verdict: verdict.map(Some),
            ..LineUpdate::default()
        };
        let outcome = ModuleOutcome { update, slot: Some(slot), verdict, severity_required, purity };
        if !severity_required {
            self.refresh_gate(state, line, &outcome.update);
        }
        Ok(outcome)
    }

    /// Record the severity probe for the line that closed the gate
    pub fn record_severity(
        &mut self,
        state: &QuizState,
        line: LineId,
        level: SeverityLevel,
    ) -> Result<ModuleOutcome, QuizError> {
        match self.gate {
            PhaseCGate::AwaitingSeverity(pending) if pending == line => {}
            PhaseCGate::AwaitingSeverity(pending) => return Err(QuizError::SeverityPending(pending)),
            _ => {
                return Err(QuizError::OutOfSequence {
                    line,
                    detail: "no severity probe is pending".to_string(),
                })
            }
        }

        let update = LineUpdate {
            f_severity: Some(level),
            f_severity_score: Some(level.score()),
            ..LineUpdate::default()
        };
        self.gate = PhaseCGate::Idle;
        self.refresh_gate(state, line, &update);

        tracing::debug!(line = %line, severity = %level, "severity recorded");

        Ok(ModuleOutcome {
            update,
            slot: None,
            verdict: Some(Verdict::F),
            severity_required: false,
            purity: module_purity(&state.line(line).module.decisions),
        })
    }

    /// Gate open and every non-A line complete
    pub fn is_complete(&self, state: &QuizState) -> bool {
        match self.gate {
            PhaseCGate::AwaitingSeverity(_) => false,
            PhaseCGate::Complete => true,
            PhaseCGate::Idle => self.lines.iter().all(|l| state.line(*l).is_complete()),
        }
    }

    /// Persistable view of phase C
    pub fn snapshot(&self, state: &QuizState) -> PhaseCState {
        PhaseCState {
            gate: self.gate,
            lines: self
                .lines
                .iter()
                .map(|l| {
                    let ls = state.line(*l);
                    (
                        *l,
                        ModLineState {
                            decisions: ls.module.decisions.clone(),
                            verdict: ls.verdict,
                            f_severity: ls.f_severity,
                            f_severity_score: ls.f_severity_score,
                        },
                    )
                })
                .collect(),
        }
    }

    // The pending update is not yet applied to `state`, so judge `line` from it
    fn refresh_gate(&mut self, state: &QuizState, line: LineId, update: &LineUpdate) {
        let all_done = self.lines.iter().all(|l| {
            if *l == line {
                update.applied_to(state.line(*l)).is_complete()
            } else {
                state.line(*l).is_complete()
            }
        });
        if all_done {
            self.gate = PhaseCGate::Complete;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
