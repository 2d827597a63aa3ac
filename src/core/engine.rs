//! Quiz Engine: owns the quiz state and drives every phase engine
//!
//! Phase flow:
//! - A: three A-lines chosen
//! - B: duel picks per A-line (PhaseBEngine)
//! - C: module decisions per non-A line, severity gate (PhaseCEngine)
//! - D: verdict recomputation, written back into the lines (PhaseDEngine)
//! - E: IL shortlist built, anchor detected or tie-broken (SifEngine, PhaseEEngine)
//! - Archetype: installed face chosen from the shortlist
//! - Summary: Primary / Secondary / Prize and badge
//!
//! Transitions move forward one step at a time and only once the current
//! phase is complete.

use std::collections::BTreeSet;
use std::rc::Rc;

use chrono::Utc;

use crate::core::bank::QuestionBank;
use crate::core::phase_b::PhaseBEngine;
use crate::core::phase_c::{ModuleRequest, PhaseCEngine};
use crate::core::phase_d::{PhaseDEngine, PhaseDResult};
use crate::core::phase_e::{AnchorCandidate, PhaseEEngine};
use crate::core::selector::QuestionSelector;
use crate::core::sif::SifEngine;
use crate::core::store::generate_session_id;
use crate::core::telemetry::{TelemetryEvent, TelemetrySink, TracingTelemetry};
use crate::types::{
    Face, HistoryEntry, InstallRanking, LineId, LineUpdate, ModState, OptionKey, Question,
    QuizError, QuizPhase, QuizState, ReasonCode, SessionSnapshot, SifResult, StepOutput,
};

/// The question currently shown and awaiting an answer
#[derive(Debug, Clone, PartialEq)]
struct PendingQuestion {
    question: Question,
    line: LineId,
    severity: bool,
}

/// Orchestrator over the whole quiz
#[derive(Debug)]
pub struct QuizEngine {
    bank: QuestionBank,
    selector: QuestionSelector,
    telemetry: Rc<dyn TelemetrySink>,
    sif: SifEngine,
    state: QuizState,
    session_id: String,
    /// A-lines in the order they were chosen (phase B traversal order)
    a_line_order: Vec<LineId>,
    phase_b: Option<PhaseBEngine>,
    phase_c: Option<PhaseCEngine>,
    phase_d: PhaseDEngine,
    phase_e: Option<PhaseEEngine>,
    ranking: Option<InstallRanking>,
    pending: Option<PendingQuestion>,
}

fn invalid_option(question: &Question, choice: OptionKey, detail: &str) -> QuizError {
    QuizError::InvalidOption {
        question_id: question.id.clone(),
        option: choice.to_string(),
        detail: detail.to_string(),
    }
}

impl QuizEngine {
    /// New session over a validated bank
    pub fn new(bank: QuestionBank, telemetry: Rc<dyn TelemetrySink>) -> Self {
        let selector = QuestionSelector::new(&bank, telemetry.clone());
        Self {
            bank,
            selector,
            telemetry,
            sif: SifEngine::new(),
            state: QuizState::new(),
            session_id: generate_session_id(Utc::now()),
            a_line_order: Vec::new(),
            phase_b: None,
            phase_c: None,
            phase_d: PhaseDEngine::new(),
            phase_e: None,
            ranking: None,
            pending: None,
        }
    }

    /// New session with events forwarded to `tracing`
    pub fn with_tracing(bank: QuestionBank) -> Self {
        Self::new(bank, Rc::new(TracingTelemetry))
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn state(&self) -> &QuizState {
        &self.state
    }

    pub fn phase(&self) -> QuizPhase {
        self.state.phase
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    /// Full IL ranking, available from phase E
    pub fn ranking(&self) -> Option<&InstallRanking> {
        self.ranking.as_ref()
    }

    /// Phase D output, once computed
    pub fn phase_d_result(&self) -> Option<&PhaseDResult> {
        self.phase_d.result()
    }

    /// Phase E requires a user choice
    pub fn needs_tie_break(&self) -> bool {
        self.phase_e.as_ref().map(|e| e.needs_tie_break()).unwrap_or(false)
    }

    /// Anchor options offered for the tie-break
    pub fn anchor_options(&self) -> Vec<AnchorCandidate> {
        self.phase_e.as_ref().map(|e| e.options()).unwrap_or_default()
    }

    /// Line blocking phase C on a severity probe
    pub fn pending_severity(&self) -> Option<LineId> {
        self.phase_c.as_ref().and_then(|c| c.pending_severity())
    }

    /// Whether the current phase has everything it needs to move on
    pub fn phase_complete(&self) -> bool {
        self.incomplete_reason().is_none()
    }

    fn incomplete_reason(&self) -> Option<String> {
        match self.state.phase {
            QuizPhase::A if self.a_line_order.len() != 3 => {
                Some("exactly three A-lines must be selected".to_string())
            }
            QuizPhase::B if !self.phase_b.as_ref().map(|b| b.is_complete(&self.state)).unwrap_or(false) => {
                Some("A-line duels are unanswered".to_string())
            }
            QuizPhase::C => match &self.phase_c {
                Some(c) if c.is_complete(&self.state) => None,
                Some(c) => match c.pending_severity() {
                    Some(line) => Some(format!("line {} awaits a severity selection", line)),
                    None => Some("module lines are unanswered".to_string()),
                },
                None => Some("phase C has not started".to_string()),
            },
            QuizPhase::D if !self.phase_d.is_computed() => Some("verdicts have not been recomputed".to_string()),
            QuizPhase::E if self.state.anchor.is_none() => Some("no anchor has been committed".to_string()),
            QuizPhase::Archetype
                if self.state.installed_choice.is_none() && !self.state.sif_shortlist.is_empty() =>
            {
                Some("no installed face has been chosen".to_string())
            }
            QuizPhase::Summary => Some("the quiz is finished".to_string()),
            _ => None,
        }
    }

    fn require_phase(&self, expected: QuizPhase) -> Result<(), QuizError> {
        if self.state.phase != expected {
            return Err(QuizError::WrongPhase { expected, actual: self.state.phase });
        }
        Ok(())
    }

    // =========================================================================
    // STATE UPDATES
    // =========================================================================

    /// Apply a partial update to one line, rejecting invalid records
    pub fn update_line(&mut self, line: LineId, update: LineUpdate) -> Result<(), QuizError> {
        let next = update.applied_to(self.state.line(line));
        next.check_invariant().map_err(QuizError::LineInvariant)?;
        *self.state.line_mut(line) = next;
        Ok(())
    }

    /// Commit the three A-lines (phase A only); order sets the duel order
    pub fn select_a_lines(&mut self, lines: &[LineId]) -> Result<ReasonCode, QuizError> {
        self.require_phase(QuizPhase::A)?;
        let distinct: BTreeSet<LineId> = lines.iter().copied().collect();
        if lines.len() != 3 || distinct.len() != 3 {
            return Err(QuizError::InvalidALineSelection(lines.to_vec()));
        }
        for line in LineId::ALL {
            let update = LineUpdate { selected_a: Some(lines.contains(&line)), ..LineUpdate::default() };
            self.update_line(line, update)?;
        }
        self.a_line_order = lines.to_vec();
        tracing::info!(a_lines = ?lines, "A-lines selected");
        Ok(ReasonCode::Q100_A_LINES_SELECTED)
    }

    /// Move to `to`, which must be the next phase, running its entry work
    pub fn update_phase(&mut self, to: QuizPhase) -> Result<ReasonCode, QuizError> {
        let from = self.state.phase;
        if from.next() != Some(to) {
            return Err(QuizError::InvalidTransition {
                from,
                to,
                reason: "phases advance one step at a time".to_string(),
            });
        }
        if let Some(reason) = self.incomplete_reason() {
            return Err(QuizError::InvalidTransition { from, to, reason });
        }

        let reason = self.enter(to)?;
        self.state.phase = to;
        self.pending = None;
        self.telemetry.emit(&TelemetryEvent::PhaseChanged { from, to });
        tracing::info!(from = %from, to = %to, reason = %reason.code(), "phase changed");
        Ok(reason)
    }

    /// Move to the next phase
    pub fn advance(&mut self) -> Result<ReasonCode, QuizError> {
        let from = self.state.phase;
        let to = from.next().ok_or_else(|| QuizError::InvalidTransition {
            from,
            to: from,
            reason: "the quiz is finished".to_string(),
        })?;
        self.update_phase(to)
    }

    fn enter(&mut self, to: QuizPhase) -> Result<ReasonCode, QuizError> {
        let reason = match to {
            QuizPhase::B => {
                self.phase_b = Some(PhaseBEngine::new(self.a_line_order.clone()));
                ReasonCode::Q001_PHASE_ENTERED
            }
            QuizPhase::C => {
                self.phase_c = Some(PhaseCEngine::new(self.state.non_a_lines()));
                ReasonCode::Q001_PHASE_ENTERED
            }
            QuizPhase::D => {
                self.run_phase_d()?;
                ReasonCode::Q400_VERDICTS_RECOMPUTED
            }
            QuizPhase::E => self.run_phase_e(None)?,
            QuizPhase::Summary => {
                self.calculate_sif()?;
                ReasonCode::Q501_SIF_FINALIZED
            }
            QuizPhase::A | QuizPhase::Archetype => ReasonCode::Q001_PHASE_ENTERED,
        };
        Ok(reason)
    }

    fn run_phase_d(&mut self) -> Result<(), QuizError> {
        let result = self.phase_d.compute(&self.state)?.clone();
        for lv in &result.lines {
            let update = LineUpdate { verdict: Some(Some(lv.verdict)), ..LineUpdate::default() };
            self.update_line(lv.line, update)?;
        }
        Ok(())
    }

    fn run_phase_e(&mut self, restored_anchor: Option<Face>) -> Result<ReasonCode, QuizError> {
        let ranking = self.sif.ranking_for_state(&self.state);
        self.state.sif_shortlist = ranking.shortlist_faces();
        self.ranking = Some(ranking);

        let engine = match restored_anchor {
            Some(anchor) => PhaseEEngine::committed(&self.state, anchor)?,
            None => PhaseEEngine::new(&self.state),
        };
        let reason = match engine.anchor() {
            Some(anchor) => {
                self.state.anchor = Some(anchor);
                if restored_anchor.is_none() {
                    self.telemetry.emit(&TelemetryEvent::AnchorCommitted { anchor, auto: true });
                }
                ReasonCode::Q401_ANCHOR_AUTO_COMMITTED
            }
            None => ReasonCode::Q402_TIE_BREAK_REQUIRED,
        };
        self.phase_e = Some(engine);
        Ok(reason)
    }

    // =========================================================================
    // QUESTIONS AND ANSWERS
    // =========================================================================

    /// The question the current phase expects, or None when it needs none.
    /// Repeated calls return the same question until it is answered.
    pub fn next_question(&mut self) -> Result<Option<Question>, QuizError> {
        if let Some(pending) = &self.pending {
            return Ok(Some(pending.question.clone()));
        }
        let pending = match self.state.phase {
            QuizPhase::B => self.next_duel_question()?,
            QuizPhase::C => self.next_module_question()?,
            _ => None,
        };
        let question = pending.as_ref().map(|p| p.question.clone());
        self.pending = pending;
        Ok(question)
    }

    fn next_duel_question(&self) -> Result<Option<PendingQuestion>, QuizError> {
        let Some(request) = self.phase_b.as_ref().and_then(|b| b.current_request(&self.state)) else {
            return Ok(None);
        };
        let question = self
            .selector
            .select_duel_question(&self.state.used_questions, request.line, request.question_type, request.order)
            .ok_or(QuizError::BankExhausted {
                line: request.line,
                question_type: request.question_type,
                order: request.order,
            })?;
        Ok(Some(PendingQuestion { question: question.clone(), line: request.line, severity: false }))
    }

    fn next_module_question(&self) -> Result<Option<PendingQuestion>, QuizError> {
        let Some(request) = self.phase_c.as_ref().and_then(|c| c.current_request(&self.state)) else {
            return Ok(None);
        };
        let pending = match request {
            ModuleRequest::Decision { line, question_type, order, .. } => {
                let question = self
                    .selector
                    .select_module_question(&self.state.used_questions, line, question_type, order)
                    .ok_or(QuizError::BankExhausted { line, question_type, order })?;
                PendingQuestion { question: question.clone(), line, severity: false }
            }
            ModuleRequest::Severity { line } => {
                let question = self
                    .selector
                    .select_severity_question(line)
                    .ok_or(QuizError::MissingSeverityQuestion(line))?;
                PendingQuestion { question: question.clone(), line, severity: true }
            }
        };
        Ok(Some(pending))
    }

    /// Answer the pending question
    pub fn answer(&mut self, choice: OptionKey) -> Result<StepOutput, QuizError> {
        let pending = self.pending.clone().ok_or(QuizError::NoActiveQuestion)?;
        let question = &pending.question;
        let line = pending.line;
        let option = question
            .option(choice)
            .ok_or_else(|| invalid_option(question, choice, "option does not exist"))?;
        let phase = self.state.phase;
        let mut output = StepOutput::new(phase, line, &question.id, ReasonCode::Q200_PICK_RECORDED);

        let update = match (phase, pending.severity) {
            (QuizPhase::B, _) => {
                let pick = option.pick.ok_or_else(|| invalid_option(question, choice, "option carries no pick"))?;
                let engine = self.phase_b.as_ref().ok_or(QuizError::NoActiveQuestion)?;
                let outcome = engine.record_pick(&self.state, line, pick)?;
                output.pick = Some(pick);
                output.purity = Some(outcome.purity);
                output.verdict = outcome.verdict;
                if outcome.line_complete {
                    output.reason = ReasonCode::Q201_A_LINE_COMPLETE;
                }
                outcome.update
            }
            (QuizPhase::C, false) => {
                let pick = option.pick.ok_or_else(|| invalid_option(question, choice, "option carries no pick"))?;
                let engine = self.phase_c.as_mut().ok_or(QuizError::NoActiveQuestion)?;
                let outcome = engine.record_decision(&self.state, line, pick)?;
                output.pick = Some(pick);
                output.purity = Some(outcome.purity);
                output.verdict = outcome.verdict;
                output.reason = if outcome.severity_required {
                    self.telemetry.emit(&TelemetryEvent::SeverityRequired { line });
                    ReasonCode::Q302_SEVERITY_REQUIRED
                } else if outcome.verdict.is_some() {
                    ReasonCode::Q301_VERDICT_COMPUTED
                } else {
                    ReasonCode::Q300_DECISION_RECORDED
                };
                outcome.update
            }
            (QuizPhase::C, true) => {
                let level = option
                    .severity
                    .ok_or_else(|| invalid_option(question, choice, "option carries no severity"))?;
                let engine = self.phase_c.as_mut().ok_or(QuizError::NoActiveQuestion)?;
                let outcome = engine.record_severity(&self.state, line, level)?;
                output.severity = Some(level);
                output.purity = Some(outcome.purity);
                output.verdict = outcome.verdict;
                output.reason = ReasonCode::Q303_SEVERITY_RECORDED;
                outcome.update
            }
            _ => return Err(QuizError::NoActiveQuestion),
        };

        self.update_line(line, update)?;
        self.sif
            .record_answer_with_effects(&mut self.state.sif_counters, question, choice, line)?;
        self.selector.mark_used(&mut self.state.used_questions, &question.id);
        self.state.question_history.push(HistoryEntry {
            question_id: question.id.clone(),
            phase: question.phase,
            line,
            choice,
            pick: output.pick,
            severity: output.severity,
            answered_at: output.timestamp,
        });
        self.telemetry.emit(&TelemetryEvent::AnswerRecorded {
            question_id: question.id.clone(),
            line,
            choice,
        });
        self.pending = None;
        output.phase_complete = self.phase_complete();
        Ok(output)
    }

    /// Apply an option's effects to the counters directly. The answer is
    /// logged in the history so a resumed session replays it.
    pub fn record_answer_with_effects(
        &mut self,
        question: &Question,
        choice: OptionKey,
        family: LineId,
    ) -> Result<(), QuizError> {
        let question = self
            .bank
            .question(&question.id)
            .ok_or_else(|| QuizError::UnknownQuestion(question.id.clone()))?;
        let option = question
            .option(choice)
            .ok_or_else(|| invalid_option(question, choice, "option does not exist"))?;
        let entry = HistoryEntry {
            question_id: question.id.clone(),
            phase: question.phase,
            line: family,
            choice,
            pick: option.pick,
            severity: option.severity,
            answered_at: Utc::now(),
        };
        self.sif
            .record_answer_with_effects(&mut self.state.sif_counters, question, choice, family)?;
        self.state.question_history.push(entry);
        Ok(())
    }

    // =========================================================================
    // ANCHOR AND SIF
    // =========================================================================

    /// Commit the anchor from the tie-break options (phase E)
    pub fn set_anchor(&mut self, face: Face) -> Result<ReasonCode, QuizError> {
        self.require_phase(QuizPhase::E)?;
        let engine = self.phase_e.as_mut().ok_or(QuizError::NoAnchor)?;
        let anchor = engine.select(face)?;
        if self.state.anchor != Some(anchor) {
            self.state.anchor = Some(anchor);
            self.telemetry.emit(&TelemetryEvent::AnchorCommitted { anchor, auto: false });
        }
        Ok(ReasonCode::Q403_ANCHOR_COMMITTED)
    }

    /// Record the installed face chosen from the shortlist (archetype phase)
    pub fn choose_installed(&mut self, face: Face) -> Result<ReasonCode, QuizError> {
        self.require_phase(QuizPhase::Archetype)?;
        let anchor = self.state.anchor.ok_or(QuizError::NoAnchor)?;
        if !self.state.sif_shortlist.contains(&face) {
            return Err(QuizError::NotOnShortlist(face));
        }
        self.state.installed_choice = Some(face);
        self.state.final_archetype = Some(anchor.archetype().name().to_string());
        tracing::info!(installed = %face, "installed face chosen");
        Ok(ReasonCode::Q500_INSTALLED_CHOSEN)
    }

    /// Installed-Likelihood result when an installed choice and a shortlist
    /// exist, the legacy scorer otherwise
    pub fn calculate_sif(&mut self) -> Result<SifResult, QuizError> {
        let anchor = self.state.anchor.ok_or(QuizError::NoAnchor)?;
        let result = if self.state.installed_choice.is_some() && !self.state.sif_shortlist.is_empty() {
            self.sif.finalize_sif_with_install(&self.state, anchor)?
        } else {
            self.sif.calculate_sif(&self.state, anchor)?
        };
        self.store_result(result)
    }

    /// Finalise from the installed choice
    pub fn finalize_sif_with_install(&mut self) -> Result<SifResult, QuizError> {
        let anchor = self.state.anchor.ok_or(QuizError::NoAnchor)?;
        let result = self.sif.finalize_sif_with_install(&self.state, anchor)?;
        self.store_result(result)
    }

    fn store_result(&mut self, result: SifResult) -> Result<SifResult, QuizError> {
        self.telemetry.emit(&TelemetryEvent::SifFinalized {
            primary: result.primary,
            secondary: result.secondary,
            prize: result.prize,
            badge: result.badge,
        });
        self.state.sif_result = Some(result.clone());
        Ok(result)
    }

    // =========================================================================
    // RESET AND PERSISTENCE
    // =========================================================================

    /// Discard everything and start a fresh session
    pub fn reset_quiz(&mut self) {
        self.state = QuizState::new();
        self.session_id = generate_session_id(Utc::now());
        self.a_line_order.clear();
        self.phase_b = None;
        self.phase_c = None;
        self.phase_d.reset();
        self.phase_e = None;
        self.ranking = None;
        self.pending = None;
        tracing::info!(session = %self.session_id, "quiz reset");
    }

    /// Persistable view of the session
    pub fn snapshot(&self) -> SessionSnapshot {
        let phase_b = self.phase_b.clone().or_else(|| {
            (!self.a_line_order.is_empty()).then(|| PhaseBEngine::new(self.a_line_order.clone()))
        });
        SessionSnapshot {
            session_id: self.session_id.clone(),
            phase: self.state.phase,
            used_questions: self.state.used_questions.clone(),
            question_history: self.state.question_history.clone(),
            phase_b_state: phase_b.map(|b| b.snapshot(&self.state)),
            phase_c_state: self.phase_c.as_ref().map(|c| c.snapshot(&self.state)),
            last_updated: Utc::now(),
            anchor: self.state.anchor,
            installed_choice: self.state.installed_choice,
        }
    }

    /// Rebuild a session from a snapshot. Counters are replayed from the
    /// history and later-phase derivations are recomputed.
    pub fn resume(
        bank: QuestionBank,
        snapshot: &SessionSnapshot,
        telemetry: Rc<dyn TelemetrySink>,
    ) -> Result<Self, QuizError> {
        let mut engine = Self::new(bank, telemetry);
        engine.session_id = snapshot.session_id.clone();

        if let Some(b) = &snapshot.phase_b_state {
            for line in LineId::ALL {
                let update = LineUpdate { selected_a: Some(b.a_lines.contains(&line)), ..LineUpdate::default() };
                engine.update_line(line, update)?;
            }
            for (line, b_state) in &b.lines {
                let update = LineUpdate {
                    b: Some(b_state.clone()),
                    verdict: b.verdicts.get(line).map(|v| Some(*v)),
                    ..LineUpdate::default()
                };
                engine.update_line(*line, update)?;
            }
            engine.a_line_order = b.a_lines.clone();
        }

        if let Some(c) = &snapshot.phase_c_state {
            for (line, m) in &c.lines {
                let update = LineUpdate {
                    module: Some(ModState { decisions: m.decisions.clone() }),
                    verdict: m.verdict.map(Some),
                    f_severity: m.f_severity,
                    f_severity_score: m.f_severity_score,
                    ..LineUpdate::default()
                };
                engine.update_line(*line, update)?;
            }
            engine.phase_c = Some(PhaseCEngine::with_gate(engine.state.non_a_lines(), c.gate));
        }

        engine.state.used_questions = snapshot.used_questions.clone();
        engine.state.question_history = snapshot.question_history.clone();
        for entry in &snapshot.question_history {
            let question = engine
                .bank
                .question(&entry.question_id)
                .ok_or_else(|| QuizError::UnknownQuestion(entry.question_id.clone()))?;
            engine
                .sif
                .record_answer_with_effects(&mut engine.state.sif_counters, question, entry.choice, entry.line)?;
        }

        let target = snapshot.phase;
        if target >= QuizPhase::B {
            engine.phase_b = Some(PhaseBEngine::new(engine.a_line_order.clone()));
        }
        if target >= QuizPhase::C && engine.phase_c.is_none() {
            engine.phase_c = Some(PhaseCEngine::new(engine.state.non_a_lines()));
        }
        if target >= QuizPhase::D {
            engine.run_phase_d()?;
        }
        if target >= QuizPhase::E {
            engine.run_phase_e(snapshot.anchor)?;
        }
        engine.state.phase = target;
        if target >= QuizPhase::Archetype {
            if let (Some(face), Some(anchor)) = (snapshot.installed_choice, engine.state.anchor) {
                engine.state.installed_choice = Some(face);
                engine.state.final_archetype = Some(anchor.archetype().name().to_string());
            }
        }
        if target == QuizPhase::Summary {
            engine.calculate_sif()?;
        }

        tracing::info!(
            session = %engine.session_id,
            phase = %target,
            answers = snapshot.question_history.len(),
            "session resumed"
        );
        Ok(engine)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bank::tests::minimal_bank;
    use crate::core::telemetry::{NullTelemetry, RecordingTelemetry};
    use crate::types::{Archetype, SecondarySource, Verdict};

    fn engine() -> QuizEngine {
        QuizEngine::new(minimal_bank(), Rc::new(NullTelemetry))
    }

    fn answer_phase(engine: &mut QuizEngine, choose: impl Fn(&Question) -> OptionKey) {
        while let Some(q) = engine.next_question().unwrap() {
            engine.answer(choose(&q)).unwrap();
        }
    }

    #[test]
    fn test_transition_guards() {
        let mut e = engine();
        assert!(matches!(e.advance(), Err(QuizError::InvalidTransition { .. })));
        assert!(matches!(e.update_phase(QuizPhase::C), Err(QuizError::InvalidTransition { .. })));

        e.select_a_lines(&[LineId::Control, LineId::Pace, LineId::Boundary]).unwrap();
        assert_eq!(e.advance().unwrap(), ReasonCode::Q001_PHASE_ENTERED);
        assert_eq!(e.phase(), QuizPhase::B);
        // B not answered yet
        assert!(matches!(e.advance(), Err(QuizError::InvalidTransition { .. })));
    }

    #[test]
    fn test_a_line_selection_rules() {
        let mut e = engine();
        let dup = [LineId::Control, LineId::Control, LineId::Pace];
        assert_eq!(
            e.select_a_lines(&dup).unwrap_err(),
            QuizError::InvalidALineSelection(dup.to_vec())
        );
        assert!(e.select_a_lines(&[LineId::Control, LineId::Pace]).is_err());

        e.select_a_lines(&[LineId::Truth, LineId::Pace, LineId::Stress]).unwrap();
        e.select_a_lines(&[LineId::Control, LineId::Pace, LineId::Boundary]).unwrap();
        assert_eq!(e.state().a_lines(), vec![LineId::Control, LineId::Pace, LineId::Boundary]);

        e.advance().unwrap();
        assert!(matches!(
            e.select_a_lines(&[LineId::Control, LineId::Pace, LineId::Boundary]),
            Err(QuizError::WrongPhase { .. })
        ));
    }

    #[test]
    fn test_answer_without_question() {
        let mut e = engine();
        assert_eq!(e.answer(OptionKey::A).unwrap_err(), QuizError::NoActiveQuestion);
    }

    #[test]
    fn test_next_question_is_stable_until_answered() {
        let mut e = engine();
        e.select_a_lines(&[LineId::Control, LineId::Pace, LineId::Boundary]).unwrap();
        e.advance().unwrap();
        let first = e.next_question().unwrap().unwrap();
        let again = e.next_question().unwrap().unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(first.id, "B-Control-CO-1");
    }

    #[test]
    fn test_exhausted_bucket_is_a_hard_error() {
        let mut e = engine();
        e.select_a_lines(&[LineId::Control, LineId::Pace, LineId::Boundary]).unwrap();
        e.advance().unwrap();
        e.state.used_questions.mark_used("B-Control-CO-1");
        let err = e.next_question().unwrap_err();
        assert_eq!(
            err,
            QuizError::BankExhausted { line: LineId::Control, question_type: crate::types::QuestionType::CO, order: 1 }
        );
    }

    #[test]
    fn test_duel_records_history_and_counters() {
        let mut e = engine();
        e.select_a_lines(&[LineId::Control, LineId::Pace, LineId::Boundary]).unwrap();
        e.advance().unwrap();
        e.next_question().unwrap();
        let out = e.answer(OptionKey::B).unwrap();
        assert_eq!(out.reason, ReasonCode::Q200_PICK_RECORDED);
        assert_eq!(e.state().question_history.len(), 1);
        assert!(e.state().used_questions.contains("B-Control-CO-1"));
        assert!(e.state().sif_counters.fam_o(LineId::Control) > 0.0);

        // pick O: round two asks CF
        let q = e.next_question().unwrap().unwrap();
        assert_eq!(q.id, "B-Control-CF-1");
    }

    #[test]
    fn test_severity_gate_blocks_phase_c() {
        let mut e = engine();
        e.select_a_lines(&[LineId::Control, LineId::Pace, LineId::Boundary]).unwrap();
        e.advance().unwrap();
        answer_phase(&mut e, |_| OptionKey::A);
        e.advance().unwrap();

        // Truth: C, O, F
        for choice in [OptionKey::A, OptionKey::B, OptionKey::B] {
            e.next_question().unwrap();
            e.answer(choice).unwrap();
        }
        assert_eq!(e.state().line(LineId::Truth).verdict, Some(Verdict::F));
        assert_eq!(e.pending_severity(), Some(LineId::Truth));
        let q = e.next_question().unwrap().unwrap();
        assert_eq!(q.id, "SEV-Truth");

        let out = e.answer(OptionKey::B).unwrap();
        assert_eq!(out.reason, ReasonCode::Q303_SEVERITY_RECORDED);
        assert_eq!(e.state().sif_counters.sev_f(LineId::Truth), Some(0.5));
        assert_eq!(e.pending_severity(), None);
    }

    #[test]
    fn test_full_flow_all_clean() {
        let sink = Rc::new(RecordingTelemetry::new());
        let mut e = QuizEngine::new(minimal_bank(), sink.clone());
        e.select_a_lines(&[LineId::Control, LineId::Pace, LineId::Boundary]).unwrap();
        e.advance().unwrap();
        answer_phase(&mut e, |_| OptionKey::A);
        e.advance().unwrap();
        answer_phase(&mut e, |_| OptionKey::A);
        assert_eq!(e.advance().unwrap(), ReasonCode::Q400_VERDICTS_RECOMPUTED);

        // four CCC module lines tie at 3.6
        assert_eq!(e.advance().unwrap(), ReasonCode::Q402_TIE_BREAK_REQUIRED);
        assert!(e.needs_tie_break());
        assert_eq!(e.anchor_options().len(), 4);
        let sage = Face::of(Archetype::Sage);
        assert_eq!(e.set_anchor(sage).unwrap(), ReasonCode::Q403_ANCHOR_COMMITTED);

        e.advance().unwrap();
        assert_eq!(e.state().sif_shortlist.len(), 4);
        assert!(matches!(e.choose_installed(Face::of(Archetype::Rebel)), Err(QuizError::NotOnShortlist(_))));
        e.choose_installed(sage).unwrap();
        assert_eq!(e.state().final_archetype.as_deref(), Some("Sage"));

        assert_eq!(e.advance().unwrap(), ReasonCode::Q501_SIF_FINALIZED);
        let result = e.state().sif_result.clone().unwrap();
        assert_eq!(result.primary, sage);
        assert_ne!(result.secondary, sage);
        assert_eq!(result.context.secondary_source, SecondarySource::Shortlist);
        assert_eq!(result.secondary.id(), "Bonding:Caretaker");
        assert_eq!(result.badge, crate::types::Badge::Aligned);

        let events = sink.events();
        assert!(events.iter().any(|ev| matches!(ev, TelemetryEvent::SifFinalized { .. })));
        assert!(matches!(e.advance(), Err(QuizError::InvalidTransition { .. })));
    }

    #[test]
    fn test_reset_discards_everything() {
        let mut e = engine();
        e.select_a_lines(&[LineId::Control, LineId::Pace, LineId::Boundary]).unwrap();
        e.advance().unwrap();
        answer_phase(&mut e, |_| OptionKey::B);
        e.reset_quiz();
        assert_eq!(e.state(), &QuizState::new());
        assert_eq!(e.phase(), QuizPhase::A);
        assert!(e.next_question().unwrap().is_none());
        assert!(e.session_id().starts_with("sess_"));
    }

    #[test]
    fn test_resume_mid_phase_c() {
        let mut e = engine();
        e.select_a_lines(&[LineId::Control, LineId::Pace, LineId::Boundary]).unwrap();
        e.advance().unwrap();
        answer_phase(&mut e, |_| OptionKey::B);
        e.advance().unwrap();
        for choice in [OptionKey::A, OptionKey::B] {
            e.next_question().unwrap();
            e.answer(choice).unwrap();
        }

        let snap = e.snapshot();
        let mut resumed = QuizEngine::resume(minimal_bank(), &snap, Rc::new(NullTelemetry)).unwrap();
        assert_eq!(resumed.state(), e.state());
        assert_eq!(resumed.session_id(), e.session_id());
        assert_eq!(
            resumed.next_question().unwrap().map(|q| q.id),
            e.next_question().unwrap().map(|q| q.id)
        );
    }

    #[test]
    fn test_resume_rejects_unknown_question() {
        let mut e = engine();
        e.select_a_lines(&[LineId::Control, LineId::Pace, LineId::Boundary]).unwrap();
        e.advance().unwrap();
        e.next_question().unwrap();
        e.answer(OptionKey::A).unwrap();
        let mut snap = e.snapshot();
        snap.question_history[0].question_id = "B-Nowhere-CO-1".to_string();
        let err = QuizEngine::resume(minimal_bank(), &snap, Rc::new(NullTelemetry)).unwrap_err();
        assert_eq!(err, QuizError::UnknownQuestion("B-Nowhere-CO-1".to_string()));
    }

    #[test]
    fn test_direct_effects_survive_resume() {
        let mut e = engine();
        let question = e.bank().question("B-Control-CO-1").cloned().unwrap();
        e.record_answer_with_effects(&question, OptionKey::A, LineId::Control).unwrap();
        assert_eq!(e.state().sif_counters.fam_c(LineId::Control), 1.0);
        assert_eq!(e.state().question_history.len(), 1);

        let resumed = QuizEngine::resume(minimal_bank(), &e.snapshot(), Rc::new(NullTelemetry)).unwrap();
        assert_eq!(resumed.state().sif_counters, e.state().sif_counters);
        assert_eq!(resumed.state().question_history, e.state().question_history);
    }

    #[test]
    fn test_direct_effects_reject_foreign_question() {
        let mut e = engine();
        let mut question = e.bank().question("B-Control-CO-1").cloned().unwrap();
        question.id = "B-Elsewhere-CO-1".to_string();
        let err = e.record_answer_with_effects(&question, OptionKey::A, LineId::Control).unwrap_err();
        assert_eq!(err, QuizError::UnknownQuestion("B-Elsewhere-CO-1".to_string()));
        assert_eq!(e.state().sif_counters, crate::types::SifCounters::new());
        assert!(e.state().question_history.is_empty());
    }

    #[test]
    fn test_resume_rejects_anchor_outside_options() {
        let mut e = engine();
        e.select_a_lines(&[LineId::Control, LineId::Pace, LineId::Boundary]).unwrap();
        e.advance().unwrap();
        answer_phase(&mut e, |_| OptionKey::A);
        e.advance().unwrap();
        answer_phase(&mut e, |_| OptionKey::A);
        e.advance().unwrap();
        e.advance().unwrap();
        e.set_anchor(Face::of(Archetype::Sage)).unwrap();

        let mut snap = e.snapshot();
        assert!(QuizEngine::resume(minimal_bank(), &snap, Rc::new(NullTelemetry)).is_ok());
        snap.anchor = Some(Face::of(Archetype::Rebel));
        let err = QuizEngine::resume(minimal_bank(), &snap, Rc::new(NullTelemetry)).unwrap_err();
        assert_eq!(err, QuizError::InvalidAnchorChoice(Face::of(Archetype::Rebel)));
    }
}
