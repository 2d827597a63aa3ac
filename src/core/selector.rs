//! Question Selector: exact-key lookup with no-repeat and no-fallback
//!
//! Returns the first unused question in the `(line, type, order)` bucket or
//! `None`. A `None` must surface as a hard error; the selector never
//! substitutes a neighbouring key or repeats a used question.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::core::QuestionBank;
use crate::core::telemetry::{NullTelemetry, TelemetryEvent, TelemetrySink};
use crate::types::{BankPhase, LineId, Question, QuestionType, UsedQuestions};

type Bucket = BTreeMap<(LineId, QuestionType, u8), Vec<Question>>;

/// Pre-indexed question lookup
#[derive(Debug, Clone)]
pub struct QuestionSelector {
    module_index: Bucket,
    duel_index: Bucket,
    severity_index: BTreeMap<LineId, Question>,
    telemetry: Rc<dyn TelemetrySink>,
}

impl QuestionSelector {
    /// Build the three indexes from a validated bank
    pub fn new(bank: &QuestionBank, telemetry: Rc<dyn TelemetrySink>) -> Self {
        let mut module_index = Bucket::new();
        let mut duel_index = Bucket::new();
        let mut severity_index = BTreeMap::new();

        for q in bank.questions() {
            match (q.phase, q.question_type) {
                (BankPhase::Duel, Some(t)) => {
                    duel_index.entry((q.line_id, t, q.order)).or_default().push(q.clone());
                }
                (BankPhase::Module, Some(t)) => {
                    module_index.entry((q.line_id, t, q.order)).or_default().push(q.clone());
                }
                (BankPhase::Severity, _) => {
                    // first probe per line wins
                    severity_index.entry(q.line_id).or_insert_with(|| q.clone());
                }
                _ => {}
            }
        }

        Self { module_index, duel_index, severity_index, telemetry }
    }

    /// Selector without a telemetry observer
    pub fn silent(bank: &QuestionBank) -> Self {
        Self::new(bank, Rc::new(NullTelemetry))
    }

    /// Next unused Phase C question for the key
    pub fn select_module_question(
        &self,
        used: &UsedQuestions,
        line: LineId,
        question_type: QuestionType,
        order: u8,
    ) -> Option<&Question> {
        self.select(&self.module_index, BankPhase::Module, used, line, question_type, order)
    }

    /// Next unused Phase B question for the key
    pub fn select_duel_question(
        &self,
        used: &UsedQuestions,
        line: LineId,
        question_type: QuestionType,
        order: u8,
    ) -> Option<&Question> {
        self.select(&self.duel_index, BankPhase::Duel, used, line, question_type, order)
    }

    /// Severity probe for a line
    pub fn select_severity_question(&self, line: LineId) -> Option<&Question> {
        let question = self.severity_index.get(&line);
        match question {
            Some(q) => self.telemetry.emit(&TelemetryEvent::QuestionSelected {
                question_id: q.id.clone(),
                phase: BankPhase::Severity,
                line,
                question_type: None,
                order: q.order,
            }),
            None => self.telemetry.emit(&TelemetryEvent::BankMiss {
                phase: BankPhase::Severity,
                line,
                question_type: None,
                order: 1,
            }),
        }
        question
    }

    /// Mark a question as used. Idempotent.
    pub fn mark_used(&self, used: &mut UsedQuestions, id: &str) -> bool {
        used.mark_used(id)
    }

    fn select<'a>(
        &self,
        index: &'a Bucket,
        phase: BankPhase,
        used: &UsedQuestions,
        line: LineId,
        question_type: QuestionType,
        order: u8,
    ) -> Option<&'a Question> {
        let found = index
            .get(&(line, question_type, order))
            .and_then(|bucket| bucket.iter().find(|q| !used.contains(&q.id)));

        let event = match found {
            Some(q) => TelemetryEvent::QuestionSelected {
                question_id: q.id.clone(),
                phase,
                line,
                question_type: Some(question_type),
                order,
            },
            None => TelemetryEvent::BankMiss {
                phase,
                line,
                question_type: Some(question_type),
                order,
            },
        };
        self.telemetry.emit(&event);
        found
    }
}

// =============================================================================
// TESTS
// =============================================================================
