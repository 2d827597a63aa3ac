//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::rc::Rc;

use sifquiz::core::{NullTelemetry, QuestionBank, QuizEngine};
use sifquiz::types::{LineId, OptionKey, Pick, Question, QuestionType, SeverityLevel};

pub const SAMPLE_BANK: &str = include_str!("../../demos/sample_bank.json");

pub fn sample_bank() -> QuestionBank {
    QuestionBank::from_json_str(SAMPLE_BANK).unwrap()
}

pub fn engine() -> QuizEngine {
    QuizEngine::new(sample_bank(), Rc::new(NullTelemetry))
}

/// Option key carrying `pick`; option order is shuffled in the sample bank
pub fn key_for_pick(q: &Question, pick: Pick) -> OptionKey {
    q.options
        .iter()
        .find(|(_, o)| o.pick == Some(pick))
        .map(|(k, _)| *k)
        .unwrap_or_else(|| panic!("{} has no {} option", q.id, pick))
}

pub fn key_for_severity(q: &Question, level: SeverityLevel) -> OptionKey {
    q.options
        .iter()
        .find(|(_, o)| o.severity == Some(level))
        .map(|(k, _)| *k)
        .unwrap_or_else(|| panic!("{} has no {} option", q.id, level))
}

/// Answer every question of the current phase
pub fn answer_phase(
    engine: &mut QuizEngine,
    plan: impl Fn(LineId, QuestionType, u8) -> Pick,
    severity: impl Fn(LineId) -> SeverityLevel,
) {
    while let Some(q) = engine.next_question().unwrap() {
        let key = match q.question_type {
            Some(t) => key_for_pick(&q, plan(q.line_id, t, q.order)),
            None => key_for_severity(&q, severity(q.line_id)),
        };
        engine.answer(key).unwrap();
    }
}

/// Duel plan:
/// - Control: C, C (2.6)
/// - Pace: O, F (1.2)
/// - Boundary: C, O (2.2)
pub fn mixed_duels(line: LineId, t: QuestionType, order: u8) -> Pick {
    match (line, t, order) {
        (LineId::Pace, QuestionType::CO, 1) => Pick::O,
        (LineId::Pace, QuestionType::CF, _) => Pick::F,
        (LineId::Boundary, QuestionType::CO, 2) => Pick::O,
        _ => Pick::C,
    }
}

/// Module plan:
/// - Truth: CCC (3.6)
/// - Recognition: COF (-1.6)
/// - Bonding: OOC (-0.4)
/// - Stress: CCF (0.4)
pub fn mixed_modules(line: LineId, t: QuestionType, order: u8) -> Pick {
    match (line, t, order) {
        (LineId::Recognition, QuestionType::CO, 2) => Pick::O,
        (LineId::Recognition, QuestionType::CF, _) => Pick::F,
        (LineId::Bonding, QuestionType::CO, _) => Pick::O,
        (LineId::Stress, QuestionType::CF, _) => Pick::F,
        _ => Pick::C,
    }
}

pub fn all_clean(_: LineId, _: QuestionType, _: u8) -> Pick {
    Pick::C
}

pub fn high(_: LineId) -> SeverityLevel {
    SeverityLevel::High
}

/// Drive a session with the mixed plans to the end of phase C
pub fn through_phase_c(engine: &mut QuizEngine, severity: impl Fn(LineId) -> SeverityLevel) {
    engine
        .select_a_lines(&[LineId::Control, LineId::Pace, LineId::Boundary])
        .unwrap();
    engine.advance().unwrap();
    answer_phase(engine, mixed_duels, high);
    engine.advance().unwrap();
    answer_phase(engine, mixed_modules, severity);
}
