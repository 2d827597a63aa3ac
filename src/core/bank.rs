//! Question bank loading and load-time validation
//!
//! A bank that passes validation has, for every line, duel and module
//! questions at (CO,1), (CO,2), (CF,1) and at least one severity probe.
//! Gaps are fatal here so the selector never has to fall back at runtime.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{BankError, BankPhase, LineId, Question, QuestionType};

lazy_static! {
    static ref RE_QUESTION_ID: Regex = Regex::new(r"^[A-Za-z0-9_.:-]+$").unwrap();
}

/// Keys every line needs in both the duel and the module flow
pub const REQUIRED_KEYS: [(QuestionType, u8); 3] = [
    (QuestionType::CO, 1),
    (QuestionType::CO, 2),
    (QuestionType::CF, 1),
];

/// Validated, immutable question bank
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
    by_id: HashMap<String, usize>,
}

impl QuestionBank {
    /// Validate and wrap a list of questions
    pub fn new(questions: Vec<Question>) -> Result<Self, BankError> {
        let mut by_id = HashMap::new();
        for (i, q) in questions.iter().enumerate() {
            if !RE_QUESTION_ID.is_match(&q.id) {
                return Err(BankError::MalformedId(q.id.clone()));
            }
            if by_id.insert(q.id.clone(), i).is_some() {
                return Err(BankError::DuplicateId(q.id.clone()));
            }
            validate_question(q)?;
        }
        validate_coverage(&questions)?;

        tracing::debug!(questions = questions.len(), "question bank validated");
        Ok(Self { questions, by_id })
    }

    /// Parse a JSON array of questions and validate it
    pub fn from_json_str(json: &str) -> Result<Self, BankError> {
        let questions: Vec<Question> =
            serde_json::from_str(json).map_err(|e| BankError::Parse(e.to_string()))?;
        Self::new(questions)
    }

    /// Read and validate a bank file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BankError> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| BankError::Io(e.to_string()))?;
        Self::from_json_str(&json)
    }

    /// Question by id
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.by_id.get(id).map(|i| &self.questions[*i])
    }

    /// All questions, bank order
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Number of questions for a line in a flow
    pub fn count(&self, line: LineId, phase: BankPhase) -> usize {
        self.questions
            .iter()
            .filter(|q| q.line_id == line && q.phase == phase)
            .count()
    }
}

fn validate_question(q: &Question) -> Result<(), BankError> {
    if q.options.len() < 2 {
        return Err(BankError::TooFewOptions(q.id.clone()));
    }
    let invalid = |option: &str, detail: &str| BankError::InvalidOption {
        question_id: q.id.clone(),
        option: option.to_string(),
        detail: detail.to_string(),
    };

    match q.phase {
        BankPhase::Duel | BankPhase::Module => {
            let qtype = q.question_type.ok_or_else(|| BankError::MissingType(q.id.clone()))?;
            for (key, option) in &q.options {
                let pick = option
                    .pick
                    .ok_or_else(|| invalid(&key.to_string(), "missing pick"))?;
                if !qtype.allows(pick) {
                    return Err(invalid(&key.to_string(), &format!("pick {} not allowed on {}", pick, qtype)));
                }
            }
        }
        BankPhase::Severity => {
            for (key, option) in &q.options {
                if option.severity.is_none() {
                    return Err(invalid(&key.to_string(), "missing severity"));
                }
            }
        }
    }
    Ok(())
}

fn validate_coverage(questions: &[Question]) -> Result<(), BankError> {
    let present: HashSet<(BankPhase, LineId, Option<QuestionType>, u8)> = questions
        .iter()
        .map(|q| (q.phase, q.line_id, q.question_type, q.order))
        .collect();

    for line in LineId::ALL {
        for phase in [BankPhase::Duel, BankPhase::Module] {
            for (qtype, order) in REQUIRED_KEYS {
                if !present.contains(&(phase, line, Some(qtype), order)) {
                    return Err(BankError::MissingCombination {
                        line,
                        phase: phase.to_string(),
                        question_type: qtype,
                        order,
                    });
                }
            }
        }
        let has_severity = questions
            .iter()
            .any(|q| q.phase == BankPhase::Severity && q.line_id == line);
        if !has_severity {
            return Err(BankError::MissingSeverity(line));
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use crate::types::{Effects, Face, OptionKey, Pick, QuestionOption, SeverityLevel};

    fn pick_option(pick: Pick, line: LineId) -> QuestionOption {
        let mut effects = Effects::default();
        match pick {
            Pick::C => {
                effects.fam_c.push(line);
                effects.face_c.push(Face::of(line.clean_archetype()));
            }
            Pick::O => {
                effects.fam_o.push(line);
                effects.face_o.push(Face::of(line.shadow_archetype()));
            }
            Pick::F => {
                effects.fam_f.push(line);
                effects.face_f.push(Face::of(line.shadow_archetype()));
            }
        }
        QuestionOption { label: format!("{}", pick), pick: Some(pick), severity: None, effects }
    }

    fn choice_question(phase: BankPhase, line: LineId, qtype: QuestionType, order: u8) -> Question {
        let other = if qtype == QuestionType::CO { Pick::O } else { Pick::F };
        let mut options = BTreeMap::new();
        options.insert(OptionKey::A, pick_option(Pick::C, line));
        options.insert(OptionKey::B, pick_option(other, line));
        Question {
            id: format!("{}-{}-{}-{}", phase, line, qtype, order),
            phase,
            line_id: line,
            question_type: Some(qtype),
            order,
            prompt: format!("{} {} {}", line, qtype, order),
            options,
        }
    }

    fn severity_question(line: LineId) -> Question {
        let mut options = BTreeMap::new();
        for (key, level) in [(OptionKey::A, SeverityLevel::High), (OptionKey::B, SeverityLevel::Mid), (OptionKey::C, SeverityLevel::Low)] {
            options.insert(key, QuestionOption {
                label: level.to_string(),
                pick: None,
                severity: Some(level),
                effects: Effects::default(),
            });
        }
        Question {
            id: format!("SEV-{}", line),
            phase: BankPhase::Severity,
            line_id: line,
            question_type: None,
            order: 1,
            prompt: format!("How much does {} cost you?", line),
            options,
        }
    }

    /// Minimal complete bank: one question per required key, one probe per line
    pub(crate) fn minimal_questions() -> Vec<Question> {
        let mut questions = Vec::new();
        for line in LineId::ALL {
            for phase in [BankPhase::Duel, BankPhase::Module] {
                for (qtype, order) in REQUIRED_KEYS {
                    questions.push(choice_question(phase, line, qtype, order));
                }
            }
            questions.push(severity_question(line));
        }
        questions
    }

    pub(crate) fn minimal_bank() -> QuestionBank {
        QuestionBank::new(minimal_questions()).unwrap()
    }

    #[test]
    fn test_minimal_bank_validates() {
        let bank = minimal_bank();
        assert_eq!(bank.len(), 7 * 7);
        assert_eq!(bank.count(LineId::Truth, BankPhase::Duel), 3);
        assert!(bank.question("SEV-Truth").is_some());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut questions = minimal_questions();
        questions.push(questions[0].clone());
        let err = QuestionBank::new(questions).unwrap_err();
        assert!(matches!(err, BankError::DuplicateId(_)));
    }

    #[test]
    fn test_malformed_id_rejected() {
        let mut questions = minimal_questions();
        questions[0].id = "has space".to_string();
        assert!(matches!(QuestionBank::new(questions), Err(BankError::MalformedId(_))));
    }

    #[test]
    fn test_missing_combination_rejected() {
        let questions: Vec<Question> = minimal_questions()
            .into_iter()
            .filter(|q| q.id != "C-Stress-CO-2")
            .collect();
        let err = QuestionBank::new(questions).unwrap_err();
        assert_eq!(
            err,
            BankError::MissingCombination {
                line: LineId::Stress,
                phase: "C".to_string(),
                question_type: QuestionType::CO,
                order: 2,
            }
        );
    }

    #[test]
    fn test_missing_severity_rejected() {
        let questions: Vec<Question> = minimal_questions()
            .into_iter()
            .filter(|q| q.id != "SEV-Bonding")
            .collect();
        assert_eq!(QuestionBank::new(questions).unwrap_err(), BankError::MissingSeverity(LineId::Bonding));
    }

    #[test]
    fn test_illegal_pick_for_type_rejected() {
        let mut questions = minimal_questions();
        let q = questions.iter_mut().find(|q| q.id == "B-Pace-CO-1").unwrap();
        q.options.get_mut(&OptionKey::B).unwrap().pick = Some(Pick::F);
        assert!(matches!(QuestionBank::new(questions), Err(BankError::InvalidOption { .. })));
    }

    #[test]
    fn test_parse_error_reported() {
        assert!(matches!(QuestionBank::from_json_str("{not json"), Err(BankError::Parse(_))));
    }
}
