//! Verdict Engine: fixed truth table and purity arithmetic
//!
//! Verdict table (CO1, CO2, CF):
//! - CCC → C
//! - CCF, COC, OCC, OOC → O
//! - COF, OCF, OOF → F
//!
//! Any other key is a contract violation, never defaulted.

use crate::{FACE_PURITY_SEED, MODULE_CO_STEP, MODULE_CF_STEP};
use crate::types::{Decision, Pick, QuizError, Verdict};

/// The eight legal decision keys
pub const VERDICT_TABLE: [(&str, Verdict); 8] = [
    ("CCC", Verdict::C),
    ("CCF", Verdict::O),
    ("COC", Verdict::O),
    ("COF", Verdict::F),
    ("OCC", Verdict::O),
    ("OCF", Verdict::F),
    ("OOC", Verdict::O),
    ("OOF", Verdict::F),
];

/// Look up a verdict by its three-letter key
pub fn verdict_for_key(key: &str) -> Result<Verdict, QuizError> {
    VERDICT_TABLE
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .ok_or_else(|| QuizError::InvalidDecisionCombination { key: key.to_string() })
}

/// Verdict for a CO1 / CO2 / CF triple
pub fn compute_verdict(co1: Pick, co2: Pick, cf: Pick) -> Result<Verdict, QuizError> {
    let key: String = [co1.as_char(), co2.as_char(), cf.as_char()].iter().collect();
    verdict_for_key(&key)
}

/// Verdict for a complete module decision list
pub fn verdict_for_decisions(decisions: &[Decision]) -> Result<Verdict, QuizError> {
    match decisions {
        [co1, co2, cf] => compute_verdict(co1.pick, co2.pick, cf.pick),
        _ => {
            let key: String = decisions.iter().map(|d| d.pick.as_char()).collect();
            Err(QuizError::InvalidDecisionCombination { key })
        }
    }
}

/// A-line face purity: 0.6 + value(pick1) + value(pick2)
pub fn compute_face_purity(pick1: Pick, pick2: Pick) -> f64 {
    FACE_PURITY_SEED + pick1.purity_value() + pick2.purity_value()
}

/// Non-A purity: CO decisions ±1.0, CF decisions ±1.6 (C positive, anything else negative)
///
/// Not interchangeable with [`compute_face_purity`].
pub fn module_purity(decisions: &[Decision]) -> f64 {
    decisions
        .iter()
        .map(|d| {
            let step = if d.decision_type.is_cf() { MODULE_CF_STEP } else { MODULE_CO_STEP };
            if d.pick == Pick::C { step } else { -step }
        })
        .sum()
}

/// A-line verdict: F coerced to O, then both C ⇒ C, else O
pub fn a_line_verdict(picks: &[Pick]) -> Verdict {
    let coerced: Vec<Pick> = picks
        .iter()
        .map(|p| if *p == Pick::F { Pick::O } else { *p })
        .collect();
    if coerced.len() == 2 && coerced.iter().all(|p| *p == Pick::C) {
        Verdict::C
    } else {
        Verdict::O
    }
}

// =============================================================================
// TESTS
// =============================================================================
