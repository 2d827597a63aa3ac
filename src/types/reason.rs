//! Reason codes for recorded answers and phase outcomes

use serde::{Deserialize, Serialize};

/// Reason codes attached to every step output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // Q000: Transitions
    // =========================================================================
    /// Moved to the next phase
    Q001_PHASE_ENTERED,

    // =========================================================================
    // Q100: Phase A
    // =========================================================================
    /// Three A-lines committed
    Q100_A_LINES_SELECTED,

    // =========================================================================
    // Q200: Phase B
    // =========================================================================
    /// Duel pick recorded, line still open
    Q200_PICK_RECORDED,
    /// Second duel pick recorded, purity computed
    Q201_A_LINE_COMPLETE,

    // =========================================================================
    // Q300: Phase C
    // =========================================================================
    /// Module decision recorded, line still open
    Q300_DECISION_RECORDED,
    /// Third decision recorded, verdict C or O
    Q301_VERDICT_COMPUTED,
    /// Third decision recorded, verdict F, probe required
    Q302_SEVERITY_REQUIRED,
    /// Severity probe answered
    Q303_SEVERITY_RECORDED,

    // =========================================================================
    // Q400: Phase D / E
    // =========================================================================
    /// Verdicts recomputed
    Q400_VERDICTS_RECOMPUTED,
    /// Unique purity leader committed as anchor
    Q401_ANCHOR_AUTO_COMMITTED,
    /// Several candidates tied, user must choose
    Q402_TIE_BREAK_REQUIRED,
    /// Anchor committed from a user choice
    Q403_ANCHOR_COMMITTED,

    // =========================================================================
    // Q500: SIF
    // =========================================================================
    /// Installed choice recorded
    Q500_INSTALLED_CHOSEN,
    /// SIF finalised
    Q501_SIF_FINALIZED,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::Q001_PHASE_ENTERED => "Q001_PHASE_ENTERED",
            Self::Q100_A_LINES_SELECTED => "Q100_A_LINES_SELECTED",
            Self::Q200_PICK_RECORDED => "Q200_PICK_RECORDED",
            Self::Q201_A_LINE_COMPLETE => "Q201_A_LINE_COMPLETE",
            Self::Q300_DECISION_RECORDED => "Q300_DECISION_RECORDED",
            Self::Q301_VERDICT_COMPUTED => "Q301_VERDICT_COMPUTED",
            Self::Q302_SEVERITY_REQUIRED => "Q302_SEVERITY_REQUIRED",
            Self::Q303_SEVERITY_RECORDED => "Q303_SEVERITY_RECORDED",
            Self::Q400_VERDICTS_RECOMPUTED => "Q400_VERDICTS_RECOMPUTED",
            Self::Q401_ANCHOR_AUTO_COMMITTED => "Q401_ANCHOR_AUTO_COMMITTED",
            Self::Q402_TIE_BREAK_REQUIRED => "Q402_TIE_BREAK_REQUIRED",
            Self::Q403_ANCHOR_COMMITTED => "Q403_ANCHOR_COMMITTED",
            Self::Q500_INSTALLED_CHOSEN => "Q500_INSTALLED_CHOSEN",
            Self::Q501_SIF_FINALIZED => "Q501_SIF_FINALIZED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Q001_PHASE_ENTERED => "Phase entered",
            Self::Q100_A_LINES_SELECTED => "A-lines selected",
            Self::Q200_PICK_RECORDED => "Duel pick recorded",
            Self::Q201_A_LINE_COMPLETE => "A-line complete",
            Self::Q300_DECISION_RECORDED => "Module decision recorded",
            Self::Q301_VERDICT_COMPUTED => "Verdict computed",
            Self::Q302_SEVERITY_REQUIRED => "Fail verdict - severity probe required",
            Self::Q303_SEVERITY_RECORDED => "Severity recorded",
            Self::Q400_VERDICTS_RECOMPUTED => "Verdicts recomputed",
            Self::Q401_ANCHOR_AUTO_COMMITTED => "Anchor committed automatically",
            Self::Q402_TIE_BREAK_REQUIRED => "Anchor tie-break required",
            Self::Q403_ANCHOR_COMMITTED => "Anchor committed",
            Self::Q500_INSTALLED_CHOSEN => "Installed face chosen",
            Self::Q501_SIF_FINALIZED => "Result finalised",
        }
    }

    /// Does this outcome block progress until the user acts?
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Q302_SEVERITY_REQUIRED | Self::Q402_TIE_BREAK_REQUIRED)
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
