//! sifquiz: scoring and phase engine for the SIF identity-face quiz
//!
//! Phases A → B → C → D → E → Archetype → Summary drive per-line verdicts,
//! purity, the Installed-Likelihood shortlist and the final Primary /
//! Secondary / Prize assignment.

pub mod core;
pub mod types;

// =============================================================================
// PURITY [C]
// =============================================================================

/// Seed added to every A-line face purity
pub const FACE_PURITY_SEED: f64 = 0.6;

/// Pick values for A-line face purity
pub const PICK_VALUE_C: f64 = 1.0;
pub const PICK_VALUE_O: f64 = 0.6;
pub const PICK_VALUE_F: f64 = 0.0;

/// The "perfect-ish" A-line purity (both picks C)
pub const A_LINE_TOP_PURITY: f64 = 2.6;

/// Module (non-A) purity steps
pub const MODULE_CO_STEP: f64 = 1.0;
pub const MODULE_CF_STEP: f64 = 1.6;

/// Tolerance for purity equality (ties, 2.6 detection)
pub const PURITY_EPSILON: f64 = 1e-9;

// =============================================================================
// SEVERITY [C]
// =============================================================================

pub const SEVERITY_HIGH_SCORE: f64 = 1.0;
pub const SEVERITY_MID_SCORE: f64 = 0.5;
pub const SEVERITY_LOW_SCORE: f64 = 0.0;

// =============================================================================
// INSTALLED LIKELIHOOD WEIGHTS [C]
// =============================================================================

/// A-line path weights
pub const IL_WEIGHT_EARLY_O: f64 = 1.6;
pub const IL_WEIGHT_F_TOUCH: f64 = 1.2;
pub const IL_WEIGHT_O_RATIO: f64 = 0.8;
pub const IL_WEIGHT_PURITY_GAP: f64 = 0.8;

/// Module path weights
pub const IL_WEIGHT_CCC: f64 = 1.6;
pub const IL_WEIGHT_ENDED_F: f64 = 1.4;
pub const IL_WEIGHT_DRIFT: f64 = 0.8;

/// Cap on the path-derived base score
pub const IL_BASE_CAP: f64 = 4.0;

/// Bonus when the face's family is an anchor-candidate family
pub const IL_SIBLING_BONUS: f64 = 1.0;

/// Bonus when the face is the prize mirror of an anchor-candidate face
pub const IL_PRIZE_BONUS: f64 = 0.5;

/// Cap on the final score
pub const IL_TOTAL_CAP: f64 = 5.0;

/// Maximum shortlist length
pub const SHORTLIST_SIZE: usize = 4;

// =============================================================================
// BADGE THRESHOLDS [C]
// =============================================================================

/// famF + sevF at or above this marks the family unstable
pub const BADGE_INSTABILITY_THRESHOLD: f64 = 2.0;

/// famC / (famC + famO) below this marks the family as low-stability
pub const BADGE_STABILITY_RATIO_MIN: f64 = 0.5;

// =============================================================================
// LEGACY SCORER WEIGHTS [C]
// =============================================================================

pub const LEGACY_WEIGHT_NI: f64 = 0.5;
pub const LEGACY_WEIGHT_SI: f64 = 0.5;
pub const LEGACY_WEIGHT_II: f64 = 0.1;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Snapshots older than this are discarded on load
pub const SNAPSHOT_TTL_HOURS: i64 = 24;

/// Store key prefix for session snapshots
pub const SNAPSHOT_KEY_PREFIX: &str = "sifquiz_session_";

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
