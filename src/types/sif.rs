//! SIF types: candidate faces, Installed-Likelihood breakdowns and the final result

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{Face, LineId, Pick};

/// Where a candidate face's answer path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceSource {
    /// A-line duel path (2 picks)
    A,
    /// Module path (3 picks: CO1, CO2, CF)
    M,
}

/// A face to be scored, with its answer path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceCandidate {
    pub face: Face,
    pub source: FaceSource,
    pub path: Vec<Pick>,
    /// Face purity from phase B (A source only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_purity: Option<f64>,
}

/// Families (and their faces) that may become the anchor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorCandidates {
    pub families: BTreeSet<LineId>,
    pub faces: Vec<Face>,
    /// True when the set came from A-lines at purity 2.6
    pub from_a26: bool,
}

impl AnchorCandidates {
    pub fn contains_family(&self, family: LineId) -> bool {
        self.families.contains(&family)
    }

    /// True when `face` is the prize mirror of any candidate face
    pub fn is_prize_mirror(&self, face: Face) -> bool {
        self.faces.iter().any(|f| f.mirror() == face)
    }
}

/// Every intermediate quantity of one IL computation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IlBreakdown {
    pub early_o: f64,
    pub f_touch: f64,
    pub o_ratio: f64,
    pub purity_gap: f64,
    pub is_ccc: f64,
    pub ended_f: f64,
    pub drift_ratio: f64,
    /// Path-derived score after the base cap
    pub base: f64,
    pub sibling_bonus: f64,
    pub prize_bonus: f64,
    /// Final score after the total cap
    pub total: f64,
}

/// A candidate face with its IL score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredFace {
    pub face: Face,
    pub source: FaceSource,
    pub il: IlBreakdown,
}

/// Result of shortlist construction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallRanking {
    /// All distinct candidate faces, best first
    pub ranked: Vec<ScoredFace>,
    /// Up to four faces offered to the user
    pub shortlist: Vec<ScoredFace>,
    /// Whether the diversity rule replaced the fourth entry
    pub diversity_swap: bool,
}

impl InstallRanking {
    pub fn shortlist_faces(&self) -> Vec<Face> {
        self.shortlist.iter().map(|s| s.face).collect()
    }

    pub fn ranked_faces(&self) -> Vec<Face> {
        self.ranked.iter().map(|s| s.face).collect()
    }
}

/// How the secondary face was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecondarySource {
    /// The installed choice, no collision
    Installed,
    /// Collision resolved from the shortlist
    Shortlist,
    /// Collision resolved from the full IL ranking
    Ranked,
    /// Collision with no alternative; the choice is kept
    Degraded,
    /// Picked by the legacy scorer
    Legacy,
}

/// Outcome of secondary resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryResolution {
    pub face: Face,
    pub source: SecondarySource,
}

impl SecondaryResolution {
    pub fn collided(&self) -> bool {
        !matches!(self.source, SecondarySource::Installed | SecondarySource::Legacy)
    }
}

/// Badge shown next to the secondary face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Badge {
    #[serde(rename = "Aligned")]
    Aligned,
    #[serde(rename = "Installed from outside")]
    InstalledFromOutside,
    #[serde(rename = "Not yet aligned")]
    NotYetAligned,
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Badge::Aligned => "Aligned",
            Badge::InstalledFromOutside => "Installed from outside",
            Badge::NotYetAligned => "Not yet aligned",
        };
        write!(f, "{}", name)
    }
}

/// Which scorer produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScorerKind {
    InstalledLikelihood,
    Legacy,
}

/// Legacy scorer components for one face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyScore {
    pub face: Face,
    pub ni: f64,
    pub si: f64,
    pub ii: f64,
    pub score: f64,
}

/// Diagnostics carried with the result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SifContext {
    pub scorer: ScorerKind,
    pub secondary_source: SecondarySource,
    /// famF + sevF of the secondary family
    pub instability: f64,
    /// famC / (famC + famO) of the secondary family
    pub stability_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_il: Option<IlBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy: Option<LegacyScore>,
}

/// Final Primary / Secondary / Prize assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SifResult {
    pub primary_family: LineId,
    pub primary: Face,
    pub secondary: Face,
    pub prize: Face,
    pub badge: Badge,
    pub context: SifContext,
}
