//! SIF counters: per-family and per-face tallies accumulated during phases B and C
//!
//! All mutation goes through [`increment`]. Counters only grow; a full quiz
//! restart replaces the whole struct.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Face, LineId};

/// Add `amount` to `map[key]`, inserting the key if absent
pub fn increment<K: Ord>(map: &mut BTreeMap<K, f64>, key: K, amount: f64) {
    *map.entry(key).or_insert(0.0) += amount;
}

/// Process-scoped accumulator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SifCounters {
    pub fam_c: BTreeMap<LineId, f64>,
    pub fam_o: BTreeMap<LineId, f64>,
    pub fam_f: BTreeMap<LineId, f64>,
    /// Per-family severity score; a present key means a probe was answered
    pub sev_f: BTreeMap<LineId, f64>,
    pub face_c: BTreeMap<Face, f64>,
    pub face_o: BTreeMap<Face, f64>,
    pub face_f: BTreeMap<Face, f64>,
}

fn read<K: Ord>(map: &BTreeMap<K, f64>, key: &K) -> f64 {
    map.get(key).copied().unwrap_or(0.0)
}

impl SifCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fam_c(&self, family: LineId) -> f64 {
        read(&self.fam_c, &family)
    }

    pub fn fam_o(&self, family: LineId) -> f64 {
        read(&self.fam_o, &family)
    }

    pub fn fam_f(&self, family: LineId) -> f64 {
        read(&self.fam_f, &family)
    }

    /// Severity score if a probe was recorded for the family
    pub fn sev_f(&self, family: LineId) -> Option<f64> {
        self.sev_f.get(&family).copied()
    }

    pub fn face_c(&self, face: Face) -> f64 {
        read(&self.face_c, &face)
    }

    pub fn face_o(&self, face: Face) -> f64 {
        read(&self.face_o, &face)
    }

    pub fn face_f(&self, face: Face) -> f64 {
        read(&self.face_f, &face)
    }

    /// famF + sevF for a family
    pub fn instability(&self, family: LineId) -> f64 {
        self.fam_f(family) + self.sev_f(family).unwrap_or(0.0)
    }

    /// famC / (famC + famO), or None when the family has no C/O tallies
    pub fn stability_ratio(&self, family: LineId) -> Option<f64> {
        let c = self.fam_c(family);
        let total = c + self.fam_o(family);
        if total > 0.0 {
            Some(c / total)
        } else {
            None
        }
    }

    /// Every face with at least one tally
    pub fn tallied_faces(&self) -> Vec<Face> {
        let mut faces: Vec<Face> = self
            .face_c
            .keys()
            .chain(self.face_o.keys())
            .chain(self.face_f.keys())
            .copied()
            .collect();
        faces.sort();
        faces.dedup();
        faces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Archetype;

    #[test]
    fn test_increment_inserts_and_accumulates() {
        let mut map = BTreeMap::new();
        increment(&mut map, LineId::Pace, 1.0);
        increment(&mut map, LineId::Pace, 0.5);
        increment(&mut map, LineId::Truth, 0.0);
        assert_eq!(map.get(&LineId::Pace), Some(&1.5));
        assert_eq!(map.get(&LineId::Truth), Some(&0.0));
    }

    #[test]
    fn test_sev_f_presence_distinguishes_zero() {
        let mut counters = SifCounters::new();
        assert_eq!(counters.sev_f(LineId::Bonding), None);
        increment(&mut counters.sev_f, LineId::Bonding, 0.0);
        assert_eq!(counters.sev_f(LineId::Bonding), Some(0.0));
    }

    #[test]
    fn test_stability_ratio() {
        let mut counters = SifCounters::new();
        assert_eq!(counters.stability_ratio(LineId::Control), None);
        increment(&mut counters.fam_c, LineId::Control, 1.0);
        increment(&mut counters.fam_o, LineId::Control, 3.0);
        assert_eq!(counters.stability_ratio(LineId::Control), Some(0.25));
    }

    #[test]
    fn test_tallied_faces_dedup() {
        let mut counters = SifCounters::new();
        let rebel = Face::of(Archetype::Rebel);
        increment(&mut counters.face_o, rebel, 1.0);
        increment(&mut counters.face_f, rebel, 1.0);
        increment(&mut counters.face_c, Face::of(Archetype::Sage), 1.0);
        assert_eq!(counters.tallied_faces().len(), 2);
    }

    #[test]
    fn test_counters_roundtrip_json() {
        let mut counters = SifCounters::new();
        increment(&mut counters.face_c, Face::of(Archetype::Star), 2.0);
        increment(&mut counters.fam_f, LineId::Recognition, 1.0);
        let json = serde_json::to_string(&counters).unwrap();
        assert!(json.contains("\"Recognition:Star\""));
        let back: SifCounters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, counters);
    }
}
