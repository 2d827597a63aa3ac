//! SIF Engine: Installed Likelihood, shortlist and Secondary resolution
//!
//! IL for an A-line face (2 picks):
//!   base = 1.6·earlyO + 1.2·fTouch + 0.8·oRatio + 0.8·purityGap
//! IL for a module face (3 picks):
//!   base = 1.6·isCCC + 1.4·endedF + 0.8·driftRatio
//! base is capped at 4.0, then +1.0 sibling bonus and +0.5 prize bonus,
//! total capped at 5.0.
//!
//! Counters change only through `record_answer_with_effects`.

use std::cmp::Ordering;

use crate::core::verdict::{a_line_verdict, compute_face_purity, module_purity, verdict_for_decisions};
use crate::{
    A_LINE_TOP_PURITY, BADGE_INSTABILITY_THRESHOLD, BADGE_STABILITY_RATIO_MIN, FACE_PURITY_SEED,
    IL_BASE_CAP, IL_PRIZE_BONUS, IL_SIBLING_BONUS, IL_TOTAL_CAP, IL_WEIGHT_CCC, IL_WEIGHT_DRIFT,
    IL_WEIGHT_EARLY_O, IL_WEIGHT_ENDED_F, IL_WEIGHT_F_TOUCH, IL_WEIGHT_O_RATIO, IL_WEIGHT_PURITY_GAP,
    LEGACY_WEIGHT_II, LEGACY_WEIGHT_NI, LEGACY_WEIGHT_SI, PURITY_EPSILON, SHORTLIST_SIZE,
};
use crate::types::{
    increment, AnchorCandidates, Badge, Face, FaceCandidate, FaceSource, IlBreakdown,
    InstallRanking, LegacyScore, LineId, LineState, OptionKey, Pick, Question, QuizError,
    QuizState, ScoredFace, ScorerKind, SecondaryResolution, SecondarySource, SifContext,
    SifCounters, SifResult, Verdict,
};

// =============================================================================
// FACE DERIVATION
// =============================================================================

/// Face a line currently shows: clean archetype on C, shadow otherwise.
/// None until the line's picks are complete.
pub fn line_face(line: &LineState) -> Option<Face> {
    if !line.picks_complete() {
        return None;
    }
    let verdict = match line.verdict {
        Some(v) => v,
        None if line.selected_a => a_line_verdict(&line.b.picks),
        None => verdict_for_decisions(&line.module.decisions).ok()?,
    };
    let archetype = if verdict == Verdict::C {
        line.line.clean_archetype()
    } else {
        line.line.shadow_archetype()
    };
    Some(Face::of(archetype))
}

/// Purity used for anchor detection: B face purity on A-lines, module purity otherwise
pub fn line_purity(line: &LineState) -> f64 {
    if line.selected_a {
        line.b.c_evidence
    } else {
        module_purity(&line.module.decisions)
    }
}

/// One scoring candidate per line whose picks are complete
pub fn face_candidates(state: &QuizState) -> Vec<FaceCandidate> {
    state
        .lines
        .iter()
        .filter_map(|ls| {
            let face = line_face(ls)?;
            let candidate = if ls.selected_a {
                FaceCandidate {
                    face,
                    source: FaceSource::A,
                    path: ls.b.picks.clone(),
                    face_purity: Some(ls.b.c_evidence),
                }
            } else {
                FaceCandidate { face, source: FaceSource::M, path: ls.module.picks(), face_purity: None }
            };
            Some(candidate)
        })
        .collect()
}

/// Faces of A-lines whose face purity is exactly 2.6
pub fn a26_faces(state: &QuizState) -> Vec<Face> {
    state
        .lines
        .iter()
        .filter(|ls| ls.selected_a && (ls.b.c_evidence - A_LINE_TOP_PURITY).abs() < PURITY_EPSILON)
        .filter_map(line_face)
        .collect()
}

/// Faces of the non-A lines tied at the top module purity
pub fn module_top_faces(state: &QuizState) -> Vec<Face> {
    let complete: Vec<&LineState> = state
        .lines
        .iter()
        .filter(|ls| !ls.selected_a && ls.picks_complete())
        .collect();
    let top = complete
        .iter()
        .map(|ls| module_purity(&ls.module.decisions))
        .fold(f64::NEG_INFINITY, f64::max);
    complete
        .into_iter()
        .filter(|ls| (module_purity(&ls.module.decisions) - top).abs() < PURITY_EPSILON)
        .filter_map(line_face)
        .collect()
}

fn count(path: &[Pick], pick: Pick) -> usize {
    path.iter().filter(|p| **p == pick).count()
}

fn flag(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

// Sort key: IL desc, fTouch desc, endedF desc, face name asc
fn rank_order(a: &ScoredFace, b: &ScoredFace) -> Ordering {
    b.il.total
        .total_cmp(&a.il.total)
        .then_with(|| b.il.f_touch.total_cmp(&a.il.f_touch))
        .then_with(|| b.il.ended_f.total_cmp(&a.il.ended_f))
        .then_with(|| a.face.id().cmp(&b.face.id()))
}

/// Replace the 4th entry with the best other-family face when all 4 share a family
pub fn apply_diversity_rule(shortlist: &mut [ScoredFace], ranked: &[ScoredFace]) -> bool {
    if shortlist.len() < SHORTLIST_SIZE {
        return false;
    }
    let family = shortlist[0].face.family();
    if !shortlist.iter().all(|s| s.face.family() == family) {
        return false;
    }
    let replacement = ranked
        .iter()
        .find(|s| s.face.family() != family && !shortlist.iter().any(|x| x.face == s.face));
    match replacement {
        Some(r) => {
            shortlist[SHORTLIST_SIZE - 1] = r.clone();
            true
        }
        None => false,
    }
}

/// Installed-Likelihood scorer and Secondary resolver
#[derive(Debug, Default)]
pub struct SifEngine;

impl SifEngine {
    /// Create new engine
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    // COUNTERS
    // =========================================================================

    /// Apply the chosen option's declarative effects to the counters.
    /// Severity options also add their score to `sevF[family]`.
    pub fn record_answer_with_effects(
        &self,
        counters: &mut SifCounters,
        question: &Question,
        choice: OptionKey,
        family: LineId,
    ) -> Result<(), QuizError> {
        let option = question.option(choice).ok_or_else(|| QuizError::InvalidOption {
            question_id: question.id.clone(),
            option: choice.to_string(),
            detail: "option does not exist".to_string(),
        })?;

        let effects = &option.effects;
        for fam in &effects.fam_c {
            increment(&mut counters.fam_c, *fam, 1.0);
        }
        for fam in &effects.fam_o {
            increment(&mut counters.fam_o, *fam, 1.0);
        }
        for fam in &effects.fam_f {
            increment(&mut counters.fam_f, *fam, 1.0);
        }
        for face in &effects.face_c {
            increment(&mut counters.face_c, *face, 1.0);
        }
        for face in &effects.face_o {
            increment(&mut counters.face_o, *face, 1.0);
        }
        for face in &effects.face_f {
            increment(&mut counters.face_f, *face, 1.0);
        }
        if let Some(level) = option.severity {
            increment(&mut counters.sev_f, family, level.score());
        }

        tracing::debug!(
            question = %question.id,
            choice = %choice,
            family = %family,
            empty = effects.is_empty(),
            "answer effects applied"
        );
        Ok(())
    }

    // =========================================================================
    // ANCHOR CANDIDATES
    // =========================================================================

    /// A-line 2.6 faces take priority; otherwise the top-purity module faces
    pub fn compute_anchor_candidate_families(
        &self,
        a26_faces: &[Face],
        module_top_faces: &[Face],
    ) -> AnchorCandidates {
        let (faces, from_a26) = if !a26_faces.is_empty() {
            (a26_faces.to_vec(), true)
        } else {
            (module_top_faces.to_vec(), false)
        };
        AnchorCandidates {
            families: faces.iter().map(|f| f.family()).collect(),
            faces,
            from_a26,
        }
    }

    /// Anchor candidates derived from the current state
    pub fn anchor_candidates(&self, state: &QuizState) -> AnchorCandidates {
        self.compute_anchor_candidate_families(&a26_faces(state), &module_top_faces(state))
    }

    // =========================================================================
    // INSTALLED LIKELIHOOD
    // =========================================================================

    /// IL score with every intermediate quantity
    pub fn installed_likelihood_for_face(
        &self,
        candidate: &FaceCandidate,
        anchors: &AnchorCandidates,
    ) -> IlBreakdown {
        let path = candidate.path.as_slice();
        let mut il = IlBreakdown {
            f_touch: flag(path.contains(&Pick::F)),
            ..IlBreakdown::default()
        };

        let raw = match candidate.source {
            FaceSource::A => {
                let purity = candidate.face_purity.unwrap_or_else(|| match path {
                    [p1, p2] => compute_face_purity(*p1, *p2),
                    _ => FACE_PURITY_SEED + path.iter().map(|p| p.purity_value()).sum::<f64>(),
                });
                il.early_o = flag(path.first() == Some(&Pick::O));
                il.o_ratio = count(path, Pick::O) as f64 / 2.0;
                il.purity_gap = ((A_LINE_TOP_PURITY - purity) / 2.0).clamp(0.0, 1.0);
                IL_WEIGHT_EARLY_O * il.early_o
                    + IL_WEIGHT_F_TOUCH * il.f_touch
                    + IL_WEIGHT_O_RATIO * il.o_ratio
                    + IL_WEIGHT_PURITY_GAP * il.purity_gap
            }
            FaceSource::M => {
                il.is_ccc = flag(path.len() == 3 && path.iter().all(|p| *p == Pick::C));
                il.ended_f = flag(path.get(2) == Some(&Pick::F));
                il.drift_ratio = (3.0 - count(path, Pick::C) as f64) / 3.0;
                IL_WEIGHT_CCC * il.is_ccc + IL_WEIGHT_ENDED_F * il.ended_f + IL_WEIGHT_DRIFT * il.drift_ratio
            }
        };

        il.base = raw.min(IL_BASE_CAP);
        if anchors.contains_family(candidate.face.family()) {
            il.sibling_bonus = IL_SIBLING_BONUS;
        }
        if anchors.is_prize_mirror(candidate.face) {
            il.prize_bonus = IL_PRIZE_BONUS;
        }
        il.total = (il.base + il.sibling_bonus + il.prize_bonus).min(IL_TOTAL_CAP);
        il
    }

    /// Score, rank and cut the shortlist. Deterministic for equal input.
    pub fn build_install_shortlist(
        &self,
        candidates: &[FaceCandidate],
        anchors: &AnchorCandidates,
    ) -> InstallRanking {
        let mut scored: Vec<ScoredFace> = candidates
            .iter()
            .map(|c| ScoredFace {
                face: c.face,
                source: c.source,
                il: self.installed_likelihood_for_face(c, anchors),
            })
            .collect();
        scored.sort_by(rank_order);

        let mut ranked: Vec<ScoredFace> = Vec::with_capacity(scored.len());
        for s in scored {
            if !ranked.iter().any(|r| r.face == s.face) {
                ranked.push(s);
            }
        }

        let mut shortlist: Vec<ScoredFace> = ranked.iter().take(SHORTLIST_SIZE).cloned().collect();
        let diversity_swap = apply_diversity_rule(&mut shortlist, &ranked);

        tracing::debug!(
            candidates = candidates.len(),
            shortlist = ?shortlist.iter().map(|s| s.face.id()).collect::<Vec<_>>(),
            diversity_swap,
            "install shortlist built"
        );
        InstallRanking { ranked, shortlist, diversity_swap }
    }

    /// Shortlist for the current state
    pub fn ranking_for_state(&self, state: &QuizState) -> InstallRanking {
        self.build_install_shortlist(&face_candidates(state), &self.anchor_candidates(state))
    }

    // =========================================================================
    // SECONDARY RESOLUTION
    // =========================================================================

    /// Keep the installed choice unless it collides with the anchor; then try the
    /// shortlist, then the full IL ranking; with no alternative keep the choice.
    pub fn resolve_secondary(
        &self,
        installed_choice: Face,
        anchor_face: Face,
        shortlist: &[Face],
        all_faces_by_il: &[Face],
    ) -> SecondaryResolution {
        if installed_choice != anchor_face {
            return SecondaryResolution { face: installed_choice, source: SecondarySource::Installed };
        }
        if let Some(face) = shortlist.iter().find(|f| **f != anchor_face) {
            return SecondaryResolution { face: *face, source: SecondarySource::Shortlist };
        }
        if let Some(face) = all_faces_by_il.iter().find(|f| **f != anchor_face) {
            return SecondaryResolution { face: *face, source: SecondarySource::Ranked };
        }
        tracing::warn!(face = %installed_choice, "secondary collides with anchor and no alternative exists");
        SecondaryResolution { face: installed_choice, source: SecondarySource::Degraded }
    }

    /// Badge for a secondary face given the counters
    pub fn compute_badge(&self, secondary: Face, counters: &SifCounters) -> (Badge, f64, Option<f64>) {
        let family = secondary.family();
        let instability = counters.instability(family);
        let ratio = counters.stability_ratio(family);
        let badge = if secondary.is_self_mirror() {
            Badge::Aligned
        } else if instability >= BADGE_INSTABILITY_THRESHOLD
            || ratio.map(|r| r < BADGE_STABILITY_RATIO_MIN).unwrap_or(false)
        {
            Badge::InstalledFromOutside
        } else {
            Badge::NotYetAligned
        };
        (badge, instability, ratio)
    }

    /// Primary, resolved Secondary, Prize and badge from the installed choice
    pub fn finalize_sif_with_install(&self, state: &QuizState, anchor_face: Face) -> Result<SifResult, QuizError> {
        let installed = state.installed_choice.ok_or(QuizError::NoInstalledChoice)?;
        let ranking = self.ranking_for_state(state);
        let resolution = self.resolve_secondary(
            installed,
            anchor_face,
            &state.sif_shortlist,
            &ranking.ranked_faces(),
        );
        let secondary = resolution.face;
        let (badge, instability, stability_ratio) = self.compute_badge(secondary, &state.sif_counters);

        let result = SifResult {
            primary_family: anchor_face.family(),
            primary: anchor_face,
            secondary,
            prize: secondary.mirror(),
            badge,
            context: SifContext {
                scorer: ScorerKind::InstalledLikelihood,
                secondary_source: resolution.source,
                instability,
                stability_ratio,
                secondary_il: ranking.ranked.iter().find(|s| s.face == secondary).map(|s| s.il.clone()),
                legacy: None,
            },
        };
        tracing::info!(primary = %result.primary, secondary = %result.secondary, badge = %result.badge, "SIF finalised");
        Ok(result)
    }

    // =========================================================================
    // LEGACY SCORER
    // =========================================================================

    /// score = 0.5·NI + 0.5·SI − 0.1·II
    pub fn legacy_score(&self, face: Face, counters: &SifCounters) -> LegacyScore {
        let family = face.family();
        let face_total = counters.face_c(face) + counters.face_o(face) + counters.face_f(face);
        let ni = counters.face_c(face) / face_total.max(1.0);
        let si = counters.fam_c(family) / (counters.fam_c(family) + counters.fam_o(family)).max(1.0);
        let ii = counters.instability(family);
        LegacyScore {
            face,
            ni,
            si,
            ii,
            score: LEGACY_WEIGHT_NI * ni + LEGACY_WEIGHT_SI * si - LEGACY_WEIGHT_II * ii,
        }
    }

    /// Legacy secondary pick, used when no installed choice exists
    pub fn calculate_sif(&self, state: &QuizState, anchor_face: Face) -> Result<SifResult, QuizError> {
        let mut faces: Vec<Face> = state.lines.iter().filter_map(line_face).collect();
        faces.extend(state.sif_counters.tallied_faces());
        faces.sort();
        faces.dedup();

        let best = faces
            .into_iter()
            .filter(|f| *f != anchor_face)
            .map(|f| self.legacy_score(f, &state.sif_counters))
            .min_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.face.id().cmp(&b.face.id())))
            .ok_or(QuizError::NoSecondaryCandidate)?;

        let secondary = best.face;
        let (badge, instability, stability_ratio) = self.compute_badge(secondary, &state.sif_counters);
        tracing::info!(primary = %anchor_face, secondary = %secondary, score = best.score, "legacy SIF computed");

        Ok(SifResult {
            primary_family: anchor_face.family(),
            primary: anchor_face,
            secondary,
            prize: secondary.mirror(),
            badge,
            context: SifContext {
                scorer: ScorerKind::Legacy,
                secondary_source: SecondarySource::Legacy,
                instability,
                stability_ratio,
                secondary_il: None,
                legacy: Some(best),
            },
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
