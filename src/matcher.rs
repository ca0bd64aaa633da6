//! Matcher pipeline: rank catalog entries for a row and decide.
//!
//! Matching is per-row and greedy: each row picks its own best entry, and two
//! rows may select the same catalog entry.

use std::cmp::Ordering;

use rayon::prelude::*;
use tracing::debug;

use crate::models::{
    CatalogEntry, Decision, MatchCandidate, MatchDecision, MatchingOptions, SourceRow,
};
use crate::scoring::{score, Score};

/// Highest score first, ties by ascending entry id.
fn rank(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.entry.id.cmp(&b.entry.id))
}

/// Match a row using the strategies in `options`.
pub fn match_row(
    row: &SourceRow,
    entries: &[CatalogEntry],
    options: &MatchingOptions,
) -> MatchDecision {
    match_row_with(row, entries, options, |row, entry| {
        score(row, entry, &options.strategies)
    })
}

/// Match a row with a caller-supplied scorer (e.g. [`crate::scoring::weighted_score`]).
///
/// `options.strategies` is ignored here; threshold and candidate limit still apply.
pub fn match_row_with<F>(
    row: &SourceRow,
    entries: &[CatalogEntry],
    options: &MatchingOptions,
    scorer: F,
) -> MatchDecision
where
    F: Fn(&SourceRow, &CatalogEntry) -> Score,
{
    let mut candidates: Vec<MatchCandidate> = entries
        .iter()
        .filter_map(|entry| {
            let Score { value, rationale } = scorer(row, entry);
            (value > 0.0).then(|| MatchCandidate {
                entry: entry.clone(),
                score: value,
                rationale,
            })
        })
        .collect();

    candidates.sort_by(rank);
    candidates.truncate(options.candidate_limit);

    let Some(best) = candidates.first() else {
        debug!(row = %row.id, "no candidates");
        return MatchDecision {
            row_id: row.id.clone(),
            decision: Decision::Unmatched,
            candidates,
            confidence: 0.0,
            rationale: "No candidates".to_string(),
        };
    };

    if best.score >= options.minimum_score {
        debug!(row = %row.id, entry = %best.entry.id, score = best.score, "auto-matched");
        let selected = best.entry.clone();
        let confidence = best.score;
        let rationale = best.rationale.clone();
        return MatchDecision {
            row_id: row.id.clone(),
            decision: Decision::AutoMatched { selected },
            candidates,
            confidence,
            rationale,
        };
    }

    debug!(
        row = %row.id,
        best = best.score,
        candidates = candidates.len(),
        "below minimum score"
    );
    let confidence = best.score;
    MatchDecision {
        row_id: row.id.clone(),
        decision: Decision::Unmatched,
        candidates,
        confidence,
        rationale: format!("Below minimum score {}", options.minimum_score),
    }
}

/// Match every row against an in-memory catalog snapshot.
/// Rows are independent, so they are scored in parallel; output order follows `rows`.
pub fn match_all(
    rows: &[SourceRow],
    catalog: &[CatalogEntry],
    options: &MatchingOptions,
) -> Vec<MatchDecision> {
    rows.par_iter()
        .map(|row| match_row(row, catalog, options))
        .collect()
}

/// [`match_all`] with a caller-supplied scorer.
pub fn match_all_with<F>(
    rows: &[SourceRow],
    catalog: &[CatalogEntry],
    options: &MatchingOptions,
    scorer: F,
) -> Vec<MatchDecision>
where
    F: Fn(&SourceRow, &CatalogEntry) -> Score + Sync,
{
    rows.par_iter()
        .map(|row| match_row_with(row, catalog, options, &scorer))
        .collect()
}
