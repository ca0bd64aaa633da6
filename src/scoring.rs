//! Scoring functions for row/catalog matching.
//!
//! This module contains:
//! - Per-strategy scoring (exact, normalized exact, fuzzy)
//! - String similarity on normalized text
//! - The weighted composite scorer (title/artist/album/duration)

use crate::models::{CatalogEntry, SourceRow, Strategy};
use crate::normalize::normalize;

// ============================================================================
// Score Constants
// ============================================================================

/// Raw title and artist are byte-identical
pub const EXACT_SCORE: f64 = 1.0;

/// Normalized title and artist are equal
pub const NORMALIZED_EXACT_SCORE: f64 = 0.99;

/// Fuzzy blend weights
pub const FUZZY_TITLE_WEIGHT: f64 = 0.7;
pub const FUZZY_ARTIST_WEIGHT: f64 = 0.3;

/// Maximum duration difference counted as a match by the weighted scorer
pub const DURATION_TOLERANCE_SECS: u32 = 2;

/// Bounded [0, 1] score with a human-readable explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub value: f64,
    pub rationale: String,
}

impl Score {
    fn new(value: f64, rationale: impl Into<String>) -> Self {
        Self {
            value,
            rationale: rationale.into(),
        }
    }

    fn none() -> Self {
        Self::new(0.0, "No strategy matched")
    }
}

// ============================================================================
// Similarity
// ============================================================================

/// Edit-distance similarity between two already-normalized strings (0.0 to 1.0).
/// Returns 0.0 when either side is empty.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let distance = strsim::levenshtein(a, b);
    let max_len = a.chars().count().max(b.chars().count());
    (1.0 - distance as f64 / max_len as f64).max(0.0)
}

// ============================================================================
// Strategy Scoring
// ============================================================================

fn score_strategy(strategy: Strategy, row: &SourceRow, entry: &CatalogEntry) -> Score {
    match strategy {
        Strategy::Exact => {
            if row.title == entry.title && row.artist == entry.artist {
                Score::new(EXACT_SCORE, "Exact title+artist")
            } else {
                Score::new(0.0, "Exact title+artist differs")
            }
        }
        Strategy::NormalizedExact => {
            if normalize(&row.title) == normalize(&entry.title)
                && normalize(&row.artist) == normalize(&entry.artist)
            {
                Score::new(NORMALIZED_EXACT_SCORE, "Normalized exact title+artist")
            } else {
                Score::new(0.0, "Normalized title+artist differs")
            }
        }
        Strategy::Fuzzy => {
            let title = similarity(&normalize(&row.title), &normalize(&entry.title));
            let artist = similarity(&normalize(&row.artist), &normalize(&entry.artist));
            let value = FUZZY_TITLE_WEIGHT * title + FUZZY_ARTIST_WEIGHT * artist;
            Score::new(
                value,
                format!("Fuzzy title={:.2}, artist={:.2}", title, artist),
            )
        }
    }
}

/// Score a row against a catalog entry, keeping the best strategy.
///
/// Strategies are tried in order and a later strategy only wins with a strictly
/// higher value. An empty strategy list scores as `Exact`.
pub fn score(row: &SourceRow, entry: &CatalogEntry, strategies: &[Strategy]) -> Score {
    const EXACT_ONLY: &[Strategy] = &[Strategy::Exact];
    let strategies = if strategies.is_empty() {
        EXACT_ONLY
    } else {
        strategies
    };

    let mut best = Score::none();
    for &strategy in strategies {
        let candidate = score_strategy(strategy, row, entry);
        if candidate.value > best.value {
            best = candidate;
        }
    }
    best
}

// ============================================================================
// Weighted Composite Scoring
// ============================================================================

/// Attribute weights for [`weighted_score`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub title: f64,
    pub artist: f64,
    pub album: f64,
    pub duration: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            title: 0.5,
            artist: 0.3,
            album: 0.15,
            duration: 0.05,
        }
    }
}

fn indicator(matched: bool) -> f64 {
    if matched {
        1.0
    } else {
        0.0
    }
}

/// Blend per-attribute equality into one score.
///
/// Album and duration only count when both sides carry a value; durations
/// match within [`DURATION_TOLERANCE_SECS`].
pub fn weighted_score(row: &SourceRow, entry: &CatalogEntry, weights: &ScoreWeights) -> Score {
    let title = indicator(normalize(&row.title) == normalize(&entry.title));
    let artist = indicator(normalize(&row.artist) == normalize(&entry.artist));

    let album = match (&row.album, &entry.album) {
        (Some(a), Some(b)) => indicator(normalize(a) == normalize(b)),
        _ => 0.0,
    };

    let duration = match (row.duration_seconds, entry.duration_seconds) {
        (Some(a), Some(b)) => indicator(a.abs_diff(b) <= DURATION_TOLERANCE_SECS),
        _ => 0.0,
    };

    let value = title * weights.title
        + artist * weights.artist
        + album * weights.album
        + duration * weights.duration;

    Score::new(
        value.clamp(0.0, 1.0),
        format!(
            "title={}, artist={}, album={}, duration={}",
            title, artist, album, duration
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, artist: &str) -> CatalogEntry {
        CatalogEntry::new("id", title, artist)
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("", "abc"), 0.0);
        assert_eq!(similarity("abc", ""), 0.0);
        assert_eq!(similarity("", ""), 0.0);
        assert_eq!(similarity("hello", "hello"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_similarity_edit_distance() {
        // one substitution over five characters
        assert!((similarity("hello", "hallo") - 0.8).abs() < 1e-9);
        // one insertion: distance 1, max len 6
        assert!((similarity("hello", "helloo") - (1.0 - 1.0 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn test_exact_strategy() {
        let row = SourceRow::new(2, "Hello", "Artist");
        let s = score(&row, &entry("Hello", "Artist"), &[Strategy::Exact]);
        assert_eq!(s.value, EXACT_SCORE);
        assert_eq!(s.rationale, "Exact title+artist");

        let s = score(&row, &entry("hello", "Artist"), &[Strategy::Exact]);
        assert_eq!(s.value, 0.0);
    }

    #[test]
    fn test_normalized_exact_strategy() {
        let row = SourceRow::new(2, "HELLO (feat. X)", "The Artist!");
        let s = score(&row, &entry("hello", "the artist"), &[Strategy::NormalizedExact]);
        assert_eq!(s.value, NORMALIZED_EXACT_SCORE);
    }

    #[test]
    fn test_fuzzy_strategy() {
        let row = SourceRow::new(2, "Heloo", "Artst");
        let s = score(&row, &entry("Hello", "Artist"), &[Strategy::Fuzzy]);
        // title 4/5 (one substitution), artist 5/6 (one insertion)
        let expected = 0.7 * 0.8 + 0.3 * (1.0 - 1.0 / 6.0);
        assert!((s.value - expected).abs() < 1e-9);
        assert!(s.rationale.starts_with("Fuzzy title=0.80"));
    }

    #[test]
    fn test_best_strategy_wins() {
        let row = SourceRow::new(2, "Hello", "Artist");
        let all = [Strategy::Exact, Strategy::NormalizedExact, Strategy::Fuzzy];
        let s = score(&row, &entry("Hello", "Artist"), &all);
        // later strategies only replace the current best when strictly higher
        assert_eq!(s.value, 1.0);
        assert_eq!(s.rationale, "Exact title+artist");

        // normalized-equal pairs also reach 1.0 through fuzzy, which beats 0.99
        let s = score(&row, &entry("hello!", "artist"), &all);
        assert_eq!(s.value, 1.0);
        assert_eq!(s.rationale, "Fuzzy title=1.00, artist=1.00");

        let without_fuzzy = [Strategy::Exact, Strategy::NormalizedExact];
        let s = score(&row, &entry("hello!", "artist"), &without_fuzzy);
        assert_eq!(s.value, NORMALIZED_EXACT_SCORE);
    }

    #[test]
    fn test_empty_strategies_mean_exact() {
        let row = SourceRow::new(2, "Hello", "Artist");
        assert_eq!(score(&row, &entry("Hello", "Artist"), &[]).value, 1.0);
        assert_eq!(score(&row, &entry("hello", "artist"), &[]).value, 0.0);
    }

    #[test]
    fn test_score_never_negative() {
        let row = SourceRow::new(2, "!!!", "???");
        let all = [Strategy::Exact, Strategy::NormalizedExact, Strategy::Fuzzy];
        let s = score(&row, &entry("Completely", "Different"), &all);
        assert!(s.value >= 0.0);
    }

    #[test]
    fn test_weighted_score_all_attributes() {
        let mut row = SourceRow::new(2, "Song", "Artist");
        row.album = Some("Album".to_string());
        row.duration_seconds = Some(200);
        let mut e = entry("song", "artist");
        e.album = Some("ALBUM".to_string());
        e.duration_seconds = Some(202);

        let s = weighted_score(&row, &e, &ScoreWeights::default());
        assert!((s.value - 1.0).abs() < 1e-9);
        assert_eq!(s.rationale, "title=1, artist=1, album=1, duration=1");
    }

    #[test]
    fn test_weighted_score_requires_both_sides() {
        let mut row = SourceRow::new(2, "Song", "Artist");
        row.duration_seconds = Some(200);
        let mut e = entry("Song", "Artist");
        e.album = Some("Album".to_string());
        e.duration_seconds = Some(203);

        let s = weighted_score(&row, &e, &ScoreWeights::default());
        assert!((s.value - 0.8).abs() < 1e-9);
    }
}
