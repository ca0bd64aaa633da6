//! Core data models for track reconciliation.
//!
//! This module contains the rows parsed from user input, the catalog entries
//! they are matched against, and the decisions produced by the matcher.

use serde::{Deserialize, Serialize};

use crate::error::OptionsError;

// ============================================================================
// Source Rows
// ============================================================================

/// One parsed line from the input file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRow {
    pub id: String, // "row-<line>", stable across re-imports of the same file
    pub line: usize, // 1-based position among non-blank lines (header = 1)
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub duration_seconds: Option<u32>,
    pub isrc: Option<String>,
}

impl SourceRow {
    pub fn new(line: usize, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: format!("row-{}", line),
            line,
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration_seconds: None,
            isrc: None,
        }
    }
}

// ============================================================================
// Catalog Models
// ============================================================================

/// Search scope an identifier was surfaced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier {
    Local,
    Broader,
}

/// Identifiers of a catalog entry in each tier it was found in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broader_id: Option<String>,
}

impl Provenance {
    pub fn for_tier(tier: Tier, id: impl Into<String>) -> Self {
        match tier {
            Tier::Local => Self {
                local_id: Some(id.into()),
                broader_id: None,
            },
            Tier::Broader => Self {
                local_id: None,
                broader_id: Some(id.into()),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.local_id.is_none() && self.broader_id.is_none()
    }

    /// Local identifier when present, otherwise the broader one.
    pub fn primary_id(&self) -> Option<&str> {
        self.local_id.as_deref().or(self.broader_id.as_deref())
    }

    /// Builds a new provenance keeping our identifiers and filling gaps from `other`.
    pub fn merged_with(&self, other: &Provenance) -> Provenance {
        Provenance {
            local_id: self.local_id.clone().or_else(|| other.local_id.clone()),
            broader_id: self.broader_id.clone().or_else(|| other.broader_id.clone()),
        }
    }
}

/// One track from an external catalog usable as a match target.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String, // Opaque, unique within one catalog snapshot
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub isrc: Option<String>,
    #[serde(default, skip_serializing_if = "Provenance::is_empty")]
    pub provenance: Provenance,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration_seconds: None,
            isrc: None,
            provenance: Provenance::default(),
        }
    }

    /// Entry surfaced by a single tier: the identifier doubles as the tier id.
    pub fn from_tier(
        tier: Tier,
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let mut entry = Self::new(id.clone(), title, artist);
        entry.provenance = Provenance::for_tier(tier, id);
        entry
    }

    /// Builds a new entry joining `other`'s identifiers and filling missing
    /// metadata from it. Title and artist stay ours.
    pub fn merged_with(&self, other: &CatalogEntry) -> CatalogEntry {
        let provenance = self.provenance.merged_with(&other.provenance);
        let id = provenance
            .primary_id()
            .map(str::to_string)
            .unwrap_or_else(|| self.id.clone());
        CatalogEntry {
            id,
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone().or_else(|| other.album.clone()),
            duration_seconds: self.duration_seconds.or(other.duration_seconds),
            isrc: self.isrc.clone().or_else(|| other.isrc.clone()),
            provenance,
        }
    }
}

// ============================================================================
// Matching Options
// ============================================================================

/// One similarity-computation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    Exact,
    NormalizedExact,
    Fuzzy,
}

impl std::str::FromStr for Strategy {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "exact" => Ok(Strategy::Exact),
            "normalizedexact" | "normalized" => Ok(Strategy::NormalizedExact),
            "fuzzy" => Ok(Strategy::Fuzzy),
            _ => Err(OptionsError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Per-call matching configuration. `Default` is the baseline callers copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingOptions {
    pub strategies: Vec<Strategy>,
    pub minimum_score: f64,
    pub candidate_limit: usize,
}

impl Default for MatchingOptions {
    fn default() -> Self {
        Self {
            strategies: vec![Strategy::Exact, Strategy::NormalizedExact, Strategy::Fuzzy],
            minimum_score: 0.75,
            candidate_limit: 5,
        }
    }
}

impl MatchingOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if !(0.0..=1.0).contains(&self.minimum_score) {
            return Err(OptionsError::MinimumScoreOutOfRange(self.minimum_score));
        }
        if self.candidate_limit == 0 {
            return Err(OptionsError::ZeroCandidateLimit);
        }
        Ok(())
    }
}

// ============================================================================
// Match Results
// ============================================================================

/// A catalog entry scored against a row during a single match attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub entry: CatalogEntry,
    pub score: f64, // 0.0 to 1.0
    pub rationale: String,
}

/// Flat status view of a [`Decision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchStatus {
    Unmatched,
    AutoMatched,
    UserMatched,
    Skipped,
}

/// Outcome of matching one row. Only the matched variants carry a selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Decision {
    Unmatched,
    AutoMatched { selected: CatalogEntry },
    UserMatched { selected: CatalogEntry },
    Skipped,
}

impl Decision {
    pub fn status(&self) -> MatchStatus {
        match self {
            Decision::Unmatched => MatchStatus::Unmatched,
            Decision::AutoMatched { .. } => MatchStatus::AutoMatched,
            Decision::UserMatched { .. } => MatchStatus::UserMatched,
            Decision::Skipped => MatchStatus::Skipped,
        }
    }

    pub fn selected(&self) -> Option<&CatalogEntry> {
        match self {
            Decision::AutoMatched { selected } | Decision::UserMatched { selected } => {
                Some(selected)
            }
            Decision::Unmatched | Decision::Skipped => None,
        }
    }
}

/// Per-row decision with its ranked candidates.
///
/// ## Invariants
///
/// - `candidates` is sorted by score descending, ties by ascending entry id,
///   and never longer than the `candidate_limit` it was produced with.
/// - `AutoMatched` implies the selected entry scored at least `minimum_score`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDecision {
    pub row_id: String,
    pub decision: Decision,
    pub candidates: Vec<MatchCandidate>,
    pub confidence: f64,
    pub rationale: String,
}

impl MatchDecision {
    pub fn status(&self) -> MatchStatus {
        self.decision.status()
    }

    pub fn selected(&self) -> Option<&CatalogEntry> {
        self.decision.selected()
    }

    pub fn local_id(&self) -> Option<&str> {
        self.selected()
            .and_then(|e| e.provenance.local_id.as_deref())
    }

    pub fn broader_id(&self) -> Option<&str> {
        self.selected()
            .and_then(|e| e.provenance.broader_id.as_deref())
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Decision counts for an import session.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total: usize,
    pub auto_matched: usize,
    pub unmatched: usize,
}

impl ImportSummary {
    pub fn from_decisions(decisions: &[MatchDecision]) -> Self {
        let mut summary = ImportSummary {
            total: decisions.len(),
            ..Default::default()
        };
        for decision in decisions {
            match decision.status() {
                MatchStatus::AutoMatched => summary.auto_matched += 1,
                MatchStatus::Unmatched => summary.unmatched += 1,
                MatchStatus::UserMatched | MatchStatus::Skipped => {}
            }
        }
        summary
    }

    /// Calculate auto-match rate as a percentage
    pub fn match_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.auto_matched as f64 / self.total as f64
        }
    }
}
