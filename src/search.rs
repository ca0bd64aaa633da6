//! Catalog search boundary and an in-memory implementation.

use std::convert::Infallible;

use rustc_hash::FxHashSet;

use crate::models::{CatalogEntry, Provenance, SourceRow, Tier};
use crate::normalize::normalize;

/// Title/artist/album lookup for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchQuery<'a> {
    pub title: &'a str,
    pub artist: &'a str,
    pub album: Option<&'a str>,
}

impl<'a> SearchQuery<'a> {
    pub fn from_row(row: &'a SourceRow) -> Self {
        Self {
            title: &row.title,
            artist: &row.artist,
            album: row.album.as_deref(),
        }
    }

    /// Queries without a title never reach the underlying source.
    pub fn is_searchable(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// One tier of catalog search (local library, broader catalog).
///
/// Implementations return an empty result for unsearchable queries without
/// touching their backing store.
pub trait CatalogSearch {
    type Error;

    fn search(&self, query: &SearchQuery<'_>, limit: usize)
        -> Result<Vec<CatalogEntry>, Self::Error>;
}

// ============================================================================
// Snapshot Search
// ============================================================================

/// Term search over an in-memory catalog snapshot.
///
/// Entries are ranked by how many query terms occur in their normalized
/// title/artist/album text, ties by ascending id.
pub struct SnapshotSearch {
    entries: Vec<CatalogEntry>,
    haystacks: Vec<String>, // normalized "title artist album", parallel to entries
}

impl SnapshotSearch {
    /// Entries without provenance are stamped with `tier`.
    pub fn new(entries: Vec<CatalogEntry>, tier: Tier) -> Self {
        let entries: Vec<CatalogEntry> = entries
            .into_iter()
            .map(|mut entry| {
                if entry.provenance.is_empty() {
                    entry.provenance = Provenance::for_tier(tier, entry.id.clone());
                }
                entry
            })
            .collect();
        let haystacks = entries
            .iter()
            .map(|e| {
                [
                    normalize(&e.title),
                    normalize(&e.artist),
                    e.album.as_deref().map(normalize).unwrap_or_default(),
                ]
                .join(" ")
            })
            .collect();
        Self { entries, haystacks }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CatalogSearch for SnapshotSearch {
    type Error = Infallible;

    fn search(
        &self,
        query: &SearchQuery<'_>,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>, Infallible> {
        if !query.is_searchable() {
            return Ok(Vec::new());
        }

        let text = format!("{} {}", normalize(query.title), normalize(query.artist));
        let mut seen = FxHashSet::default();
        let terms: Vec<&str> = text
            .split_whitespace()
            .filter(|t| seen.insert(*t))
            .collect();

        let mut ranked: Vec<(&CatalogEntry, usize)> = self
            .entries
            .iter()
            .zip(&self.haystacks)
            .filter_map(|(entry, haystack)| {
                let hits = terms.iter().filter(|t| haystack.contains(**t)).count();
                (hits > 0).then_some((entry, hits))
            })
            .collect();

        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));

        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(entry, _)| entry.clone())
            .collect())
    }
}
