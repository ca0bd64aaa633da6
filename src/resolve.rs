//! Two-tier resolution: local catalog first, broader catalog as fallback.
//!
//! ## Policy
//!
//! 1. Search the local tier (bounded by `candidate_limit`) and run the results
//!    through the matcher.
//! 2. If that auto-matched, or the local search returned anything at all, the
//!    local decision stands, even when every local result scored below the
//!    threshold.
//! 3. Only an empty local result set triggers the broader search, whose
//!    decision is returned instead.
//!
//! Results that share an identifier are joined into one entry carrying both
//! the local and the broader id before matching.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, warn};

use crate::cancel::{CancellationToken, Completion};
use crate::matcher::match_row;
use crate::models::{CatalogEntry, MatchDecision, MatchStatus, MatchingOptions, SourceRow};
use crate::search::{CatalogSearch, SearchQuery};

/// Join key: identifiers only collide within the same namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdKey {
    Local(String),
    Broader(String),
    Opaque(String),
}

fn id_keys(entry: &CatalogEntry) -> Vec<IdKey> {
    let mut keys = Vec::with_capacity(2);
    if let Some(id) = &entry.provenance.local_id {
        keys.push(IdKey::Local(id.clone()));
    }
    if let Some(id) = &entry.provenance.broader_id {
        keys.push(IdKey::Broader(id.clone()));
    }
    if keys.is_empty() && !entry.id.is_empty() {
        keys.push(IdKey::Opaque(entry.id.clone()));
    }
    keys
}

/// Join search results that share a local or broader identifier (case-sensitive).
///
/// The join is transitive: an entry carrying ids from two earlier results folds
/// both into the earlier slot. The first occurrence keeps its position and
/// metadata; later duplicates only contribute identifiers and missing fields.
/// Results without any identifier are dropped.
pub fn merge_by_identifier(entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    let mut merged: Vec<Option<CatalogEntry>> = Vec::with_capacity(entries.len());
    let mut slots: FxHashMap<IdKey, usize> = FxHashMap::default();

    for entry in entries {
        let keys = id_keys(&entry);
        if keys.is_empty() {
            warn!(title = %entry.title, artist = %entry.artist, "dropping search result without identifier");
            continue;
        }

        let mut hits: Vec<usize> = keys.iter().filter_map(|k| slots.get(k).copied()).collect();
        hits.sort_unstable();
        hits.dedup();

        let Some((&target, folded)) = hits.split_first() else {
            let slot = merged.len();
            for key in keys {
                slots.insert(key, slot);
            }
            merged.push(Some(entry));
            continue;
        };

        let mut joined = match merged[target].take() {
            Some(existing) => existing.merged_with(&entry),
            None => entry.clone(),
        };
        for &slot in folded {
            if let Some(other) = merged[slot].take() {
                joined = joined.merged_with(&other);
            }
        }
        for slot in slots.values_mut() {
            if folded.contains(slot) {
                *slot = target;
            }
        }
        for key in keys.into_iter().chain(id_keys(&joined)) {
            slots.insert(key, target);
        }
        merged[target] = Some(joined);
    }

    assign_canonical_ids(merged.into_iter().flatten().collect())
}

/// Canonical id: local when known, otherwise broader. An id already taken by an
/// earlier result is qualified with its tier (`broader:x`).
fn assign_canonical_ids(mut entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    let mut taken: FxHashSet<String> = FxHashSet::default();
    for entry in &mut entries {
        if let Some(primary) = entry.provenance.primary_id() {
            entry.id = primary.to_string();
        }
        if !taken.insert(entry.id.clone()) {
            let tier = if entry.provenance.local_id.is_some() {
                "local"
            } else if entry.provenance.broader_id.is_some() {
                "broader"
            } else {
                "entry"
            };
            entry.id = format!("{}:{}", tier, entry.id);
            taken.insert(entry.id.clone());
        }
    }
    entries
}

pub struct Resolver<L, B> {
    local: L,
    broader: B,
}

impl<L, B, E> Resolver<L, B>
where
    L: CatalogSearch<Error = E>,
    B: CatalogSearch<Error = E>,
{
    pub fn new(local: L, broader: B) -> Self {
        Self { local, broader }
    }

    fn evaluate(
        &self,
        row: &SourceRow,
        options: &MatchingOptions,
        results: Vec<CatalogEntry>,
    ) -> MatchDecision {
        let entries = merge_by_identifier(results);
        match_row(row, &entries, options)
    }

    /// Resolve one row. Collaborator errors are returned unmodified; there is
    /// exactly one search per tier and no retry.
    pub fn resolve(&self, row: &SourceRow, options: &MatchingOptions) -> Result<MatchDecision, E> {
        let query = SearchQuery::from_row(row);

        let local_results = self.local.search(&query, options.candidate_limit)?;
        let local_found = !local_results.is_empty();
        let local_decision = self.evaluate(row, options, local_results);

        if local_decision.status() != MatchStatus::Unmatched || local_found {
            debug!(row = %row.id, status = ?local_decision.status(), "resolved from local tier");
            return Ok(local_decision);
        }

        let broader_results = self.broader.search(&query, options.candidate_limit)?;
        let decision = self.evaluate(row, options, broader_results);
        debug!(row = %row.id, status = ?decision.status(), "resolved from broader tier");
        Ok(decision)
    }

    /// Resolve rows one after another, checking `cancel` between rows.
    ///
    /// `on_progress` receives the number of rows resolved so far. Stops at the
    /// first collaborator error.
    pub fn resolve_all<F>(
        &self,
        rows: &[SourceRow],
        options: &MatchingOptions,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<Completion<Vec<MatchDecision>>, E>
    where
        F: FnMut(usize),
    {
        let mut decisions = Vec::with_capacity(rows.len());
        for row in rows {
            if cancel.is_cancelled() {
                info!(resolved = decisions.len(), total = rows.len(), "resolution cancelled");
                return Ok(Completion::Cancelled);
            }
            decisions.push(self.resolve(row, options)?);
            on_progress(decisions.len());
        }
        info!(rows = decisions.len(), "resolution complete");
        Ok(Completion::Finished(decisions))
    }
}
