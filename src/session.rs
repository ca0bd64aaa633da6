//! Import session aggregate and its versioned JSON envelope.
//!
//! A session is assembled once every row has a decision. Manual resolution
//! later amends single decisions in place; the row list never changes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SessionError;
use crate::models::{Decision, ImportSummary, MatchDecision, MatchingOptions, SourceRow};

/// Current envelope schema version
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSession {
    pub options: MatchingOptions,
    pub rows: Vec<SourceRow>,
    pub decisions: Vec<MatchDecision>, // one per row, same order
    pub summary: ImportSummary,
}

/// Manual resolution of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Amendment {
    /// Pick one of the row's candidates by entry id
    Select(String),
    Skip,
}

pub fn build_session(
    rows: Vec<SourceRow>,
    decisions: Vec<MatchDecision>,
    options: MatchingOptions,
) -> ImportSession {
    let summary = ImportSummary::from_decisions(&decisions);
    ImportSession {
        options,
        rows,
        decisions,
        summary,
    }
}

impl ImportSession {
    pub fn decision(&self, row_id: &str) -> Option<&MatchDecision> {
        self.decisions.iter().find(|d| d.row_id == row_id)
    }

    /// Apply a manual resolution and refresh the summary.
    pub fn amend(&mut self, row_id: &str, amendment: Amendment) -> Result<(), SessionError> {
        let decision = self
            .decisions
            .iter_mut()
            .find(|d| d.row_id == row_id)
            .ok_or_else(|| SessionError::UnknownRow(row_id.to_string()))?;

        decision.decision = match amendment {
            Amendment::Select(entry_id) => {
                let candidate = decision
                    .candidates
                    .iter()
                    .find(|c| c.entry.id == entry_id)
                    .ok_or_else(|| SessionError::UnknownCandidate {
                        row: row_id.to_string(),
                        candidate: entry_id.clone(),
                    })?;
                decision.confidence = candidate.score;
                Decision::UserMatched {
                    selected: candidate.entry.clone(),
                }
            }
            Amendment::Skip => Decision::Skipped,
        };
        debug!(row = row_id, status = ?decision.status(), "decision amended");

        self.summary = ImportSummary::from_decisions(&self.decisions);
        Ok(())
    }
}

// ============================================================================
// Envelope
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnvelope {
    pub schema_version: u32,
    pub session: ImportSession,
}

impl SessionEnvelope {
    pub fn new(session: ImportSession) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            session,
        }
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let envelope: SessionEnvelope = serde_json::from_str(json)?;
        if envelope.schema_version != SCHEMA_VERSION {
            return Err(SessionError::UnsupportedSchema {
                found: envelope.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::match_all;
    use crate::models::{CatalogEntry, MatchStatus, Provenance, Strategy, Tier};

    fn sample() -> ImportSession {
        let rows = vec![
            SourceRow::new(2, "Hello", "Artist"),
            SourceRow::new(3, "Heloo", "Artst"),
            SourceRow::new(4, "Nothing", "Nobody"),
        ];
        let mut both = CatalogEntry::new("lib-1", "Hello", "Artist");
        both.provenance = Provenance {
            local_id: Some("lib-1".to_string()),
            broader_id: Some("cat-1".to_string()),
        };
        let catalog = vec![both, CatalogEntry::from_tier(Tier::Broader, "cat-2", "Help", "Artist")];
        let options = MatchingOptions {
            minimum_score: 0.95,
            ..MatchingOptions::default()
        };
        let decisions = match_all(&rows, &catalog, &options);
        build_session(rows, decisions, options)
    }

    #[test]
    fn test_build_session_summary() {
        let session = sample();
        assert_eq!(session.summary.total, 3);
        assert_eq!(session.summary.auto_matched, 1);
        assert_eq!(session.summary.unmatched, 2);
        assert_eq!(session.rows.len(), session.decisions.len());
    }

    #[test]
    fn test_amend_select_candidate() {
        let mut session = sample();
        session
            .amend("row-3", Amendment::Select("lib-1".to_string()))
            .unwrap();

        let decision = session.decision("row-3").unwrap();
        assert_eq!(decision.status(), MatchStatus::UserMatched);
        assert_eq!(decision.selected().unwrap().id, "lib-1");
        assert_eq!(decision.broader_id(), Some("cat-1"));
        assert_eq!(session.summary.unmatched, 1);
        assert_eq!(session.rows.len(), 3);
    }

    #[test]
    fn test_amend_skip() {
        let mut session = sample();
        session.amend("row-4", Amendment::Skip).unwrap();
        assert_eq!(session.decision("row-4").unwrap().status(), MatchStatus::Skipped);
        assert!(session.decision("row-4").unwrap().selected().is_none());
    }

    #[test]
    fn test_amend_rejects_unknown_row_and_candidate() {
        let mut session = sample();
        assert!(matches!(
            session.amend("row-99", Amendment::Skip),
            Err(SessionError::UnknownRow(_))
        ));
        assert!(matches!(
            session.amend("row-3", Amendment::Select("nope".to_string())),
            Err(SessionError::UnknownCandidate { .. })
        ));
        // failed amendment leaves the decision alone
        assert_eq!(session.decision("row-3").unwrap().status(), MatchStatus::Unmatched);
    }

    #[test]
    fn test_envelope_round_trip_keeps_identifiers() {
        let mut session = sample();
        session
            .amend("row-3", Amendment::Select("cat-2".to_string()))
            .unwrap();
        let envelope = SessionEnvelope::new(session);

        let json = envelope.to_json().unwrap();
        let decoded = SessionEnvelope::from_json(&json).unwrap();

        assert_eq!(decoded, envelope);
        let auto = decoded.session.decision("row-2").unwrap();
        assert_eq!(auto.local_id(), Some("lib-1"));
        assert_eq!(auto.broader_id(), Some("cat-1"));
        let user = decoded.session.decision("row-3").unwrap();
        assert_eq!(user.local_id(), None);
        assert_eq!(user.broader_id(), Some("cat-2"));
    }

    #[test]
    fn test_envelope_round_trip_keeps_exact_fuzzy_scores() {
        let words = [
            "Yellow", "Clocks", "Fix You", "Paradise", "Viva la Vida", "Trouble",
            "The Scientist", "Speed of Sound", "Magic", "Adventure of a Lifetime",
        ];
        let artists = ["Coldplay", "Cold Play", "Coldplayers", "Chris Martin"];
        let rows: Vec<SourceRow> = words
            .iter()
            .zip(artists.iter().cycle())
            .enumerate()
            .map(|(i, (title, artist))| SourceRow::new(i + 2, *title, *artist))
            .collect();
        let catalog: Vec<CatalogEntry> = words
            .iter()
            .flat_map(|title| artists.iter().map(move |artist| (title, artist)))
            .enumerate()
            .map(|(i, (title, artist))| {
                CatalogEntry::from_tier(Tier::Local, format!("lib-{:03}", i), format!("{}s", title), *artist)
            })
            .collect();
        let options = MatchingOptions {
            strategies: vec![Strategy::Fuzzy],
            minimum_score: 1.0,
            candidate_limit: catalog.len(),
        };
        let decisions = match_all(&rows, &catalog, &options);
        let envelope = SessionEnvelope::new(build_session(rows, decisions, options));

        let decoded = SessionEnvelope::from_json(&envelope.to_json().unwrap()).unwrap();

        let scores = |e: &SessionEnvelope| -> Vec<u64> {
            e.session
                .decisions
                .iter()
                .flat_map(|d| d.candidates.iter().map(|c| c.score.to_bits()))
                .collect()
        };
        assert!(scores(&envelope).len() > 100);
        assert_eq!(scores(&decoded), scores(&envelope));
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_score_survives_json_bit_for_bit() {
        let score = 0.20516292811814138_f64;
        let json = serde_json::to_string(&score).unwrap();
        let decoded: f64 = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.to_bits(), score.to_bits());
    }

    #[test]
    fn test_envelope_rejects_unknown_schema() {
        let mut value = serde_json::to_value(SessionEnvelope::new(sample())).unwrap();
        value["schemaVersion"] = serde_json::json!(2);
        let err = SessionEnvelope::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::UnsupportedSchema {
                found: 2,
                expected: 1
            }
        ));
    }
}
