//! trackmatch library - track list import and catalog reconciliation.

pub mod cancel;
pub mod error;
pub mod importer;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod resolve;
pub mod safety;
pub mod scoring;
pub mod search;
pub mod session;
pub mod snapshot;
pub mod sqlite;

pub use cancel::{CancellationToken, Completion};
pub use error::{ImportError, OptionsError, SessionError};
pub use models::{
    CatalogEntry, Decision, ImportSummary, MatchCandidate, MatchDecision, MatchStatus,
    MatchingOptions, Provenance, SourceRow, Strategy, Tier,
};
