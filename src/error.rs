//! Error types for the reconciliation core.
//!
//! Collaborator failures (catalog searches, page sources) are not wrapped here:
//! they surface through the associated `Error` type of the collaborator trait.

use thiserror::Error;

/// Malformed input file. Permanent: the file must be corrected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("The input file is empty.")]
    EmptyInput,

    #[error(
        "Missing required column(s): {}. Expected at least title and artist.",
        .0.join(", ")
    )]
    MissingRequiredColumns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptionsError {
    #[error("minimum score {0} is outside 0.0..=1.0")]
    MinimumScoreOutOfRange(f64),

    #[error("candidate limit must be at least 1")]
    ZeroCandidateLimit,

    #[error("unknown matching strategy '{0}' (expected exact, normalized-exact or fuzzy)")]
    UnknownStrategy(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported session schema version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },

    #[error("no decision for row '{0}'")]
    UnknownRow(String),

    #[error("'{candidate}' is not a candidate for row '{row}'")]
    UnknownCandidate { row: String, candidate: String },
}
