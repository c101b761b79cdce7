//! Error types for the reflection engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type ReverieResult<T> = Result<T, ReverieError>;

/// Errors surfaced by the reflection engine.
///
/// Only configuration problems live here. Classifier failures degrade to
/// `neutral`, pool exhaustion is a normal Terminal response, and crisis
/// escalation is a normal control-flow outcome (see `Response`).
#[derive(Error, Debug)]
pub enum ReverieError {
    /// No bank file exists for the category and no fallback is configured.
    #[error("no question bank for category '{0}' and no fallback configured")]
    BankNotFound(String),

    /// A bank file exists but violates the schema (duplicate ids, empty
    /// prompt_variants, or unparseable JSON).
    #[error("malformed question bank '{category}': {reason}")]
    MalformedBank { category: String, reason: String },

    #[error("bank I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}
