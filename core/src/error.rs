use thiserror::Error;

#[derive(Error, Debug)]
pub enum RfvError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error on '{query}' page {page}: {message}")]
    Transport {
        query:   String,
        page:    u32,
        message: String,
    },

    #[error("Page {page} of '{query}' timed out after {after_ms} ms")]
    PageTimeout {
        query:    String,
        page:     u32,
        after_ms: u64,
    },

    /// The very first page failed: nothing was retrieved at all.
    /// Distinct from a successful query that matched zero rows.
    #[error("No data retrieved for '{query}': {reason}")]
    NoData { query: String, reason: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RfvResult<T> = Result<T, RfvError>;
