use thiserror::Error;

/// Errors rejecting an inbound end-of-call report.
///
/// The first three variants are client input errors and occur before any
/// write; `Storage` surfaces a failed relational insert.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid payload structure or type is not 'end-of-call-report'")]
    NotEndOfCallReport,

    #[error("missing transcript in payload")]
    MissingTranscript,

    #[error("invalid '{field}' timestamp: {message}")]
    InvalidTimestamp { field: &'static str, message: String },

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl IngestError {
    /// Whether this rejection is the caller's fault (maps to a 4xx response).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, IngestError::Storage(_))
    }
}

/// Errors answering a context retrieval query.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("missing 'query' in request")]
    MissingQuery,

    #[error("search error: {0}")]
    Search(#[from] RepositoryError),
}

/// Errors from repository, embedder, and index adapters (used by the trait
/// definitions in echovault-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}
