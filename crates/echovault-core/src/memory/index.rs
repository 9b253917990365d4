//! Vector index trait.
//!
//! Defines the interface for nearest-neighbor search over stored
//! (document, embedding) pairs. The implementation (LanceDB) lives in
//! echovault-infra.

use echovault_types::context::{ContextDocument, ScoredDocument};
use echovault_types::error::RepositoryError;

/// Trait for vector-indexed document storage with similarity search.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait ContextIndex: Send + Sync {
    /// Store a document with its embedding.
    ///
    /// An existing document with the same id is replaced, so re-indexing a
    /// summary for the same conversation row is idempotent.
    fn upsert(
        &self,
        document: &ContextDocument,
        embedding: &[f32],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Search for the `limit` documents nearest to the query embedding.
    ///
    /// Results are ranked by ascending distance (closest first).
    fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<ScoredDocument>, RepositoryError>> + Send;

    /// Count all indexed documents.
    fn count(
        &self,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
