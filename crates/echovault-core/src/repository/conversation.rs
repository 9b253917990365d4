//! Conversation repository trait.

use echovault_types::conversation::{ConversationRecord, NewConversation};
use echovault_types::error::RepositoryError;

/// Trait for durable conversation storage.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in echovault-infra.
pub trait ConversationRepository: Send + Sync {
    /// Insert one conversation and return its system-assigned id.
    ///
    /// Ids are monotonic and never reused.
    fn insert(
        &self,
        conversation: &NewConversation,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    /// Fetch a conversation by id.
    fn get(
        &self,
        id: i64,
    ) -> impl std::future::Future<Output = Result<Option<ConversationRecord>, RepositoryError>> + Send;

    /// The most recently stored conversations, newest first.
    fn list_recent(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationRecord>, RepositoryError>> + Send;

    /// Count all stored conversations.
    fn count(
        &self,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
