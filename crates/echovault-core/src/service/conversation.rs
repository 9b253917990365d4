//! Conversation ingestion and context retrieval service.
//!
//! Orchestrates the two halves of the system: persisting end-of-call
//! reports (relational write first, then best-effort summary indexing) and
//! answering similarity queries against the vector index.

use echovault_types::context::{ContextDocument, ScoredDocument};
use echovault_types::conversation::{ConversationRecord, EndOfCallReport};
use echovault_types::error::{ContextError, IngestError, RepositoryError};

use crate::memory::embedder::Embedder;
use crate::memory::index::ContextIndex;
use crate::repository::conversation::ConversationRepository;

/// Service orchestrating conversation ingestion and context retrieval.
///
/// Generic over the repository, embedder, and index traits to maintain
/// clean architecture -- echovault-core never depends on echovault-infra.
pub struct ConversationService<R: ConversationRepository, E: Embedder, V: ContextIndex> {
    repo: R,
    embedder: E,
    index: V,
    search_limit: usize,
}

impl<R: ConversationRepository, E: Embedder, V: ContextIndex> ConversationService<R, E, V> {
    /// Create a new ConversationService.
    ///
    /// - `repo`: durable conversation storage (the source of truth)
    /// - `embedder`: text-to-vector conversion
    /// - `index`: nearest-neighbor search over indexed documents
    /// - `search_limit`: how many hits a retrieval query returns
    pub fn new(repo: R, embedder: E, index: V, search_limit: usize) -> Self {
        Self {
            repo,
            embedder,
            index,
            search_limit,
        }
    }

    /// Validate and persist an end-of-call report.
    ///
    /// The relational insert commits before indexing so the new row id is
    /// available for the summary document key. If the report carries a
    /// summary, it is embedded and upserted into the index afterwards;
    /// failure there is logged and swallowed -- the record write is
    /// authoritative and the index is a rebuildable cache.
    ///
    /// Returns the new conversation id.
    pub async fn store_report(&self, report: EndOfCallReport) -> Result<i64, IngestError> {
        let conversation = report.into_new_conversation()?;
        let summary = conversation.summary.clone();

        let db_id = self.repo.insert(&conversation).await?;

        if let Some(summary) = summary {
            if let Err(e) = self.index_summary(db_id, &summary).await {
                tracing::error!(db_id, error = %e, "failed to embed or index summary");
            }
        }

        Ok(db_id)
    }

    /// The `limit` indexed documents most similar to the query, closest
    /// first.
    ///
    /// A missing or whitespace-only query is rejected before the embedder
    /// or index is touched. No side effects.
    pub async fn retrieve_context(
        &self,
        query: &str,
    ) -> Result<Vec<ScoredDocument>, ContextError> {
        if query.trim().is_empty() {
            return Err(ContextError::MissingQuery);
        }

        let embedding = self.embed_one(query).await?;
        let hits = self.index.search(&embedding, self.search_limit).await?;
        Ok(hits)
    }

    /// Index an ad-hoc text snippet not tied to a conversation row.
    ///
    /// Returns the generated document id.
    pub async fn index_snippet(&self, text: &str) -> Result<String, RepositoryError> {
        let embedding = self.embed_one(text).await?;
        let document = ContextDocument::snippet(text);
        self.index.upsert(&document, &embedding).await?;
        Ok(document.id)
    }

    /// Fetch a stored conversation by id.
    pub async fn conversation(
        &self,
        id: i64,
    ) -> Result<Option<ConversationRecord>, RepositoryError> {
        self.repo.get(id).await
    }

    /// The most recently stored conversations, newest first.
    pub async fn recent_conversations(
        &self,
        limit: u32,
    ) -> Result<Vec<ConversationRecord>, RepositoryError> {
        self.repo.list_recent(limit).await
    }

    /// Count of stored conversations.
    pub async fn conversation_count(&self) -> Result<u64, RepositoryError> {
        self.repo.count().await
    }

    /// Count of indexed documents.
    pub async fn document_count(&self) -> Result<u64, RepositoryError> {
        self.index.count().await
    }

    async fn index_summary(&self, db_id: i64, summary: &str) -> Result<(), RepositoryError> {
        let embedding = self.embed_one(summary).await?;
        let document = ContextDocument::summary(db_id, summary);
        self.index.upsert(&document, &embedding).await
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RepositoryError> {
        let texts = [text.to_string()];
        let mut vectors = self.embedder.embed(&texts).await?;
        if vectors.is_empty() {
            return Err(RepositoryError::Query(
                "embedder returned no vectors".to_string(),
            ));
        }
        Ok(vectors.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echovault_types::context::DocumentSource;
    use echovault_types::conversation::NewConversation;

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // -----------------------------------------------------------------------
    // Stubs
    // -----------------------------------------------------------------------

    const STUB_DIMENSION: usize = 16;

    /// Deterministic embedding: identical strings map to identical vectors.
    fn hash_embed(text: &str) -> Vec<f32> {
        use std::hash::{DefaultHasher, Hash, Hasher};

        let mut vec = Vec::with_capacity(STUB_DIMENSION);
        for i in 0..STUB_DIMENSION {
            let mut hasher = DefaultHasher::new();
            (text, i).hash(&mut hasher);
            vec.push((hasher.finish() % 2000) as f32 / 1000.0 - 1.0);
        }
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vec.iter_mut() {
                *v /= norm;
            }
        }
        vec
    }

    fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
        if na == 0.0 || nb == 0.0 {
            return 1.0;
        }
        1.0 - dot / (na * nb)
    }

    #[derive(Default)]
    struct StubRepository {
        rows: Mutex<Vec<NewConversation>>,
    }

    impl ConversationRepository for StubRepository {
        async fn insert(&self, conversation: &NewConversation) -> Result<i64, RepositoryError> {
            let mut rows = self.rows.lock().unwrap();
            rows.push(conversation.clone());
            Ok(rows.len() as i64)
        }

        async fn get(&self, id: i64) -> Result<Option<ConversationRecord>, RepositoryError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.get((id - 1) as usize).map(|row| ConversationRecord {
                id,
                transcript: Some(row.transcript.clone()),
                summary: row.summary.clone(),
                recording_url: row.recording_url.clone(),
                started_at: row.started_at,
                ended_at: row.ended_at,
            }))
        }

        async fn list_recent(&self, limit: u32) -> Result<Vec<ConversationRecord>, RepositoryError> {
            let rows = self.rows.lock().unwrap();
            let mut out = Vec::new();
            for (i, row) in rows.iter().enumerate().rev().take(limit as usize) {
                out.push(ConversationRecord {
                    id: (i + 1) as i64,
                    transcript: Some(row.transcript.clone()),
                    summary: row.summary.clone(),
                    recording_url: row.recording_url.clone(),
                    started_at: row.started_at,
                    ended_at: row.ended_at,
                });
            }
            Ok(out)
        }

        async fn count(&self) -> Result<u64, RepositoryError> {
            Ok(self.rows.lock().unwrap().len() as u64)
        }
    }

    #[derive(Default)]
    struct StubEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for StubEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| hash_embed(t)).collect())
        }

        fn model_name(&self) -> &str {
            "stub-hash"
        }

        fn dimension(&self) -> usize {
            STUB_DIMENSION
        }
    }

    /// Embedder that always fails, for fault injection.
    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, RepositoryError> {
            Err(RepositoryError::Query("model unavailable".to_string()))
        }

        fn model_name(&self) -> &str {
            "failing"
        }

        fn dimension(&self) -> usize {
            STUB_DIMENSION
        }
    }

    #[derive(Default)]
    struct StubIndex {
        docs: Mutex<Vec<(ContextDocument, Vec<f32>)>>,
    }

    impl ContextIndex for StubIndex {
        async fn upsert(
            &self,
            document: &ContextDocument,
            embedding: &[f32],
        ) -> Result<(), RepositoryError> {
            let mut docs = self.docs.lock().unwrap();
            docs.retain(|(d, _)| d.id != document.id);
            docs.push((document.clone(), embedding.to_vec()));
            Ok(())
        }

        async fn search(
            &self,
            query_embedding: &[f32],
            limit: usize,
        ) -> Result<Vec<ScoredDocument>, RepositoryError> {
            let docs = self.docs.lock().unwrap();
            let mut hits: Vec<ScoredDocument> = docs
                .iter()
                .map(|(d, v)| ScoredDocument {
                    document: d.clone(),
                    distance: cosine_distance(query_embedding, v),
                })
                .collect();
            hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            hits.truncate(limit);
            Ok(hits)
        }

        async fn count(&self) -> Result<u64, RepositoryError> {
            Ok(self.docs.lock().unwrap().len() as u64)
        }
    }

    type StubService<E> = ConversationService<StubRepository, E, StubIndex>;

    fn make_service() -> StubService<StubEmbedder> {
        ConversationService::new(
            StubRepository::default(),
            StubEmbedder::default(),
            StubIndex::default(),
            3,
        )
    }

    fn report(json: &str) -> EndOfCallReport {
        serde_json::from_str(json).expect("report should deserialize")
    }

    fn valid_report() -> EndOfCallReport {
        report(
            r#"{
                "message": {
                    "type": "end-of-call-report",
                    "transcript": "hello",
                    "analysis": {"summary": "greeting call"},
                    "startedAt": "2024-01-01T10:00:00Z",
                    "endedAt": "2024-01-01T10:05:00Z"
                }
            }"#,
        )
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_store_report_returns_new_id_and_indexes_summary() {
        let service = make_service();

        let db_id = service.store_report(valid_report()).await.unwrap();
        assert_eq!(db_id, 1);
        assert_eq!(service.conversation_count().await.unwrap(), 1);

        let docs = service.index.docs.lock().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0.id, "summary_1");
        assert_eq!(docs[0].0.text, "greeting call");
        assert_eq!(docs[0].0.source, DocumentSource::Summary);
        assert_eq!(docs[0].0.conversation_id, Some(1));
    }

    #[tokio::test]
    async fn test_store_report_ids_are_monotonic() {
        let service = make_service();

        assert_eq!(service.store_report(valid_report()).await.unwrap(), 1);
        assert_eq!(service.store_report(valid_report()).await.unwrap(), 2);
        assert_eq!(service.store_report(valid_report()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_wrong_message_type_writes_nothing() {
        let service = make_service();
        let result = service
            .store_report(report(r#"{"message": {"type": "transcript", "transcript": "hi"}}"#))
            .await;

        assert!(matches!(result, Err(IngestError::NotEndOfCallReport)));
        assert_eq!(service.conversation_count().await.unwrap(), 0);
        assert_eq!(service.document_count().await.unwrap(), 0);
        assert_eq!(service.embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_transcript_writes_nothing() {
        let service = make_service();
        let result = service
            .store_report(report(r#"{"message": {"type": "end-of-call-report"}}"#))
            .await;

        assert!(matches!(result, Err(IngestError::MissingTranscript)));
        assert_eq!(service.conversation_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_report_without_summary_skips_indexing() {
        let service = make_service();
        let db_id = service
            .store_report(report(
                r#"{"message": {"type": "end-of-call-report", "transcript": "hello"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(db_id, 1);
        assert_eq!(service.document_count().await.unwrap(), 0);
        assert_eq!(service.embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_does_not_fail_ingestion() {
        let service: StubService<FailingEmbedder> = ConversationService::new(
            StubRepository::default(),
            FailingEmbedder,
            StubIndex::default(),
            3,
        );

        let db_id = service.store_report(valid_report()).await.unwrap();
        assert_eq!(db_id, 1);
        assert_eq!(service.conversation_count().await.unwrap(), 1);
        assert_eq!(service.document_count().await.unwrap(), 0);
    }

    // -----------------------------------------------------------------------
    // Retrieval
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_empty_query_never_reaches_embedder() {
        let service = make_service();

        for query in ["", "   ", "\n"] {
            let result = service.retrieve_context(query).await;
            assert!(matches!(result, Err(ContextError::MissingQuery)));
        }
        assert_eq!(service.embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_round_trip_summary_is_retrievable() {
        let service = make_service();
        service.store_report(valid_report()).await.unwrap();

        let hits = service.retrieve_context("greeting call").await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].document.text, "greeting call");
        assert!(hits[0].distance < 1e-5);
    }

    #[tokio::test]
    async fn test_retrieval_caps_results_at_search_limit() {
        let service = make_service();
        for i in 0..5 {
            service
                .index_snippet(&format!("note number {i}"))
                .await
                .unwrap();
        }

        let hits = service.retrieve_context("note number 0").await.unwrap();
        assert_eq!(hits.len(), 3);

        // Results come back closest first
        for window in hits.windows(2) {
            assert!(window[0].distance <= window[1].distance);
        }
    }

    #[tokio::test]
    async fn test_retrieval_on_empty_index_returns_no_hits() {
        let service = make_service();
        let hits = service.retrieve_context("anything").await.unwrap();
        assert!(hits.is_empty());
    }

    // -----------------------------------------------------------------------
    // Snippets
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_index_snippet_generates_unique_ids() {
        let service = make_service();
        let a = service.index_snippet("remember the milk").await.unwrap();
        let b = service.index_snippet("remember the milk").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(service.document_count().await.unwrap(), 2);
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_conversation_lookup_round_trips() {
        let service = make_service();
        let db_id = service.store_report(valid_report()).await.unwrap();

        let record = service.conversation(db_id).await.unwrap().unwrap();
        assert_eq!(record.id, db_id);
        assert_eq!(record.transcript.as_deref(), Some("hello"));
        assert_eq!(record.summary.as_deref(), Some("greeting call"));

        assert!(service.conversation(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_conversations_newest_first() {
        let service = make_service();
        service.store_report(valid_report()).await.unwrap();
        service.store_report(valid_report()).await.unwrap();
        service.store_report(valid_report()).await.unwrap();

        let recent = service.recent_conversations(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, 3);
        assert_eq!(recent[1].id, 2);
    }
}
