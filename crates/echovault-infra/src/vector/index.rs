//! LanceDB-backed context document index.
//!
//! Implements `ContextIndex` from `echovault-core` using LanceDB for vector
//! storage and cosine similarity search. Summaries and snippets share one
//! `conversation_context` table with 384-dimensional all-MiniLM-L6-v2
//! embeddings.

use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use arrow_schema::{DataType, Field};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};

use echovault_core::memory::index::ContextIndex;
use echovault_types::context::{ContextDocument, DocumentSource, ScoredDocument};
use echovault_types::error::RepositoryError;

use super::lance::LanceVectorStore;
use super::schema::{EMBEDDING_DIMENSION, context_document_schema};

/// LanceDB-backed implementation of `ContextIndex`.
///
/// Wraps a `LanceVectorStore` and provides upsert semantics (delete by id,
/// then add) plus cosine-distance nearest-neighbor search.
pub struct LanceContextIndex {
    store: LanceVectorStore,
}

impl LanceContextIndex {
    /// Create a new LanceContextIndex backed by the given LanceVectorStore.
    pub fn new(store: LanceVectorStore) -> Self {
        Self { store }
    }

    /// Ensure the context table exists, creating it if needed.
    async fn ensure_table(&self) -> Result<lancedb::Table, RepositoryError> {
        let schema = Arc::new(context_document_schema());
        self.store
            .ensure_table(LanceVectorStore::context_table_name(), schema)
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to ensure context table: {e}")))
    }

    /// Build an Arrow RecordBatch from a ContextDocument and its embedding.
    fn build_record_batch(
        document: &ContextDocument,
        embedding: &[f32],
    ) -> Result<RecordBatch, RepositoryError> {
        let schema = Arc::new(context_document_schema());

        let id_array = StringArray::from(vec![document.id.clone()]);
        let text_array = StringArray::from(vec![document.text.clone()]);
        let source_array = StringArray::from(vec![document.source.to_string()]);
        let conversation_id_array = Int64Array::from(vec![document.conversation_id]);
        let created_at_array = StringArray::from(vec![document.created_at.to_rfc3339()]);

        // Build FixedSizeList vector column
        let values = Float32Array::from(embedding.to_vec());
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector_array =
            FixedSizeListArray::new(field, EMBEDDING_DIMENSION, Arc::new(values), None);

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(id_array),
                Arc::new(text_array),
                Arc::new(source_array),
                Arc::new(conversation_id_array),
                Arc::new(created_at_array),
                Arc::new(vector_array),
            ],
        )
        .map_err(|e| RepositoryError::Query(format!("Failed to build record batch: {e}")))
    }

    /// Parse Arrow RecordBatch rows back into ContextDocument values.
    ///
    /// Extracts columns by name so the `_distance` column added by vector
    /// search does not disturb the mapping.
    fn record_batch_to_documents(batch: &RecordBatch) -> Result<Vec<ContextDocument>, RepositoryError> {
        let num_rows = batch.num_rows();
        if num_rows == 0 {
            return Ok(vec![]);
        }

        let id_col = string_column(batch, "id")?;
        let text_col = string_column(batch, "text")?;
        let source_col = string_column(batch, "source")?;
        let conversation_id_col = batch
            .column_by_name("conversation_id")
            .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
            .ok_or_else(|| {
                RepositoryError::Query("conversation_id column should be Int64Array".to_string())
            })?;
        let created_at_col = string_column(batch, "created_at")?;

        let mut documents = Vec::with_capacity(num_rows);

        for i in 0..num_rows {
            let source: DocumentSource = source_col
                .value(i)
                .parse()
                .map_err(RepositoryError::Query)?;
            let conversation_id = if conversation_id_col.is_null(i) {
                None
            } else {
                Some(conversation_id_col.value(i))
            };
            let created_at = DateTime::parse_from_rfc3339(created_at_col.value(i))
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| RepositoryError::Query(format!("invalid created_at: {e}")))?;

            documents.push(ContextDocument {
                id: id_col.value(i).to_string(),
                text: text_col.value(i).to_string(),
                source,
                conversation_id,
                created_at,
            });
        }

        Ok(documents)
    }
}

fn string_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a StringArray, RepositoryError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| RepositoryError::Query(format!("{name} column should be StringArray")))
}

impl ContextIndex for LanceContextIndex {
    async fn upsert(
        &self,
        document: &ContextDocument,
        embedding: &[f32],
    ) -> Result<(), RepositoryError> {
        let table = self.ensure_table().await?;

        // Delete any existing row with this id so re-indexing replaces it.
        // Document ids are system-generated (summary_{N} or UUID), never
        // caller-controlled.
        table
            .delete(&format!("id = '{}'", document.id))
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to delete old document: {e}")))?;

        let batch = Self::build_record_batch(document, embedding)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);

        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to add document: {e}")))?;

        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, RepositoryError> {
        if !self
            .store
            .table_exists(LanceVectorStore::context_table_name())
            .await
        {
            return Ok(vec![]);
        }

        let table = self.ensure_table().await?;

        let results = table
            .vector_search(query_embedding)
            .map_err(|e| RepositoryError::Query(format!("Vector search setup failed: {e}")))?
            .distance_type(lancedb::DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RepositoryError::Query(format!("Vector search failed: {e}")))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to collect results: {e}")))?;

        let mut hits: Vec<ScoredDocument> = Vec::new();

        for batch in &batches {
            if batch.num_rows() == 0 {
                continue;
            }

            // The _distance column is added by LanceDB vector search
            let distance_col = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

            let documents = Self::record_batch_to_documents(batch)?;

            for (i, document) in documents.into_iter().enumerate() {
                let distance = distance_col.map_or(0.0, |d| d.value(i));
                hits.push(ScoredDocument { document, distance });
            }
        }

        // Closest first
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(limit);

        Ok(hits)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        if !self
            .store
            .table_exists(LanceVectorStore::context_table_name())
            .await
        {
            return Ok(0);
        }

        let table = self.ensure_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to count rows: {e}")))?;

        Ok(count as u64)
    }
}
