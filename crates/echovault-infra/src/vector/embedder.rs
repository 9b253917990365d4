//! fastembed-based local embedding generator.
//!
//! Implements the `Embedder` trait from `echovault-core` using fastembed's
//! AllMiniLML6V2 model (384 dimensions) with ONNX runtime inference.
//!
//! `TextEmbedding::embed` requires `&mut self` and is CPU-bound, so the
//! model sits behind `Arc<Mutex<...>>` and inference runs on the blocking
//! thread pool.

use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use echovault_core::memory::embedder::Embedder;
use echovault_types::error::RepositoryError;

use super::schema::EMBEDDING_DIMENSION;

/// Model name reported by [`Embedder::model_name`].
pub const EMBEDDING_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// fastembed-backed implementation of `Embedder`.
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedder {
    /// Load the embedding model.
    ///
    /// First use downloads the ONNX weights to the fastembed cache
    /// directory; call from a blocking context.
    pub fn new() -> Result<Self, RepositoryError> {
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false),
        )
        .map_err(|e| RepositoryError::Query(format!("failed to load embedding model: {e}")))?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RepositoryError> {
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| RepositoryError::Query("embedding model mutex poisoned".to_string()))?;
            model
                .embed(texts, None)
                .map_err(|e| RepositoryError::Query(format!("embedding failed: {e}")))
        })
        .await
        .map_err(|e| RepositoryError::Query(format!("embedding task failed: {e}")))?
    }

    fn model_name(&self) -> &str {
        EMBEDDING_MODEL_NAME
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION as usize
    }
}
