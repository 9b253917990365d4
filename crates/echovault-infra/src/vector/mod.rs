//! Vector index infrastructure for summary embeddings.
//!
//! Provides LanceDB store management, the context-document index, and
//! fastembed-based local embedding generation. The Arrow schema defines the
//! table structure.

pub mod embedder;
pub mod index;
pub mod lance;
pub mod schema;
