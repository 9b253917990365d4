//! Infrastructure layer for echovault.
//!
//! Contains implementations of the trait ports defined in `echovault-core`:
//! SQLite conversation storage, the LanceDB vector index, the fastembed
//! embedder, and the TOML config loader.

pub mod config;
pub mod sqlite;
pub mod vector;
