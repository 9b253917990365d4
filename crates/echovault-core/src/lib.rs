//! Business logic and repository trait definitions for echovault.
//!
//! This crate defines the "ports" (repository, embedder, and index traits)
//! that the infrastructure layer implements. It depends only on
//! `echovault-types` -- never on `echovault-infra` or any database/IO crate.

pub mod memory;
pub mod repository;
pub mod service;
