//! Shared domain types for echovault.
//!
//! This crate contains the types used across the service: conversation
//! records, the inbound end-of-call report schema, indexed context documents,
//! configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
