//! Repository trait definitions (ports) implemented by echovault-infra.

pub mod conversation;
