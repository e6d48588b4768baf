//! Shared domain types for Parlance.
//!
//! This crate contains the types used across the Parlance chat backend:
//! conversations, messages, generation parameters, configuration, and their
//! associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
