//! Infrastructure layer for Parlance.
//!
//! Contains implementations of the traits defined in `parlance-core`:
//! SQLite storage with WAL mode and split read/write pools, the ephemeral
//! in-memory store, the in-process snapshot cache, and the HTTP client for
//! the remote generation service.

pub mod cache;
pub mod config;
pub mod generate;
pub mod memory;
pub mod sqlite;
