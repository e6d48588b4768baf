//! Domain logic and trait definitions for Parlance.
//!
//! This crate defines the "ports" (store, cache, generator traits) that the
//! infrastructure layer implements, the cache-aside decorator that enforces
//! the write-then-invalidate discipline, and the chat orchestrator. It
//! depends only on `parlance-types` -- never on `parlance-infra` or any
//! database/IO crate.

pub mod cache;
pub mod chat;
pub mod generate;
pub mod store;
