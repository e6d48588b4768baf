//! Chat turn orchestration for Parlance.
//!
//! `ChatService` drives one turn end to end: resolve the conversation,
//! persist the user message, render the transcript prompt, call the
//! generator, persist the reply. `title` and `prompt` hold the two pure
//! pieces of that workflow.

pub mod prompt;
pub mod service;
pub mod title;

pub use service::ChatService;
