//! WebSocket session layer.
//!
//! One session per authenticated connection: a reader loop decoding
//! `{type, content}` envelopes and a spawned writer task draining a bounded
//! outbound queue, connected by a cancellation token. Protocol-level misuse
//! answers with an `error` envelope; only transport-level failures close
//! the connection.

pub mod envelope;
pub mod outbound;
pub mod session;
