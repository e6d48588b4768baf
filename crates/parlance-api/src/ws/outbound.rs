//! Bounded, non-blocking outbound queue for one session.
//!
//! Producers (the dispatch path delivering replies) never block. A full
//! queue means the consumer is too slow or stuck; the session is shut down
//! via its cancellation token instead of stalling the producing path.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::envelope::Outbound;

/// Maximum pending outbound envelopes per session.
pub const OUTBOUND_CAPACITY: usize = 256;

/// Producer handle to a session's outbound queue.
#[derive(Clone)]
pub struct OutboundQueue {
    tx: mpsc::Sender<Outbound>,
    shutdown: CancellationToken,
}

impl OutboundQueue {
    /// Create a queue with its consumer half and the session's shutdown
    /// token.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Outbound>, CancellationToken) {
        let (tx, rx) = mpsc::channel(capacity);
        let shutdown = CancellationToken::new();
        let queue = Self {
            tx,
            shutdown: shutdown.clone(),
        };
        (queue, rx, shutdown)
    }

    /// Enqueue an envelope without blocking.
    ///
    /// Returns `false` when the envelope was dropped. A full queue cancels
    /// the session.
    pub fn send(&self, envelope: Outbound) -> bool {
        match self.tx.try_send(envelope) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("outbound queue full, closing session");
                self.shutdown.cancel();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the session has been shut down.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
