//! Per-connection session pump.
//!
//! `GET /api/v1/ws` upgrades to a WebSocket after the token extractor binds
//! a user identity. Each connection then runs two tasks for its lifetime:
//!
//! - **Reader** (the upgrade task): waits for the next frame under the idle
//!   deadline and dispatches decoded envelopes sequentially. Deadline
//!   expiry, a receive error, or a Close frame ends the session.
//! - **Writer** (spawned): drains the outbound queue, pings on a fixed
//!   interval when no application data is flowing, and exits on write
//!   failure or cancellation.
//!
//! The cancellation token ties the two together: whichever side fails first
//! cancels, and the other side observes it and exits.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use parlance_core::chat::ChatService;
use parlance_core::generate::TextGenerator;
use parlance_core::store::ConversationStore;

use super::envelope::{Inbound, Outbound};
use super::outbound::{OUTBOUND_CAPACITY, OutboundQueue};
use crate::http::extractors::auth::AuthedUser;
use crate::state::AppState;

/// Timeout on a single frame write.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// A connection that produces no frame (not even a pong) within this window
/// is considered dead.
const READ_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Ping interval, 90% of the read-idle window so a live but quiet peer
/// always has a pong in flight before the deadline.
const PING_PERIOD: Duration = Duration::from_secs(54);

/// Maximum inbound frame size.
const MAX_FRAME_SIZE: usize = 512 * 1024;

/// Deadline on the generation leg of one chat turn. The user message
/// persisted before the call is never rolled back on expiry.
const CHAT_DEADLINE: Duration = Duration::from_secs(30);

/// GET /api/v1/ws - Upgrade to a WebSocket session.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
) -> impl IntoResponse {
    ws.max_message_size(MAX_FRAME_SIZE)
        .on_upgrade(move |socket| run_session(socket, state, user_id))
}

/// Run one session to completion.
async fn run_session(socket: WebSocket, state: AppState, user_id: Uuid) {
    let (sink, stream) = socket.split();
    let (outbound, rx, shutdown) = OutboundQueue::new(OUTBOUND_CAPACITY);

    debug!(%user_id, "session active");

    let writer = tokio::spawn(write_pump(sink, rx, shutdown.clone()));
    read_pump(stream, user_id, &state, &outbound, &shutdown).await;

    shutdown.cancel();
    let _ = writer.await;

    debug!(%user_id, "session closed");
}

/// Read frames until the connection dies, goes idle, or the session is
/// cancelled.
async fn read_pump(
    mut stream: SplitStream<WebSocket>,
    user_id: Uuid,
    state: &AppState,
    outbound: &OutboundQueue,
    shutdown: &CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => return,
            frame = tokio::time::timeout(READ_IDLE_TIMEOUT, stream.next()) => frame,
        };

        match frame {
            Err(_) => {
                debug!(%user_id, "read deadline expired, closing session");
                return;
            }
            Ok(None) | Ok(Some(Ok(Message::Close(_)))) => return,
            Ok(Some(Err(e))) => {
                debug!(%user_id, error = %e, "websocket receive error");
                return;
            }
            Ok(Some(Ok(Message::Text(text)))) => {
                dispatch(
                    text.as_str(),
                    user_id,
                    state.chat_service.as_ref(),
                    outbound,
                    CHAT_DEADLINE,
                )
                .await;
            }
            // Ping/Pong and binary frames reset the idle deadline by
            // arriving; nothing to dispatch.
            Ok(Some(Ok(_))) => {}
        }
    }
}

/// Decode one text frame and run the requested operation.
///
/// Protocol-level failures (malformed envelope, unknown type, failed
/// operation) answer with an `error` envelope and leave the connection
/// open.
async fn dispatch<S: ConversationStore, G: TextGenerator>(
    raw: &str,
    user_id: Uuid,
    service: &ChatService<S, G>,
    outbound: &OutboundQueue,
    chat_deadline: Duration,
) {
    let inbound = match Inbound::decode(raw) {
        Ok(inbound) => inbound,
        Err(e) => {
            outbound.send(Outbound::error(e.to_string()));
            return;
        }
    };

    match inbound {
        Inbound::Chat(request) => {
            let turn = service.chat(user_id, &request, chat_deadline);
            match tokio::time::timeout(chat_deadline, turn).await {
                Ok(Ok(reply)) => {
                    outbound.send(Outbound::Chat(reply));
                }
                Ok(Err(e)) => {
                    warn!(%user_id, error = %e, "chat turn failed");
                    outbound.send(Outbound::error(format!("chat request failed: {e}")));
                }
                Err(_) => {
                    warn!(%user_id, "chat turn abandoned at deadline");
                    outbound.send(Outbound::error("chat request timed out"));
                }
            }
        }
        Inbound::History(request) => {
            match service.history(user_id, &request.conversation_id).await {
                Ok(messages) => {
                    outbound.send(Outbound::History(messages));
                }
                Err(e) => {
                    outbound.send(Outbound::error(format!("history request failed: {e}")));
                }
            }
        }
    }
}

/// Drain the outbound queue into the socket and keep the peer alive.
async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Outbound>,
    shutdown: CancellationToken,
) {
    let first_tick = tokio::time::Instant::now() + PING_PERIOD;
    let mut ping = tokio::time::interval_at(first_tick, PING_PERIOD);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let json = match serde_json::to_string(&envelope) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "failed to serialize outbound envelope");
                        continue;
                    }
                };
                let write = tokio::time::timeout(WRITE_TIMEOUT, sink.send(Message::Text(json.into())));
                if !matches!(write.await, Ok(Ok(()))) {
                    shutdown.cancel();
                    break;
                }
            }
            _ = ping.tick() => {
                let write = tokio::time::timeout(WRITE_TIMEOUT, sink.send(Message::Ping(Bytes::new())));
                if !matches!(write.await, Ok(Ok(()))) {
                    debug!("ping write failed, closing session");
                    shutdown.cancel();
                    break;
                }
            }
        }
    }

    let _ = sink.send(Message::Close(None)).await;
}
