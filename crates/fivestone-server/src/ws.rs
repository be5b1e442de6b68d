use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use fivestone_core::net::messages::{ClientMessage, ServerMessage, WelcomeMsg};
use fivestone_core::net::protocol::{MAX_MESSAGE_SIZE, PROTOCOL_VERSION, decode_client_message};
use fivestone_core::player::PlayerId;
use fivestone_core::room::is_valid_room_code;

use crate::error::RoomError;
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::channel::<Bytes>(state.config.limits.player_message_buffer);

    let player_id = {
        let mut rooms = state.rooms.write().await;
        let player_id = rooms.register_peer(tx);
        rooms.send_to(player_id, &ServerMessage::Welcome(WelcomeMsg { player_id }));
        player_id
    };
    tracing::info!(player_id = %player_id, "Player connected");

    spawn_writer(ws_sender, rx);

    read_loop(&mut ws_receiver, &state, player_id).await;

    // Abrupt drop and explicit close share this one cleanup path.
    let mut rooms = state.rooms.write().await;
    rooms.disconnect(player_id);
    drop(rooms);
    tracing::info!(player_id = %player_id, "Player disconnected");
}

/// Forward queued outbound frames to the socket. Frames are already
/// encoded; per-connection ordering is the channel's FIFO order.
fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Bytes>,
) {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender.send(Message::Binary(data)).await.is_err() {
                break;
            }
        }
    });
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    player_id: PlayerId,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };

        if !rate_limiter.allow() {
            tracing::warn!(player_id = %player_id, "Rate limited");
            continue;
        }

        if data.is_empty() || data.len() > MAX_MESSAGE_SIZE {
            continue;
        }

        match decode_client_message(&data) {
            Ok(msg) => dispatch(state, player_id, msg).await,
            Err(e) => {
                // Malformed frames are dropped; the connection survives.
                tracing::debug!(player_id = %player_id, error = %e, "Undecodable frame");
            },
        }
    }
}

fn check_protocol_version(client: u8) -> Result<(), RoomError> {
    // 0 means the client did not state a version; accept it.
    if client != 0 && client != PROTOCOL_VERSION {
        return Err(RoomError::VersionMismatch { client });
    }
    Ok(())
}

/// Route one inbound event. Mutating operations take the write lock;
/// pure relays and lookups take the read lock.
async fn dispatch(state: &AppState, player_id: PlayerId, msg: ClientMessage) {
    match msg {
        ClientMessage::CreateRoom(m) => {
            if let Err(err) = check_protocol_version(m.protocol_version) {
                state.rooms.read().await.send_error(player_id, err);
                return;
            }
            let mut rooms = state.rooms.write().await;
            if let Err(err) = rooms.create_room(player_id, m.game) {
                rooms.send_error(player_id, err);
            }
        },
        ClientMessage::JoinRoom(m) => {
            if let Err(err) = check_protocol_version(m.protocol_version) {
                state.rooms.read().await.send_error(player_id, err);
                return;
            }
            // Reject garbage codes before the store lookup
            if !is_valid_room_code(&m.room_code) {
                state
                    .rooms
                    .read()
                    .await
                    .send_error(player_id, RoomError::RoomNotFound);
                return;
            }
            let mut rooms = state.rooms.write().await;
            if let Err(err) = rooms.join_room(player_id, &m.room_code) {
                rooms.send_error(player_id, err);
            }
        },
        // Leaving while in no room is a silent no-op by contract.
        ClientMessage::LeaveRoom(_) => {
            state.rooms.write().await.leave_room(player_id);
        },
        ClientMessage::ListRooms => {
            state.rooms.read().await.send_room_list_to(player_id);
        },
        ClientMessage::Ready => {
            let mut rooms = state.rooms.write().await;
            if let Err(err) = rooms.mark_ready(player_id) {
                rooms.send_error(player_id, err);
            }
        },
        ClientMessage::MakeMove(m) => {
            let rooms = state.rooms.read().await;
            if let Err(err) = rooms.relay_move(player_id, &m.room_code, m.row, m.col) {
                rooms.send_error(player_id, err);
            }
        },
        ClientMessage::WebrtcOffer(m) => {
            let rooms = state.rooms.read().await;
            if let Err(err) = rooms.relay_offer(player_id, &m.room_code, m.offer) {
                rooms.send_error(player_id, err);
            }
        },
        ClientMessage::WebrtcAnswer(m) => {
            let rooms = state.rooms.read().await;
            if let Err(err) = rooms.relay_answer(player_id, &m.room_code, m.answer) {
                rooms.send_error(player_id, err);
            }
        },
        ClientMessage::IceCandidate(m) => {
            let rooms = state.rooms.read().await;
            if let Err(err) = rooms.relay_candidate(player_id, &m.room_code, m.candidate) {
                rooms.send_error(player_id, err);
            }
        },
        ClientMessage::RestartGame(m) => {
            let rooms = state.rooms.read().await;
            if let Err(err) = rooms.restart_game(player_id, &m.room_code) {
                rooms.send_error(player_id, err);
            }
        },
        ClientMessage::RequestRestart(m) | ClientMessage::AcceptRestart(m) => {
            let mut rooms = state.rooms.write().await;
            if let Err(err) = rooms.restart_consensus(player_id, &m.room_code) {
                rooms.send_error(player_id, err);
            }
        },
        ClientMessage::RequestUndo(m) => {
            let mut rooms = state.rooms.write().await;
            if let Err(err) = rooms.request_undo(player_id, &m.room_code) {
                rooms.send_error(player_id, err);
            }
        },
        ClientMessage::AcceptUndo(m) => {
            let mut rooms = state.rooms.write().await;
            if let Err(err) = rooms.accept_undo(player_id, &m.room_code) {
                rooms.send_error(player_id, err);
            }
        },
        ClientMessage::Surrender(m) => {
            let rooms = state.rooms.read().await;
            if let Err(err) = rooms.surrender(player_id, &m.room_code) {
                rooms.send_error(player_id, err);
            }
        },
    }
}
