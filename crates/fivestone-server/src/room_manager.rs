use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use uuid::Uuid;

use fivestone_core::net::messages::{
    GameStartMsg, OpponentMoveMsg, OpponentSurrenderMsg, PeerAnswerMsg, PeerCandidateMsg,
    PeerOfferMsg, PlayerJoinedMsg, PlayerLeftMsg, RestartRequestedMsg, RoomCreatedMsg,
    RoomJoinedMsg, RoomListMsg, RoomSummary, ServerMessage, UndoRequestedMsg,
};
use fivestone_core::net::protocol::encode_server_message;
use fivestone_core::player::{PlayerId, Stone};
use fivestone_core::room::{GameKind, Room, RoomState, generate_room_code, stone_for_index};

use crate::error::RoomError;

/// Per-player sender for outbound WebSocket binary frames. Bounded so a
/// slow client drops frames instead of stalling the relay. Uses `Bytes`
/// for zero-copy cloning when broadcasting.
pub type PlayerSender = mpsc::Sender<Bytes>;

/// Connection Registry entry: the outbound channel plus which room (if
/// any) the connection currently occupies. This map is the single source
/// of truth for "which room is X in".
struct PeerEntry {
    sender: PlayerSender,
    room_code: Option<String>,
}

/// What `leave_room` observed, for caller-side logging.
#[derive(Debug, PartialEq, Eq)]
pub struct Departure {
    pub room_code: String,
    pub room_deleted: bool,
}

/// Owns every room and the connection registry. All mutation goes through
/// one `RwLock<RoomManager>`, so room operations are linearizable: two
/// concurrent joins racing for the last slot serialize here.
pub struct RoomManager {
    rooms: HashMap<String, Room>,
    peers: HashMap<PlayerId, PeerEntry>,
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomManager {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            peers: HashMap::new(),
        }
    }

    // -----------------------------------------------------------------
    // Connection lifecycle

    /// Register a new connection and issue its identifier.
    pub fn register_peer(&mut self, sender: PlayerSender) -> PlayerId {
        let player_id = Uuid::new_v4();
        self.peers.insert(
            player_id,
            PeerEntry {
                sender,
                room_code: None,
            },
        );
        player_id
    }

    /// Full disconnect cleanup: implicit leave (with notifications and a
    /// room-list broadcast if a room changed) plus registry removal. Safe
    /// to call for a connection that was never in a room.
    pub fn disconnect(&mut self, player_id: PlayerId) {
        let departure = self.leave_room(player_id);
        self.peers.remove(&player_id);
        if let Some(dep) = departure {
            tracing::info!(
                player_id = %player_id,
                room = %dep.room_code,
                room_deleted = dep.room_deleted,
                "Disconnected player left room"
            );
        }
    }

    // -----------------------------------------------------------------
    // Room store

    /// Create a room with the caller as host and sole member. Replies
    /// `RoomCreated` to the caller and broadcasts the room list.
    pub fn create_room(
        &mut self,
        player_id: PlayerId,
        game: GameKind,
    ) -> Result<String, RoomError> {
        let peer = self.peers.get(&player_id).ok_or(RoomError::NotInRoom)?;
        if peer.room_code.is_some() {
            return Err(RoomError::AlreadyInRoom);
        }

        let code = self.generate_unique_code();
        self.rooms
            .insert(code.clone(), Room::new(code.clone(), game, player_id));
        if let Some(peer) = self.peers.get_mut(&player_id) {
            peer.room_code = Some(code.clone());
        }

        self.send_to(
            player_id,
            &ServerMessage::RoomCreated(RoomCreatedMsg {
                room_code: code.clone(),
                game,
                is_host: true,
            }),
        );
        self.broadcast_room_list();
        tracing::info!(player_id = %player_id, room = %code, ?game, "Room created");
        Ok(code)
    }

    /// Join an existing room. On success the joiner gets `RoomJoined`, the
    /// occupant gets `PlayerJoined`, and everyone gets the room list.
    pub fn join_room(&mut self, player_id: PlayerId, code: &str) -> Result<(), RoomError> {
        // Validate with shared borrows before touching anything.
        {
            let room = self.rooms.get(code).ok_or(RoomError::RoomNotFound)?;
            let peer = self.peers.get(&player_id).ok_or(RoomError::NotInRoom)?;
            if peer.room_code.is_some() || room.contains(player_id) {
                return Err(RoomError::AlreadyInRoom);
            }
            if room.is_full() {
                return Err(RoomError::RoomFull);
            }
        }

        let (game, occupant) = {
            let Some(room) = self.rooms.get_mut(code) else {
                return Err(RoomError::RoomNotFound);
            };
            room.members.push(player_id);
            (room.game, room.opponent_of(player_id))
        };
        if let Some(peer) = self.peers.get_mut(&player_id) {
            peer.room_code = Some(code.to_string());
        }

        self.send_to(
            player_id,
            &ServerMessage::RoomJoined(RoomJoinedMsg {
                room_code: code.to_string(),
                game,
                is_host: false,
            }),
        );
        if let Some(occupant) = occupant {
            self.send_to(
                occupant,
                &ServerMessage::PlayerJoined(PlayerJoinedMsg { player_id }),
            );
        }
        self.broadcast_room_list();
        tracing::info!(player_id = %player_id, room = %code, "Player joined room");
        Ok(())
    }

    /// Remove the caller from its current room, if any. Deletes the room
    /// when it empties; otherwise reassigns the host seat and notifies the
    /// remaining occupant. No-op (returns `None`) when not in a room.
    pub fn leave_room(&mut self, player_id: PlayerId) -> Option<Departure> {
        let code = self.peers.get_mut(&player_id)?.room_code.take()?;
        let room = self.rooms.get_mut(&code)?;
        if !room.remove_member(player_id) {
            return None;
        }
        let remaining = room.members.clone();
        let room_deleted = remaining.is_empty();
        if room_deleted {
            self.rooms.remove(&code);
            tracing::info!(room = %code, "Room deleted");
        }

        let left = ServerMessage::PlayerLeft(PlayerLeftMsg { player_id });
        for member in &remaining {
            self.send_to(*member, &left);
        }
        self.broadcast_room_list();
        tracing::info!(player_id = %player_id, room = %code, "Player left room");
        Some(Departure {
            room_code: code,
            room_deleted,
        })
    }

    /// Snapshot of the room list, newest room first.
    pub fn room_list_snapshot(&self) -> RoomListMsg {
        let mut rooms: Vec<&Room> = self.rooms.values().collect();
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        RoomListMsg {
            rooms: rooms
                .into_iter()
                .map(|r| RoomSummary {
                    code: r.code.clone(),
                    game: r.game,
                    player_count: r.members.len() as u8,
                    created_at_ms: r.created_at_ms,
                })
                .collect(),
        }
    }

    /// Send the current room list to one connection (the `ListRooms` reply).
    pub fn send_room_list_to(&self, player_id: PlayerId) {
        let msg = ServerMessage::RoomList(self.room_list_snapshot());
        self.send_to(player_id, &msg);
    }

    /// Broadcast the room list to every connected client, in or out of
    /// rooms. Called on any change to room existence or membership.
    pub fn broadcast_room_list(&self) {
        let msg = ServerMessage::RoomList(self.room_list_snapshot());
        let Ok(data) = encode_server_message(&msg) else {
            tracing::warn!("Failed to encode room list");
            return;
        };
        let bytes = Bytes::from(data);
        for (player_id, peer) in &self.peers {
            if let Err(e) = peer.sender.try_send(bytes.clone()) {
                tracing::debug!(player_id = %player_id, error = %e, "Skipping room list for slow client");
            }
        }
    }

    /// Delete rooms that are empty AND older than `max_age`. Empty rooms
    /// are normally deleted synchronously on last leave, so this sweep is
    /// a safety net, not the primary deletion path. Occupied rooms never
    /// expire. Returns the number removed.
    pub fn cleanup_idle_rooms(&mut self, max_age: Duration) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|code, room| {
            let expired = room.members.is_empty() && room.created_at.elapsed() > max_age;
            if expired {
                tracing::info!(room = %code, "Swept expired empty room");
            }
            !expired
        });
        before - self.rooms.len()
    }

    /// `(active_rooms, seated_players)` for the health endpoint.
    pub fn stats(&self) -> (usize, usize) {
        let seated = self.rooms.values().map(|r| r.members.len()).sum();
        (self.rooms.len(), seated)
    }

    // -----------------------------------------------------------------
    // Pairing & ready handshake

    /// Record a ready signal. When this call completes the handshake (both
    /// current members ready, and this signal was not a duplicate), one
    /// fresh coin flip assigns the stones, each member is told only its own
    /// stone plus the opponent's id, and the room enters `Playing`.
    /// Returns whether the game started.
    pub fn mark_ready(&mut self, player_id: PlayerId) -> Result<bool, RoomError> {
        let code = self.registered_room(player_id)?;
        let Some(room) = self.rooms.get_mut(&code) else {
            return Err(RoomError::NotInRoom);
        };

        let inserted = room.ready.insert(player_id);
        if !(inserted && room.both_ready()) {
            tracing::debug!(player_id = %player_id, room = %code, "Ready recorded, waiting for opponent");
            return Ok(false);
        }

        let &[first, second] = room.members.as_slice() else {
            return Ok(false);
        };
        room.state = RoomState::Playing;

        // The only randomness in role assignment: one uniform draw per
        // start trigger, never cached across restarts.
        let first_stone = if rand::random::<bool>() {
            Stone::Black
        } else {
            Stone::White
        };

        self.send_to(
            first,
            &ServerMessage::GameStart(GameStartMsg {
                stone: first_stone,
                opponent_id: second,
            }),
        );
        self.send_to(
            second,
            &ServerMessage::GameStart(GameStartMsg {
                stone: first_stone.opponent(),
                opponent_id: first,
            }),
        );
        tracing::info!(room = %code, "Both players ready, game started");
        Ok(true)
    }

    // -----------------------------------------------------------------
    // Relay / signaling broker

    /// Relay a move to the other occupant. Moves carry no sender identity;
    /// the recipient infers "my opponent" from room context.
    pub fn relay_move(
        &self,
        player_id: PlayerId,
        claimed_room: &str,
        row: u16,
        col: u16,
    ) -> Result<(), RoomError> {
        let code = self.authorized_room(player_id, claimed_room)?;
        if let Some(opponent) = self.opponent_in(&code, player_id) {
            self.send_to(
                opponent,
                &ServerMessage::OpponentMove(OpponentMoveMsg { row, col }),
            );
        }
        tracing::debug!(player_id = %player_id, room = %code, row, col, "Relayed move");
        Ok(())
    }

    /// Relay an SDP offer, attributed with the sender's id.
    pub fn relay_offer(
        &self,
        player_id: PlayerId,
        claimed_room: &str,
        offer: String,
    ) -> Result<(), RoomError> {
        let code = self.authorized_room(player_id, claimed_room)?;
        if let Some(opponent) = self.opponent_in(&code, player_id) {
            self.send_to(
                opponent,
                &ServerMessage::PeerOffer(PeerOfferMsg {
                    from: player_id,
                    offer,
                }),
            );
        }
        tracing::debug!(player_id = %player_id, room = %code, "Relayed offer");
        Ok(())
    }

    /// Relay an SDP answer, attributed with the sender's id.
    pub fn relay_answer(
        &self,
        player_id: PlayerId,
        claimed_room: &str,
        answer: String,
    ) -> Result<(), RoomError> {
        let code = self.authorized_room(player_id, claimed_room)?;
        if let Some(opponent) = self.opponent_in(&code, player_id) {
            self.send_to(
                opponent,
                &ServerMessage::PeerAnswer(PeerAnswerMsg {
                    from: player_id,
                    answer,
                }),
            );
        }
        tracing::debug!(player_id = %player_id, room = %code, "Relayed answer");
        Ok(())
    }

    /// Relay an ICE candidate, attributed with the sender's id.
    pub fn relay_candidate(
        &self,
        player_id: PlayerId,
        claimed_room: &str,
        candidate: String,
    ) -> Result<(), RoomError> {
        let code = self.authorized_room(player_id, claimed_room)?;
        if let Some(opponent) = self.opponent_in(&code, player_id) {
            self.send_to(
                opponent,
                &ServerMessage::PeerCandidate(PeerCandidateMsg {
                    from: player_id,
                    candidate,
                }),
            );
        }
        tracing::debug!(player_id = %player_id, room = %code, "Relayed ICE candidate");
        Ok(())
    }

    /// The legacy unconditional restart: broadcast `GameRestart` to the
    /// whole room without consensus or state changes.
    pub fn restart_game(&self, player_id: PlayerId, claimed_room: &str) -> Result<(), RoomError> {
        let code = self.authorized_room(player_id, claimed_room)?;
        self.broadcast_to_room(&code, &ServerMessage::GameRestart);
        tracing::info!(player_id = %player_id, room = %code, "Unconditional restart");
        Ok(())
    }

    /// Request or accept a restart; both feed the same two-of-two set. At
    /// quorum the per-session sets clear, the room returns to `Waiting`
    /// (players must re-signal ready), and the whole room gets
    /// `GameRestart`. Below quorum only the opponent is told a restart is
    /// pending. There is no way to cancel a pending request.
    pub fn restart_consensus(
        &mut self,
        player_id: PlayerId,
        claimed_room: &str,
    ) -> Result<(), RoomError> {
        let code = self.authorized_room(player_id, claimed_room)?;
        let quorum = {
            let Some(room) = self.rooms.get_mut(&code) else {
                return Err(RoomError::NotInRoom);
            };
            room.restart_requests.insert(player_id);
            if room.restart_quorum() {
                room.reset_for_restart();
                true
            } else {
                false
            }
        };

        if quorum {
            self.broadcast_to_room(&code, &ServerMessage::GameRestart);
            tracing::info!(room = %code, "Restart consensus reached");
        } else if let Some(opponent) = self.opponent_in(&code, player_id) {
            self.send_to(
                opponent,
                &ServerMessage::RestartRequested(RestartRequestedMsg { from: player_id }),
            );
            tracing::debug!(player_id = %player_id, room = %code, "Restart pending confirmation");
        }
        Ok(())
    }

    /// Record an undo request and notify the opponent. Not a consensus
    /// gate: the pending set is informational.
    pub fn request_undo(
        &mut self,
        player_id: PlayerId,
        claimed_room: &str,
    ) -> Result<(), RoomError> {
        let code = self.authorized_room(player_id, claimed_room)?;
        if let Some(room) = self.rooms.get_mut(&code) {
            room.undo_requests.insert(player_id);
        }
        if let Some(opponent) = self.opponent_in(&code, player_id) {
            self.send_to(
                opponent,
                &ServerMessage::UndoRequested(UndoRequestedMsg { from: player_id }),
            );
        }
        tracing::debug!(player_id = %player_id, room = %code, "Undo requested");
        Ok(())
    }

    /// Accepting an undo broadcasts `UndoMove` to the whole room without
    /// re-verifying the original request still stands.
    pub fn accept_undo(
        &mut self,
        player_id: PlayerId,
        claimed_room: &str,
    ) -> Result<(), RoomError> {
        let code = self.authorized_room(player_id, claimed_room)?;
        if let Some(room) = self.rooms.get_mut(&code) {
            room.undo_requests.clear();
        }
        self.broadcast_to_room(&code, &ServerMessage::UndoMove);
        tracing::debug!(player_id = %player_id, room = %code, "Undo accepted");
        Ok(())
    }

    /// Tell only the opponent they won. The winner stone derives from the
    /// opponent's seat in the member list (seat 0 is black), not from the
    /// drawn assignment. Room state is untouched.
    pub fn surrender(&self, player_id: PlayerId, claimed_room: &str) -> Result<(), RoomError> {
        let code = self.authorized_room(player_id, claimed_room)?;
        let Some(room) = self.rooms.get(&code) else {
            return Err(RoomError::NotInRoom);
        };
        if let Some(index) = room.members.iter().position(|&m| m != player_id) {
            let opponent = room.members[index];
            self.send_to(
                opponent,
                &ServerMessage::OpponentSurrender(OpponentSurrenderMsg {
                    winner: stone_for_index(index),
                }),
            );
        }
        tracing::info!(player_id = %player_id, room = %code, "Player surrendered");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Internals

    fn generate_unique_code(&self) -> String {
        loop {
            let code = generate_room_code();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }

    /// The room the registry maps this connection to.
    fn registered_room(&self, player_id: PlayerId) -> Result<String, RoomError> {
        self.peers
            .get(&player_id)
            .and_then(|p| p.room_code.clone())
            .ok_or(RoomError::NotInRoom)
    }

    /// Registry lookup plus a check that the frame's room code matches the
    /// room the sender actually occupies.
    fn authorized_room(&self, player_id: PlayerId, claimed: &str) -> Result<String, RoomError> {
        let code = self.registered_room(player_id)?;
        if code != claimed {
            return Err(RoomError::NotInRoom);
        }
        Ok(code)
    }

    fn opponent_in(&self, code: &str, player_id: PlayerId) -> Option<PlayerId> {
        self.rooms.get(code)?.opponent_of(player_id)
    }

    /// Encode and send one message to one connection. Send failures mean a
    /// slow or already-gone client; the frame is dropped.
    pub fn send_to(&self, player_id: PlayerId, msg: &ServerMessage) {
        let Some(peer) = self.peers.get(&player_id) else {
            return;
        };
        match encode_server_message(msg) {
            Ok(data) => {
                if let Err(e) = peer.sender.try_send(Bytes::from(data)) {
                    tracing::debug!(
                        player_id = %player_id, error = %e,
                        "Failed to send to player (slow or disconnected)"
                    );
                }
            },
            Err(e) => tracing::warn!(error = %e, "Failed to encode server message"),
        }
    }

    /// Report an error frame to the one requesting connection.
    pub fn send_error(&self, player_id: PlayerId, err: RoomError) {
        tracing::debug!(player_id = %player_id, code = err.code(), "Room operation failed");
        self.send_to(player_id, &ServerMessage::RoomError(err.to_wire()));
    }

    /// Encode once, clone cheap `Bytes` across every member channel.
    fn broadcast_to_room(&self, code: &str, msg: &ServerMessage) {
        let Some(room) = self.rooms.get(code) else {
            return;
        };
        let Ok(data) = encode_server_message(msg) else {
            tracing::warn!(room = %code, "Failed to encode room broadcast");
            return;
        };
        let bytes = Bytes::from(data);
        for member in &room.members {
            if let Some(peer) = self.peers.get(member) {
                if let Err(e) = peer.sender.try_send(bytes.clone()) {
                    tracing::debug!(player_id = %member, error = %e, "Skipping broadcast to slow client");
                }
            }
        }
    }

    #[cfg(test)]
    fn room(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    #[cfg(test)]
    fn room_mut(&mut self, code: &str) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }
}
