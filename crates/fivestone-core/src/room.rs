use std::collections::HashSet;
use std::time::Instant;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::player::{PlayerId, Stone};
use crate::time::unix_millis;

/// Which board game a room is hosting. The coordinator relays the same way
/// for both; this is a routing/display tag carried on create and in the
/// room list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameKind {
    #[default]
    FiveInARow,
    TicTacToe,
}

/// Current phase of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    /// Fewer than two ready players. Rooms return here after a restart.
    Waiting,
    /// Both players readied up and stones were assigned.
    Playing,
}

/// Maximum number of players in a room.
pub const ROOM_CAPACITY: usize = 2;

/// Room codes are 6 uppercase alphanumeric characters, e.g. `K7Q2ZD`.
pub const ROOM_CODE_LEN: usize = 6;

const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random room code. Uniqueness against live rooms is the
/// caller's job (retry on collision).
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_CHARSET[rng.random_range(0..ROOM_CODE_CHARSET.len())] as char)
        .collect()
}

/// Check a client-supplied room code before lookup.
pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// The stone a member holds by list position when no random draw applies
/// (index 0 is the black seat). Also used to derive the surrender winner.
pub fn stone_for_index(index: usize) -> Stone {
    if index == 0 { Stone::Black } else { Stone::White }
}

/// A coordination unit pairing up to two connections for one game session.
#[derive(Debug)]
pub struct Room {
    pub code: String,
    pub game: GameKind,
    /// Informational owner; reassigned to `members[0]` when the host leaves.
    pub host: PlayerId,
    /// Insertion-ordered, at most [`ROOM_CAPACITY`] entries.
    pub members: Vec<PlayerId>,
    /// Members that signalled ready this session. Cleared on restart.
    pub ready: HashSet<PlayerId>,
    /// Two-of-two consensus set for restart requests.
    pub restart_requests: HashSet<PlayerId>,
    /// Pending undo requests. Informational only; accept is unconditional.
    pub undo_requests: HashSet<PlayerId>,
    pub state: RoomState,
    pub created_at: Instant,
    pub created_at_ms: u64,
}

impl Room {
    pub fn new(code: String, game: GameKind, host: PlayerId) -> Self {
        Self {
            code,
            game,
            host,
            members: vec![host],
            ready: HashSet::new(),
            restart_requests: HashSet::new(),
            undo_requests: HashSet::new(),
            state: RoomState::Waiting,
            created_at: Instant::now(),
            created_at_ms: unix_millis(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= ROOM_CAPACITY
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.members.contains(&player_id)
    }

    /// The other occupant, if there is one.
    pub fn opponent_of(&self, player_id: PlayerId) -> Option<PlayerId> {
        self.members.iter().copied().find(|&m| m != player_id)
    }

    /// Both current members have signalled ready. Never true with fewer
    /// than two members, so a lone player waits forever by design of the
    /// handshake, not by a timeout.
    pub fn both_ready(&self) -> bool {
        self.members.len() == ROOM_CAPACITY && self.members.iter().all(|m| self.ready.contains(m))
    }

    /// Every current member has asked for (or accepted) a restart.
    pub fn restart_quorum(&self) -> bool {
        self.members.len() == ROOM_CAPACITY
            && self
                .members
                .iter()
                .all(|m| self.restart_requests.contains(m))
    }

    /// Remove a member, scrubbing them from every pending set and
    /// reassigning the host seat if needed. Returns false when the player
    /// was not a member.
    pub fn remove_member(&mut self, player_id: PlayerId) -> bool {
        let Some(pos) = self.members.iter().position(|&m| m == player_id) else {
            return false;
        };
        self.members.remove(pos);
        self.ready.remove(&player_id);
        self.restart_requests.remove(&player_id);
        self.undo_requests.remove(&player_id);
        if self.host == player_id
            && let Some(&next) = self.members.first()
        {
            self.host = next;
        }
        true
    }

    /// Clear the per-session sets after a restart consensus. Players must
    /// re-signal ready before play resumes.
    pub fn reset_for_restart(&mut self) {
        self.ready.clear();
        self.restart_requests.clear();
        self.undo_requests.clear();
        self.state = RoomState::Waiting;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid() -> PlayerId {
        uuid::Uuid::new_v4()
    }

    #[test]
    fn room_code_format() {
        for _ in 0..100 {
            let code = generate_room_code();
            assert!(is_valid_room_code(&code), "invalid room code: {code}");
        }
    }

    #[test]
    fn room_code_validation_rejects_garbage() {
        assert!(!is_valid_room_code(""));
        assert!(!is_valid_room_code("abc123"));
        assert!(!is_valid_room_code("ABC12"));
        assert!(!is_valid_room_code("ABC1234"));
        assert!(!is_valid_room_code("ABC-12"));
    }

    #[test]
    fn new_room_holds_only_the_host() {
        let host = pid();
        let room = Room::new("AAAAAA".into(), GameKind::FiveInARow, host);
        assert_eq!(room.members, vec![host]);
        assert_eq!(room.host, host);
        assert_eq!(room.state, RoomState::Waiting);
        assert!(!room.is_full());
    }

    #[test]
    fn opponent_lookup() {
        let (a, b) = (pid(), pid());
        let mut room = Room::new("AAAAAA".into(), GameKind::FiveInARow, a);
        room.members.push(b);
        assert_eq!(room.opponent_of(a), Some(b));
        assert_eq!(room.opponent_of(b), Some(a));
        assert_eq!(room.opponent_of(pid()), Some(a)); // non-member sees members[0]
    }

    #[test]
    fn remove_member_reassigns_host_and_scrubs_sets() {
        let (a, b) = (pid(), pid());
        let mut room = Room::new("AAAAAA".into(), GameKind::TicTacToe, a);
        room.members.push(b);
        room.ready.insert(a);
        room.ready.insert(b);
        room.restart_requests.insert(a);
        room.undo_requests.insert(a);

        assert!(room.remove_member(a));
        assert_eq!(room.members, vec![b]);
        assert_eq!(room.host, b);
        assert!(!room.ready.contains(&a));
        assert!(room.ready.contains(&b));
        assert!(room.restart_requests.is_empty());
        assert!(room.undo_requests.is_empty());
    }

    #[test]
    fn remove_nonmember_is_a_noop() {
        let a = pid();
        let mut room = Room::new("AAAAAA".into(), GameKind::FiveInARow, a);
        assert!(!room.remove_member(pid()));
        assert_eq!(room.members, vec![a]);
    }

    #[test]
    fn both_ready_needs_two_members() {
        let a = pid();
        let mut room = Room::new("AAAAAA".into(), GameKind::FiveInARow, a);
        room.ready.insert(a);
        assert!(!room.both_ready());

        let b = pid();
        room.members.push(b);
        assert!(!room.both_ready());
        room.ready.insert(b);
        assert!(room.both_ready());
    }

    #[test]
    fn restart_reset_clears_session_sets() {
        let (a, b) = (pid(), pid());
        let mut room = Room::new("AAAAAA".into(), GameKind::FiveInARow, a);
        room.members.push(b);
        room.ready.extend([a, b]);
        room.restart_requests.extend([a, b]);
        room.state = RoomState::Playing;

        room.reset_for_restart();
        assert!(room.ready.is_empty());
        assert!(room.restart_requests.is_empty());
        assert_eq!(room.state, RoomState::Waiting);
        assert_eq!(room.members.len(), 2);
    }

    #[test]
    fn seat_stones() {
        assert_eq!(stone_for_index(0), Stone::Black);
        assert_eq!(stone_for_index(1), Stone::White);
    }
}
