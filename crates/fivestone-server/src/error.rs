use fivestone_core::net::messages::RoomErrorMsg;
use fivestone_core::net::protocol::PROTOCOL_VERSION;

/// Everything that can go wrong with a room operation. Each value is
/// reported only to the requesting connection as a `RoomError` frame; none
/// of these affect other occupants or the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomError {
    /// The requested room code is not in the store.
    RoomNotFound,
    /// The room already holds two players.
    RoomFull,
    /// The connection is already registered to a room.
    AlreadyInRoom,
    /// A room-scoped operation from a connection that is in no room (or
    /// named a room it is not a member of).
    NotInRoom,
    /// The client spoke an incompatible protocol version.
    VersionMismatch { client: u8 },
}

impl RoomError {
    /// Stable machine-readable code for the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RoomNotFound => "room_not_found",
            Self::RoomFull => "room_full",
            Self::AlreadyInRoom => "already_in_room",
            Self::NotInRoom => "not_in_room",
            Self::VersionMismatch { .. } => "bad_request",
        }
    }

    pub fn to_wire(&self) -> RoomErrorMsg {
        RoomErrorMsg {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

impl std::fmt::Display for RoomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoomNotFound => write!(f, "room not found"),
            Self::RoomFull => write!(f, "room is full"),
            Self::AlreadyInRoom => write!(f, "already in a room"),
            Self::NotInRoom => write!(f, "not in that room"),
            Self::VersionMismatch { client } => {
                write!(
                    f,
                    "protocol version mismatch: client={client}, server={PROTOCOL_VERSION}"
                )
            },
        }
    }
}

impl std::error::Error for RoomError {}
