use serde::{Deserialize, Serialize};

use crate::player::{PlayerId, Stone};
use crate::room::GameKind;

/// Network message type discriminator (the 1-byte wire prefix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    CreateRoom = 0x01,
    JoinRoom = 0x02,
    LeaveRoom = 0x03,
    ListRooms = 0x04,
    Ready = 0x05,
    MakeMove = 0x06,
    WebrtcOffer = 0x07,
    WebrtcAnswer = 0x08,
    IceCandidate = 0x09,
    RestartGame = 0x0A,
    RequestRestart = 0x0B,
    AcceptRestart = 0x0C,
    RequestUndo = 0x0D,
    AcceptUndo = 0x0E,
    Surrender = 0x0F,

    // Server -> Client
    Welcome = 0x10,
    RoomCreated = 0x11,
    RoomJoined = 0x12,
    RoomError = 0x13,
    PlayerJoined = 0x14,
    PlayerLeft = 0x15,
    RoomList = 0x16,
    GameStart = 0x17,
    OpponentMove = 0x18,
    PeerOffer = 0x19,
    PeerAnswer = 0x1A,
    PeerCandidate = 0x1B,
    GameRestart = 0x1C,
    RestartRequested = 0x1D,
    UndoRequested = 0x1E,
    UndoMove = 0x1F,
    OpponentSurrender = 0x20,
}

impl MessageType {
    pub fn from_byte(byte: u8) -> Option<MessageType> {
        Some(match byte {
            0x01 => Self::CreateRoom,
            0x02 => Self::JoinRoom,
            0x03 => Self::LeaveRoom,
            0x04 => Self::ListRooms,
            0x05 => Self::Ready,
            0x06 => Self::MakeMove,
            0x07 => Self::WebrtcOffer,
            0x08 => Self::WebrtcAnswer,
            0x09 => Self::IceCandidate,
            0x0A => Self::RestartGame,
            0x0B => Self::RequestRestart,
            0x0C => Self::AcceptRestart,
            0x0D => Self::RequestUndo,
            0x0E => Self::AcceptUndo,
            0x0F => Self::Surrender,
            0x10 => Self::Welcome,
            0x11 => Self::RoomCreated,
            0x12 => Self::RoomJoined,
            0x13 => Self::RoomError,
            0x14 => Self::PlayerJoined,
            0x15 => Self::PlayerLeft,
            0x16 => Self::RoomList,
            0x17 => Self::GameStart,
            0x18 => Self::OpponentMove,
            0x19 => Self::PeerOffer,
            0x1A => Self::PeerAnswer,
            0x1B => Self::PeerCandidate,
            0x1C => Self::GameRestart,
            0x1D => Self::RestartRequested,
            0x1E => Self::UndoRequested,
            0x1F => Self::UndoMove,
            0x20 => Self::OpponentSurrender,
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// Client -> Server payloads

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomMsg {
    pub game: GameKind,
    pub protocol_version: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomMsg {
    pub room_code: String,
    pub protocol_version: u8,
}

/// Shared payload for the operations that only name a room: leave, the
/// restart/undo handshakes, and surrender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRefMsg {
    pub room_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeMoveMsg {
    pub room_code: String,
    pub row: u16,
    pub col: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebrtcOfferMsg {
    pub room_code: String,
    /// SDP offer, relayed verbatim.
    pub offer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebrtcAnswerMsg {
    pub room_code: String,
    /// SDP answer, relayed verbatim.
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidateMsg {
    pub room_code: String,
    pub candidate: String,
}

/// Client -> Server messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    CreateRoom(CreateRoomMsg),
    JoinRoom(JoinRoomMsg),
    LeaveRoom(RoomRefMsg),
    ListRooms,
    Ready,
    MakeMove(MakeMoveMsg),
    WebrtcOffer(WebrtcOfferMsg),
    WebrtcAnswer(WebrtcAnswerMsg),
    IceCandidate(IceCandidateMsg),
    RestartGame(RoomRefMsg),
    RequestRestart(RoomRefMsg),
    AcceptRestart(RoomRefMsg),
    RequestUndo(RoomRefMsg),
    AcceptUndo(RoomRefMsg),
    Surrender(RoomRefMsg),
}

impl ClientMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::CreateRoom(_) => MessageType::CreateRoom,
            Self::JoinRoom(_) => MessageType::JoinRoom,
            Self::LeaveRoom(_) => MessageType::LeaveRoom,
            Self::ListRooms => MessageType::ListRooms,
            Self::Ready => MessageType::Ready,
            Self::MakeMove(_) => MessageType::MakeMove,
            Self::WebrtcOffer(_) => MessageType::WebrtcOffer,
            Self::WebrtcAnswer(_) => MessageType::WebrtcAnswer,
            Self::IceCandidate(_) => MessageType::IceCandidate,
            Self::RestartGame(_) => MessageType::RestartGame,
            Self::RequestRestart(_) => MessageType::RequestRestart,
            Self::AcceptRestart(_) => MessageType::AcceptRestart,
            Self::RequestUndo(_) => MessageType::RequestUndo,
            Self::AcceptUndo(_) => MessageType::AcceptUndo,
            Self::Surrender(_) => MessageType::Surrender,
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> Client payloads

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeMsg {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCreatedMsg {
    pub room_code: String,
    pub game: GameKind,
    pub is_host: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomJoinedMsg {
    pub room_code: String,
    pub game: GameKind,
    pub is_host: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomErrorMsg {
    /// Stable machine-readable code, e.g. `room_full`.
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerJoinedMsg {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLeftMsg {
    pub player_id: PlayerId,
}

/// One row of the room list snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub code: String,
    pub game: GameKind,
    pub player_count: u8,
    pub created_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomListMsg {
    /// Newest room first.
    pub rooms: Vec<RoomSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStartMsg {
    pub stone: Stone,
    pub opponent_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentMoveMsg {
    pub row: u16,
    pub col: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerOfferMsg {
    pub from: PlayerId,
    pub offer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAnswerMsg {
    pub from: PlayerId,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerCandidateMsg {
    pub from: PlayerId,
    pub candidate: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartRequestedMsg {
    pub from: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoRequestedMsg {
    pub from: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentSurrenderMsg {
    pub winner: Stone,
}

/// Server -> Client messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Welcome(WelcomeMsg),
    RoomCreated(RoomCreatedMsg),
    RoomJoined(RoomJoinedMsg),
    RoomError(RoomErrorMsg),
    PlayerJoined(PlayerJoinedMsg),
    PlayerLeft(PlayerLeftMsg),
    RoomList(RoomListMsg),
    GameStart(GameStartMsg),
    OpponentMove(OpponentMoveMsg),
    PeerOffer(PeerOfferMsg),
    PeerAnswer(PeerAnswerMsg),
    PeerCandidate(PeerCandidateMsg),
    GameRestart,
    RestartRequested(RestartRequestedMsg),
    UndoRequested(UndoRequestedMsg),
    UndoMove,
    OpponentSurrender(OpponentSurrenderMsg),
}

impl ServerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Welcome(_) => MessageType::Welcome,
            Self::RoomCreated(_) => MessageType::RoomCreated,
            Self::RoomJoined(_) => MessageType::RoomJoined,
            Self::RoomError(_) => MessageType::RoomError,
            Self::PlayerJoined(_) => MessageType::PlayerJoined,
            Self::PlayerLeft(_) => MessageType::PlayerLeft,
            Self::RoomList(_) => MessageType::RoomList,
            Self::GameStart(_) => MessageType::GameStart,
            Self::OpponentMove(_) => MessageType::OpponentMove,
            Self::PeerOffer(_) => MessageType::PeerOffer,
            Self::PeerAnswer(_) => MessageType::PeerAnswer,
            Self::PeerCandidate(_) => MessageType::PeerCandidate,
            Self::GameRestart => MessageType::GameRestart,
            Self::RestartRequested(_) => MessageType::RestartRequested,
            Self::UndoRequested(_) => MessageType::UndoRequested,
            Self::UndoMove => MessageType::UndoMove,
            Self::OpponentSurrender(_) => MessageType::OpponentSurrender,
        }
    }
}
