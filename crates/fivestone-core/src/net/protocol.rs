use serde::{Deserialize, Serialize};

use super::messages::{
    ClientMessage, CreateRoomMsg, GameStartMsg, IceCandidateMsg, JoinRoomMsg, MakeMoveMsg,
    MessageType, OpponentMoveMsg, OpponentSurrenderMsg, PeerAnswerMsg, PeerCandidateMsg,
    PeerOfferMsg, PlayerJoinedMsg, PlayerLeftMsg, RestartRequestedMsg, RoomCreatedMsg,
    RoomErrorMsg, RoomJoinedMsg, RoomListMsg, RoomRefMsg, ServerMessage, UndoRequestedMsg,
    WebrtcAnswerMsg, WebrtcOfferMsg, WelcomeMsg,
};

/// Current protocol version, carried in CreateRoom/JoinRoom.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum wire frame size in bytes. SDP offers run a few KiB; this leaves
/// generous headroom without letting a client buffer-bomb the relay.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(f, "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})")
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::CreateRoom(m) => encode_message(MessageType::CreateRoom, m),
        ClientMessage::JoinRoom(m) => encode_message(MessageType::JoinRoom, m),
        ClientMessage::LeaveRoom(m) => encode_message(MessageType::LeaveRoom, m),
        ClientMessage::ListRooms => encode_message(MessageType::ListRooms, &()),
        ClientMessage::Ready => encode_message(MessageType::Ready, &()),
        ClientMessage::MakeMove(m) => encode_message(MessageType::MakeMove, m),
        ClientMessage::WebrtcOffer(m) => encode_message(MessageType::WebrtcOffer, m),
        ClientMessage::WebrtcAnswer(m) => encode_message(MessageType::WebrtcAnswer, m),
        ClientMessage::IceCandidate(m) => encode_message(MessageType::IceCandidate, m),
        ClientMessage::RestartGame(m) => encode_message(MessageType::RestartGame, m),
        ClientMessage::RequestRestart(m) => encode_message(MessageType::RequestRestart, m),
        ClientMessage::AcceptRestart(m) => encode_message(MessageType::AcceptRestart, m),
        ClientMessage::RequestUndo(m) => encode_message(MessageType::RequestUndo, m),
        ClientMessage::AcceptUndo(m) => encode_message(MessageType::AcceptUndo, m),
        ClientMessage::Surrender(m) => encode_message(MessageType::Surrender, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::Welcome(m) => encode_message(MessageType::Welcome, m),
        ServerMessage::RoomCreated(m) => encode_message(MessageType::RoomCreated, m),
        ServerMessage::RoomJoined(m) => encode_message(MessageType::RoomJoined, m),
        ServerMessage::RoomError(m) => encode_message(MessageType::RoomError, m),
        ServerMessage::PlayerJoined(m) => encode_message(MessageType::PlayerJoined, m),
        ServerMessage::PlayerLeft(m) => encode_message(MessageType::PlayerLeft, m),
        ServerMessage::RoomList(m) => encode_message(MessageType::RoomList, m),
        ServerMessage::GameStart(m) => encode_message(MessageType::GameStart, m),
        ServerMessage::OpponentMove(m) => encode_message(MessageType::OpponentMove, m),
        ServerMessage::PeerOffer(m) => encode_message(MessageType::PeerOffer, m),
        ServerMessage::PeerAnswer(m) => encode_message(MessageType::PeerAnswer, m),
        ServerMessage::PeerCandidate(m) => encode_message(MessageType::PeerCandidate, m),
        ServerMessage::GameRestart => encode_message(MessageType::GameRestart, &()),
        ServerMessage::RestartRequested(m) => encode_message(MessageType::RestartRequested, m),
        ServerMessage::UndoRequested(m) => encode_message(MessageType::UndoRequested, m),
        ServerMessage::UndoMove => encode_message(MessageType::UndoMove, &()),
        ServerMessage::OpponentSurrender(m) => encode_message(MessageType::OpponentSurrender, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    MessageType::from_byte(data[0]).ok_or(ProtocolError::UnknownMessageType(data[0]))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::CreateRoom => Ok(ClientMessage::CreateRoom(
            decode_payload::<CreateRoomMsg>(data)?,
        )),
        MessageType::JoinRoom => Ok(ClientMessage::JoinRoom(decode_payload::<JoinRoomMsg>(
            data,
        )?)),
        MessageType::LeaveRoom => Ok(ClientMessage::LeaveRoom(decode_payload::<RoomRefMsg>(
            data,
        )?)),
        MessageType::ListRooms => Ok(ClientMessage::ListRooms),
        MessageType::Ready => Ok(ClientMessage::Ready),
        MessageType::MakeMove => Ok(ClientMessage::MakeMove(decode_payload::<MakeMoveMsg>(
            data,
        )?)),
        MessageType::WebrtcOffer => Ok(ClientMessage::WebrtcOffer(
            decode_payload::<WebrtcOfferMsg>(data)?,
        )),
        MessageType::WebrtcAnswer => Ok(ClientMessage::WebrtcAnswer(
            decode_payload::<WebrtcAnswerMsg>(data)?,
        )),
        MessageType::IceCandidate => Ok(ClientMessage::IceCandidate(
            decode_payload::<IceCandidateMsg>(data)?,
        )),
        MessageType::RestartGame => Ok(ClientMessage::RestartGame(decode_payload::<RoomRefMsg>(
            data,
        )?)),
        MessageType::RequestRestart => Ok(ClientMessage::RequestRestart(decode_payload::<
            RoomRefMsg,
        >(data)?)),
        MessageType::AcceptRestart => Ok(ClientMessage::AcceptRestart(
            decode_payload::<RoomRefMsg>(data)?,
        )),
        MessageType::RequestUndo => Ok(ClientMessage::RequestUndo(decode_payload::<RoomRefMsg>(
            data,
        )?)),
        MessageType::AcceptUndo => Ok(ClientMessage::AcceptUndo(decode_payload::<RoomRefMsg>(
            data,
        )?)),
        MessageType::Surrender => Ok(ClientMessage::Surrender(decode_payload::<RoomRefMsg>(
            data,
        )?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::Welcome => Ok(ServerMessage::Welcome(decode_payload::<WelcomeMsg>(data)?)),
        MessageType::RoomCreated => Ok(ServerMessage::RoomCreated(
            decode_payload::<RoomCreatedMsg>(data)?,
        )),
        MessageType::RoomJoined => Ok(ServerMessage::RoomJoined(decode_payload::<RoomJoinedMsg>(
            data,
        )?)),
        MessageType::RoomError => Ok(ServerMessage::RoomError(decode_payload::<RoomErrorMsg>(
            data,
        )?)),
        MessageType::PlayerJoined => Ok(ServerMessage::PlayerJoined(
            decode_payload::<PlayerJoinedMsg>(data)?,
        )),
        MessageType::PlayerLeft => Ok(ServerMessage::PlayerLeft(decode_payload::<PlayerLeftMsg>(
            data,
        )?)),
        MessageType::RoomList => Ok(ServerMessage::RoomList(decode_payload::<RoomListMsg>(
            data,
        )?)),
        MessageType::GameStart => Ok(ServerMessage::GameStart(decode_payload::<GameStartMsg>(
            data,
        )?)),
        MessageType::OpponentMove => Ok(ServerMessage::OpponentMove(
            decode_payload::<OpponentMoveMsg>(data)?,
        )),
        MessageType::PeerOffer => Ok(ServerMessage::PeerOffer(decode_payload::<PeerOfferMsg>(
            data,
        )?)),
        MessageType::PeerAnswer => Ok(ServerMessage::PeerAnswer(decode_payload::<PeerAnswerMsg>(
            data,
        )?)),
        MessageType::PeerCandidate => Ok(ServerMessage::PeerCandidate(decode_payload::<
            PeerCandidateMsg,
        >(data)?)),
        MessageType::GameRestart => Ok(ServerMessage::GameRestart),
        MessageType::RestartRequested => Ok(ServerMessage::RestartRequested(decode_payload::<
            RestartRequestedMsg,
        >(data)?)),
        MessageType::UndoRequested => Ok(ServerMessage::UndoRequested(decode_payload::<
            UndoRequestedMsg,
        >(data)?)),
        MessageType::UndoMove => Ok(ServerMessage::UndoMove),
        MessageType::OpponentSurrender => Ok(ServerMessage::OpponentSurrender(decode_payload::<
            OpponentSurrenderMsg,
        >(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
