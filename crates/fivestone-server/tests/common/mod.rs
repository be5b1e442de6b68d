use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use fivestone_core::net::messages::{
    ClientMessage, CreateRoomMsg, JoinRoomMsg, RoomCreatedMsg, RoomErrorMsg, RoomJoinedMsg,
    ServerMessage,
};
use fivestone_core::net::protocol::{
    PROTOCOL_VERSION, decode_server_message, encode_client_message,
};
use fivestone_core::player::PlayerId;
use fivestone_core::room::GameKind;

use fivestone_server::build_app;
use fivestone_server::config::ServerConfig;

pub struct TestServer {
    pub addr: SocketAddr,
    _serve: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server on an ephemeral port with default config.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _serve: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connect a WebSocket client and consume the Welcome frame.
/// Returns the stream plus the player id the server issued.
pub async fn ws_connect(url: &str) -> (WsStream, PlayerId) {
    let (mut stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    let msg = ws_read_msg(&mut stream).await;
    match msg {
        ServerMessage::Welcome(w) => (stream, w.player_id),
        other => panic!("Expected Welcome, got: {other:?}"),
    }
}

/// Send a ClientMessage over a WS stream.
pub async fn ws_send(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Read the next ServerMessage from a WS stream (5s timeout).
pub async fn ws_read_msg(stream: &mut WsStream) -> ServerMessage {
    let deadline = Duration::from_secs(5);
    let data = tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message");
    decode_server_message(&data).unwrap()
}

/// Try to read a ServerMessage, returning None on timeout.
pub async fn ws_try_read(stream: &mut WsStream, timeout_ms: u64) -> Option<ServerMessage> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return decode_server_message(&data).unwrap();
                },
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Create a room and consume the RoomCreated reply plus the room-list
/// broadcast that follows it. Returns the RoomCreated payload.
pub async fn ws_create_room(stream: &mut WsStream, game: GameKind) -> RoomCreatedMsg {
    ws_send(
        stream,
        &ClientMessage::CreateRoom(CreateRoomMsg {
            game,
            protocol_version: PROTOCOL_VERSION,
        }),
    )
    .await;

    let created = match ws_read_msg(stream).await {
        ServerMessage::RoomCreated(m) => m,
        other => panic!("Expected RoomCreated, got: {other:?}"),
    };
    match ws_read_msg(stream).await {
        ServerMessage::RoomList(_) => {},
        other => panic!("Expected RoomList after create, got: {other:?}"),
    }
    created
}

/// Join a room and consume the RoomJoined reply plus the room-list
/// broadcast that follows it. Returns the RoomJoined payload.
pub async fn ws_join_room(stream: &mut WsStream, room_code: &str) -> RoomJoinedMsg {
    ws_send(
        stream,
        &ClientMessage::JoinRoom(JoinRoomMsg {
            room_code: room_code.to_string(),
            protocol_version: PROTOCOL_VERSION,
        }),
    )
    .await;

    let joined = match ws_read_msg(stream).await {
        ServerMessage::RoomJoined(m) => m,
        other => panic!("Expected RoomJoined, got: {other:?}"),
    };
    match ws_read_msg(stream).await {
        ServerMessage::RoomList(_) => {},
        other => panic!("Expected RoomList after join, got: {other:?}"),
    }
    joined
}

/// Join a room expecting an error frame back.
pub async fn ws_join_room_expect_error(stream: &mut WsStream, room_code: &str) -> RoomErrorMsg {
    ws_send(
        stream,
        &ClientMessage::JoinRoom(JoinRoomMsg {
            room_code: room_code.to_string(),
            protocol_version: PROTOCOL_VERSION,
        }),
    )
    .await;

    match ws_read_msg(stream).await {
        ServerMessage::RoomError(e) => e,
        other => panic!("Expected RoomError, got: {other:?}"),
    }
}

/// Set up a full two-player room: host creates, guest joins, broadcast
/// noise consumed on both streams.
/// Returns (host, host_id, guest, guest_id, room_code).
pub async fn setup_paired_room(server: &TestServer) -> (WsStream, PlayerId, WsStream, PlayerId, String) {
    let (mut host, host_id) = ws_connect(&server.ws_url()).await;
    let created = ws_create_room(&mut host, GameKind::FiveInARow).await;
    let room_code = created.room_code;

    let (mut guest, guest_id) = ws_connect(&server.ws_url()).await;
    let _ = ws_join_room(&mut guest, &room_code).await;

    // Host sees the guest arrive plus the updated room list
    match ws_read_msg(&mut host).await {
        ServerMessage::PlayerJoined(m) => assert_eq!(m.player_id, guest_id),
        other => panic!("Expected PlayerJoined, got: {other:?}"),
    }
    match ws_read_msg(&mut host).await {
        ServerMessage::RoomList(_) => {},
        other => panic!("Expected RoomList, got: {other:?}"),
    }

    (host, host_id, guest, guest_id, room_code)
}
