#[allow(dead_code)]
mod common;

use fivestone_core::net::messages::{
    ClientMessage, IceCandidateMsg, MakeMoveMsg, RoomRefMsg, ServerMessage, WebrtcAnswerMsg,
    WebrtcOfferMsg,
};
use fivestone_core::player::Stone;

use common::{TestServer, setup_paired_room, ws_read_msg, ws_send, ws_try_read};

#[tokio::test]
async fn moves_relay_to_opponent_without_attribution() {
    let server = TestServer::new().await;
    let (mut host, _host_id, mut guest, _guest_id, room_code) = setup_paired_room(&server).await;

    ws_send(
        &mut host,
        &ClientMessage::MakeMove(MakeMoveMsg {
            room_code: room_code.clone(),
            row: 7,
            col: 7,
        }),
    )
    .await;

    match ws_read_msg(&mut guest).await {
        ServerMessage::OpponentMove(m) => assert_eq!((m.row, m.col), (7, 7)),
        other => panic!("Expected OpponentMove, got: {other:?}"),
    }
    // The sender hears nothing back
    assert!(ws_try_read(&mut host, 300).await.is_none());
}

#[tokio::test]
async fn moves_preserve_order() {
    let server = TestServer::new().await;
    let (mut host, _host_id, mut guest, _guest_id, room_code) = setup_paired_room(&server).await;

    for i in 0..5u16 {
        ws_send(
            &mut host,
            &ClientMessage::MakeMove(MakeMoveMsg {
                room_code: room_code.clone(),
                row: i,
                col: 14 - i,
            }),
        )
        .await;
    }
    for i in 0..5u16 {
        match ws_read_msg(&mut guest).await {
            ServerMessage::OpponentMove(m) => {
                assert_eq!(m.row, i);
                assert_eq!(m.col, 14 - i);
            },
            other => panic!("Expected OpponentMove, got: {other:?}"),
        }
    }
}

#[tokio::test]
async fn signaling_carries_sender_attribution() {
    let server = TestServer::new().await;
    let (mut host, host_id, mut guest, guest_id, room_code) = setup_paired_room(&server).await;

    ws_send(
        &mut host,
        &ClientMessage::WebrtcOffer(WebrtcOfferMsg {
            room_code: room_code.clone(),
            offer: "v=0 host-offer".to_string(),
        }),
    )
    .await;
    match ws_read_msg(&mut guest).await {
        ServerMessage::PeerOffer(m) => {
            assert_eq!(m.from, host_id);
            assert_eq!(m.offer, "v=0 host-offer");
        },
        other => panic!("Expected PeerOffer, got: {other:?}"),
    }

    ws_send(
        &mut guest,
        &ClientMessage::WebrtcAnswer(WebrtcAnswerMsg {
            room_code: room_code.clone(),
            answer: "v=0 guest-answer".to_string(),
        }),
    )
    .await;
    match ws_read_msg(&mut host).await {
        ServerMessage::PeerAnswer(m) => {
            assert_eq!(m.from, guest_id);
            assert_eq!(m.answer, "v=0 guest-answer");
        },
        other => panic!("Expected PeerAnswer, got: {other:?}"),
    }

    ws_send(
        &mut host,
        &ClientMessage::IceCandidate(IceCandidateMsg {
            room_code: room_code.clone(),
            candidate: "candidate:0 1 UDP".to_string(),
        }),
    )
    .await;
    match ws_read_msg(&mut guest).await {
        ServerMessage::PeerCandidate(m) => assert_eq!(m.from, host_id),
        other => panic!("Expected PeerCandidate, got: {other:?}"),
    }
}

#[tokio::test]
async fn restart_consensus_over_live_sockets() {
    let server = TestServer::new().await;
    let (mut host, host_id, mut guest, _guest_id, room_code) = setup_paired_room(&server).await;

    // Get the room into Playing first
    ws_send(&mut host, &ClientMessage::Ready).await;
    ws_send(&mut guest, &ClientMessage::Ready).await;
    let _ = ws_read_msg(&mut host).await; // GameStart
    let _ = ws_read_msg(&mut guest).await; // GameStart

    // First request: pending only
    ws_send(
        &mut host,
        &ClientMessage::RequestRestart(RoomRefMsg {
            room_code: room_code.clone(),
        }),
    )
    .await;
    match ws_read_msg(&mut guest).await {
        ServerMessage::RestartRequested(m) => assert_eq!(m.from, host_id),
        other => panic!("Expected RestartRequested, got: {other:?}"),
    }
    assert!(
        ws_try_read(&mut host, 300).await.is_none(),
        "no GameRestart before quorum"
    );

    // Acceptance completes the gate; the whole room restarts
    ws_send(
        &mut guest,
        &ClientMessage::AcceptRestart(RoomRefMsg {
            room_code: room_code.clone(),
        }),
    )
    .await;
    assert!(matches!(
        ws_read_msg(&mut host).await,
        ServerMessage::GameRestart
    ));
    assert!(matches!(
        ws_read_msg(&mut guest).await,
        ServerMessage::GameRestart
    ));

    // Readiness was cleared: both must re-signal before a new start
    ws_send(&mut host, &ClientMessage::Ready).await;
    assert!(ws_try_read(&mut host, 300).await.is_none());
    ws_send(&mut guest, &ClientMessage::Ready).await;
    assert!(matches!(
        ws_read_msg(&mut host).await,
        ServerMessage::GameStart(_)
    ));
    assert!(matches!(
        ws_read_msg(&mut guest).await,
        ServerMessage::GameStart(_)
    ));
}

#[tokio::test]
async fn unconditional_restart_reaches_both_sides() {
    let server = TestServer::new().await;
    let (mut host, _host_id, mut guest, _guest_id, room_code) = setup_paired_room(&server).await;

    ws_send(
        &mut host,
        &ClientMessage::RestartGame(RoomRefMsg {
            room_code: room_code.clone(),
        }),
    )
    .await;
    assert!(matches!(
        ws_read_msg(&mut host).await,
        ServerMessage::GameRestart
    ));
    assert!(matches!(
        ws_read_msg(&mut guest).await,
        ServerMessage::GameRestart
    ));
}

#[tokio::test]
async fn undo_request_and_accept_flow() {
    let server = TestServer::new().await;
    let (mut host, host_id, mut guest, _guest_id, room_code) = setup_paired_room(&server).await;

    ws_send(
        &mut host,
        &ClientMessage::RequestUndo(RoomRefMsg {
            room_code: room_code.clone(),
        }),
    )
    .await;
    match ws_read_msg(&mut guest).await {
        ServerMessage::UndoRequested(m) => assert_eq!(m.from, host_id),
        other => panic!("Expected UndoRequested, got: {other:?}"),
    }
    assert!(ws_try_read(&mut host, 200).await.is_none());

    ws_send(
        &mut guest,
        &ClientMessage::AcceptUndo(RoomRefMsg {
            room_code: room_code.clone(),
        }),
    )
    .await;
    assert!(matches!(
        ws_read_msg(&mut host).await,
        ServerMessage::UndoMove
    ));
    assert!(matches!(
        ws_read_msg(&mut guest).await,
        ServerMessage::UndoMove
    ));
}

#[tokio::test]
async fn surrender_awards_the_opponent_seat_stone() {
    let server = TestServer::new().await;
    let (mut host, _host_id, mut guest, _guest_id, room_code) = setup_paired_room(&server).await;

    // Host sits at seat 0, so the winning guest at seat 1 holds white
    ws_send(
        &mut host,
        &ClientMessage::Surrender(RoomRefMsg {
            room_code: room_code.clone(),
        }),
    )
    .await;
    match ws_read_msg(&mut guest).await {
        ServerMessage::OpponentSurrender(m) => assert_eq!(m.winner, Stone::White),
        other => panic!("Expected OpponentSurrender, got: {other:?}"),
    }
    assert!(
        ws_try_read(&mut host, 300).await.is_none(),
        "surrendering side is not notified"
    );
}

#[tokio::test]
async fn relay_for_a_foreign_room_is_rejected() {
    let server = TestServer::new().await;
    let (mut host, _host_id, _guest, _guest_id, _room_code) = setup_paired_room(&server).await;

    ws_send(
        &mut host,
        &ClientMessage::MakeMove(MakeMoveMsg {
            room_code: "ZZZZZZ".to_string(),
            row: 0,
            col: 0,
        }),
    )
    .await;
    match ws_read_msg(&mut host).await {
        ServerMessage::RoomError(e) => assert_eq!(e.code, "not_in_room"),
        other => panic!("Expected RoomError, got: {other:?}"),
    }
}
