#[allow(dead_code)]
mod common;

use common::{TestServer, setup_paired_room, ws_connect};

#[tokio::test]
async fn health_reports_counts() {
    let server = TestServer::new().await;

    let resp = reqwest::get(format!("{}/health", server.base_url()))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["rooms"]["active"], 0);
    assert_eq!(body["connections"]["websocket"], 0);
}

#[tokio::test]
async fn health_sees_connections_and_rooms() {
    let server = TestServer::new().await;
    let (_host, _host_id, _guest, _guest_id, _room_code) = setup_paired_room(&server).await;
    let (_idle, _) = ws_connect(&server.ws_url()).await;

    let resp = reqwest::get(format!("{}/health", server.base_url()))
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["rooms"]["active"], 1);
    assert_eq!(body["rooms"]["players"], 2);
    assert_eq!(body["connections"]["websocket"], 3);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let server = TestServer::new().await;
    let resp = reqwest::get(format!("{}/api/nope", server.base_url()))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
