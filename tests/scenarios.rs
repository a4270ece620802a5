//! End-to-end scenarios against an in-memory duplex pipe, standing in for
//! a real socket on the other end of the handshake.

mod common;

use std::time::Duration;

use fastwebsockets::{Frame, OpCode, Payload};
use http::Uri;
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};

use wsclient::{connect_with_io, ConnectConfig, Event, JsonMode, SessionConfig, WSError};

fn test_uri() -> Uri {
    "ws://localhost/chat".parse().unwrap()
}

#[tokio::test]
async fn s1_receive_text_then_disconnect() {
    let (client_io, server_io) = tokio::io::duplex(8192);
    let server = tokio::spawn(async move {
        let mut ws = common::accept_websocket(server_io).await;
        ws.write_frame(Frame::text(Payload::Owned(b"SERVER_MESSAGE".to_vec())))
            .await
            .unwrap();
        ws.write_frame(Frame::close(1000, b"")).await.unwrap();
    });

    let session = connect_with_io(test_uri(), TokioIo::new(client_io), ConnectConfig::new())
        .await
        .expect("handshake succeeds");

    let text = session.receive_text(Some(Duration::from_secs(1))).await.unwrap();
    assert_eq!(text, "SERVER_MESSAGE");

    let err = session.receive(Some(Duration::from_secs(1))).await.unwrap_err();
    match err {
        WSError::Disconnect { code, reason } => {
            assert_eq!(code, 1000);
            assert_eq!(reason, "");
        }
        other => panic!("expected Disconnect, got {other:?}"),
    }

    server.await.unwrap();
}

#[tokio::test]
async fn s2_send_text_reaches_peer_unmasked_on_arrival() {
    let (client_io, server_io) = tokio::io::duplex(8192);
    let server = tokio::spawn(async move {
        let mut ws = common::accept_websocket(server_io).await;
        let frame = ws.read_frame().await.unwrap();
        assert_eq!(frame.opcode, OpCode::Text);
        assert_eq!(frame.payload.as_ref(), b"CLIENT_MESSAGE");
    });

    let session = connect_with_io(test_uri(), TokioIo::new(client_io), ConnectConfig::new())
        .await
        .expect("handshake succeeds");

    session.send_text("CLIENT_MESSAGE").await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn s3_invalid_type_is_consumed_not_requeued() {
    let (client_io, server_io) = tokio::io::duplex(8192);
    let server = tokio::spawn(async move {
        let mut ws = common::accept_websocket(server_io).await;
        ws.write_frame(Frame::binary(Payload::Owned(b"X".to_vec()))).await.unwrap();
        ws.write_frame(Frame::binary(Payload::Owned(b"X".to_vec()))).await.unwrap();
        // Keep the connection open until the client has drained both messages.
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    let session = connect_with_io(test_uri(), TokioIo::new(client_io), ConnectConfig::new())
        .await
        .expect("handshake succeeds");

    let err = session
        .receive_text(Some(Duration::from_secs(1)))
        .await
        .unwrap_err();
    match err {
        WSError::InvalidTypeReceived { event: Event::Bytes(bytes) } => assert_eq!(bytes, b"X".to_vec()),
        other => panic!("expected InvalidTypeReceived, got {other:?}"),
    }

    let bytes = session.receive_bytes(Some(Duration::from_secs(1))).await.unwrap();
    assert_eq!(bytes, b"X".to_vec());

    server.await.unwrap();
}

#[tokio::test]
async fn s4_ping_resolves_on_matching_pong() {
    let (client_io, server_io) = tokio::io::duplex(8192);
    let server = tokio::spawn(async move {
        let mut ws = common::accept_websocket(server_io).await;
        // `read_frame` auto-replies Pong to the inbound Ping before
        // returning it here; the test only needs to drive the read.
        let frame = ws.read_frame().await.unwrap();
        assert_eq!(frame.opcode, OpCode::Ping);
    });

    let session = connect_with_io(test_uri(), TokioIo::new(client_io), ConnectConfig::new())
        .await
        .expect("handshake succeeds");

    let signal = session.ping(Vec::new()).await.unwrap();
    let satisfied = tokio::time::timeout(Duration::from_secs(1), signal.wait())
        .await
        .expect("ping did not resolve in time");
    assert!(satisfied);

    server.await.unwrap();
}

#[tokio::test]
async fn s5_keepalive_declares_dead_peer() {
    let (client_io, server_io) = tokio::io::duplex(8192);
    let _server = tokio::spawn(async move {
        // Accepts the handshake and the subsequent ping writes, but never
        // reads them: no Pong ever comes back.
        let _ws = common::accept_websocket(server_io).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let config = ConnectConfig::new().with_session_config(
        SessionConfig::new()
            .with_keepalive_ping_interval(Some(Duration::from_millis(100)))
            .with_keepalive_ping_timeout(Duration::from_millis(100)),
    );
    let session = connect_with_io(test_uri(), TokioIo::new(client_io), config)
        .await
        .expect("handshake succeeds");

    let err = tokio::time::timeout(
        Duration::from_millis(500),
        session.receive(Some(Duration::from_millis(500))),
    )
    .await
    .expect("keepalive should have failed the session by now")
    .unwrap_err();

    assert!(matches!(err, WSError::NetworkError(_)), "expected NetworkError, got {err:?}");
}

#[tokio::test]
async fn s6_upgrade_error_carries_response_status() {
    let (client_io, server_io) = tokio::io::duplex(8192);
    let server = tokio::spawn(async move {
        common::reject_websocket(server_io, 400, "Bad Request", "invalid subprotocol").await;
    });

    let err = connect_with_io(test_uri(), TokioIo::new(client_io), ConnectConfig::new())
        .await
        .expect_err("non-101 response should fail the handshake");

    match err {
        WSError::Upgrade { response, body } => {
            assert_eq!(response.status.as_u16(), 400);
            assert_eq!(body.as_ref(), b"invalid subprotocol");
        }
        other => panic!("expected Upgrade error, got {other:?}"),
    }

    server.await.unwrap();
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Greeting {
    from: String,
    count: u32,
}

#[tokio::test]
async fn s7_json_round_trip_text_and_binary() {
    let (client_io, server_io) = tokio::io::duplex(8192);
    let server = tokio::spawn(async move {
        let mut ws = common::accept_websocket(server_io).await;
        let text_frame = ws.read_frame().await.unwrap();
        assert_eq!(text_frame.opcode, OpCode::Text);
        ws.write_frame(Frame::text(Payload::Owned(text_frame.payload.to_vec()))).await.unwrap();

        let binary_frame = ws.read_frame().await.unwrap();
        assert_eq!(binary_frame.opcode, OpCode::Binary);
        ws.write_frame(Frame::binary(Payload::Owned(binary_frame.payload.to_vec()))).await.unwrap();
    });

    let session = connect_with_io(test_uri(), TokioIo::new(client_io), ConnectConfig::new())
        .await
        .expect("handshake succeeds");

    let sent = Greeting { from: "client".to_string(), count: 1 };
    session.send_json(&sent, JsonMode::Text).await.unwrap();
    let received: Greeting = session
        .receive_json(Some(Duration::from_secs(1)), JsonMode::Text)
        .await
        .unwrap();
    assert_eq!(received, sent);

    let sent = Greeting { from: "client".to_string(), count: 2 };
    session.send_json(&sent, JsonMode::Binary).await.unwrap();
    let received: Greeting = session
        .receive_json(Some(Duration::from_secs(1)), JsonMode::Binary)
        .await
        .unwrap();
    assert_eq!(received, sent);

    server.await.unwrap();
}
