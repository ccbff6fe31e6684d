//! Wire-level tests for the Centrifugo client against a local WebSocket
//! server.
//!
//! These run on real time: the sockets are real, so paused time would let
//! the connect timeout fire while the runtime waits on I/O.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use orderbook_sync::client::{CentrifugoClient, Transport, TransportEvent};
use orderbook_sync::types::{ConnectionState, Side};
use orderbook_sync::{Config, Error, OrderbookSession};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

const CHANNEL: &str = "orderbook:BTC-USD";

type ServerSocket = WebSocketStream<TcpStream>;

async fn listen() -> (TcpListener, Config) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = Config::new(format!("ws://{}/connection/websocket", addr), "BTC-USD")
        .with_token("test-token")
        .with_connect_timeout(Duration::from_secs(2));
    (listener, config)
}

async fn accept(listener: &TcpListener) -> ServerSocket {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn recv_json(socket: &mut ServerSocket) -> Value {
    loop {
        match socket.next().await.unwrap().unwrap() {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Close(_) => panic!("client closed the socket"),
            _ => continue,
        }
    }
}

async fn send_json(socket: &mut ServerSocket, value: Value) {
    socket.send(Message::Text(value.to_string())).await.unwrap();
}

/// Answer the connect command and return the socket
async fn accept_client(listener: &TcpListener) -> ServerSocket {
    let mut socket = accept(listener).await;
    let connect = recv_json(&mut socket).await;
    assert_eq!(connect["connect"]["token"], "test-token");
    let id = connect["id"].clone();
    send_json(
        &mut socket,
        json!({"id": id, "connect": {"client": "c-1", "version": "5.0.0"}}),
    )
    .await;
    socket
}

/// Read the subscribe command for [`CHANNEL`] and return its id
async fn expect_subscribe(socket: &mut ServerSocket) -> Value {
    let subscribe = recv_json(socket).await;
    assert_eq!(subscribe["subscribe"]["channel"], CHANNEL);
    subscribe["id"].clone()
}

fn publication(data: Value) -> Value {
    json!({"push": {"channel": CHANNEL, "pub": {"data": data}}})
}

async fn next_event(client: &mut CentrifugoClient) -> TransportEvent {
    timeout(Duration::from_secs(5), client.next_event())
        .await
        .expect("timed out waiting for event")
        .expect("transport finished")
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_connect_subscribe_and_receive() {
    let (listener, config) = listen().await;
    let server = tokio::spawn(async move {
        let mut socket = accept_client(&listener).await;
        let id = expect_subscribe(&mut socket).await;

        // Reply, ping and publication batched in one frame
        let frame = format!(
            "{}\n{{}}\n{}",
            json!({"id": id, "subscribe": {}}),
            publication(json!({"bids": [["100", "1"]], "asks": [], "sequence": 1})),
        );
        socket.send(Message::Text(frame)).await.unwrap();

        // Pong for the ping
        assert_eq!(recv_json(&mut socket).await, json!({}));
        socket
    });

    let mut client = CentrifugoClient::new(config);
    tokio_test::assert_ok!(client.connect().await);
    assert!(client.is_connected());
    assert_eq!(next_event(&mut client).await, TransportEvent::Connecting);
    assert_eq!(next_event(&mut client).await, TransportEvent::Connected);

    tokio_test::assert_ok!(client.subscribe(CHANNEL).await);
    assert!(client.subscriptions().contains(CHANNEL));

    match next_event(&mut client).await {
        TransportEvent::Publication { channel, data } => {
            assert_eq!(channel, CHANNEL);
            assert_eq!(data["sequence"], 1);
        }
        other => panic!("unexpected event: {:?}", other),
    }

    let _socket = server.await.unwrap();
    tokio_test::assert_ok!(client.disconnect().await);
    assert!(!client.is_connected());
    assert!(matches!(
        next_event(&mut client).await,
        TransportEvent::Disconnected { .. }
    ));
}

#[tokio::test]
async fn test_subscription_error_is_reported() {
    let (listener, config) = listen().await;
    let server = tokio::spawn(async move {
        let mut socket = accept_client(&listener).await;
        let id = expect_subscribe(&mut socket).await;
        send_json(
            &mut socket,
            json!({"id": id, "error": {"code": 103, "message": "permission denied"}}),
        )
        .await;
        socket
    });

    let mut client = CentrifugoClient::new(config);
    tokio_test::assert_ok!(client.connect().await);
    next_event(&mut client).await;
    next_event(&mut client).await;
    tokio_test::assert_ok!(client.subscribe(CHANNEL).await);

    match next_event(&mut client).await {
        TransportEvent::SubscriptionError { channel, message } => {
            assert_eq!(channel, CHANNEL);
            assert!(message.contains("permission denied"));
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(!client.subscriptions().contains(CHANNEL));

    let _socket = server.await.unwrap();
}

#[tokio::test]
async fn test_server_disconnect_push() {
    let (listener, config) = listen().await;
    let server = tokio::spawn(async move {
        let mut socket = accept_client(&listener).await;
        send_json(
            &mut socket,
            json!({"push": {"disconnect": {"code": 3001, "reason": "shutdown"}}}),
        )
        .await;
        socket
    });

    let mut client = CentrifugoClient::new(config);
    tokio_test::assert_ok!(client.connect().await);
    next_event(&mut client).await;
    next_event(&mut client).await;

    match next_event(&mut client).await {
        TransportEvent::Disconnected { reason } => assert!(reason.contains("shutdown")),
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(!client.is_connected());
    tokio_test::assert_err!(client.subscribe(CHANNEL).await);

    let _socket = server.await.unwrap();
}

#[tokio::test]
async fn test_connect_rejected_by_server() {
    let (listener, config) = listen().await;
    let server = tokio::spawn(async move {
        let mut socket = accept(&listener).await;
        let connect = recv_json(&mut socket).await;
        send_json(
            &mut socket,
            json!({"id": connect["id"], "error": {"code": 109, "message": "token expired"}}),
        )
        .await;
        socket
    });

    let mut client = CentrifugoClient::new(config);
    match client.connect().await {
        Err(Error::Server { code, message }) => {
            assert_eq!(code, 109);
            assert_eq!(message, "token expired");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(next_event(&mut client).await, TransportEvent::Connecting);
    assert!(matches!(
        next_event(&mut client).await,
        TransportEvent::Disconnected { .. }
    ));

    let _socket = server.await.unwrap();
}

#[tokio::test]
async fn test_session_end_to_end() {
    let (listener, config) = listen().await;
    let server = tokio::spawn(async move {
        let mut socket = accept_client(&listener).await;
        let id = expect_subscribe(&mut socket).await;
        send_json(&mut socket, json!({"id": id, "subscribe": {}})).await;
        send_json(
            &mut socket,
            publication(json!({
                "bids": [["100", "1"], ["99", "2"], ["98", "3"]],
                "asks": [["101", "1"], ["102", "2"]],
                "sequence": 1,
            })),
        )
        .await;
        // Hold the socket until the client leaves
        while let Some(Ok(frame)) = socket.next().await {
            if let Message::Close(_) = frame {
                break;
            }
        }
    });

    let session = OrderbookSession::centrifugo(config).unwrap();
    let book = session.handle();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let task = tokio::spawn(session.run(async move {
        let _ = stopped.await;
    }));

    wait_for(|| book.last_sequence() == 1).await;
    assert_eq!(book.connection_state(), ConnectionState::Connected);

    let bids = book.display_rows(Side::Bid, 11);
    let totals: Vec<_> = bids.iter().map(|r| r.total.as_str()).collect();
    assert_eq!(totals, vec!["1.0000", "3.0000", "6.0000"]);
    let asks = book.display_rows(Side::Ask, 11);
    assert_eq!(asks.last().unwrap().price, "101");

    let _ = stop.send(());
    timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    assert_eq!(book.connection_state(), ConnectionState::Disconnected);
    timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
}
