//! Relay sessions over a real WebSocket against a local scripted relay.

use futures::{SinkExt, StreamExt};
use nostr::Event;
use nostr_client::{
    FanOut, Filter, RelayMessage, RelaySession, SessionConfig, SessionState, WebSocketConnector,
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

fn profile(id: &str) -> Event {
    Event {
        id: id.to_string(),
        pubkey: "ab".repeat(32),
        created_at: Some(1_700_000_000),
        kind: 0,
        content: Some("{}".to_string()),
        ..Default::default()
    }
}

/// Start a relay answering each REQ with `events` and, if `eose`, an EOSE.
/// Every frame the relay receives is forwarded on the returned channel.
async fn start_relay(events: Vec<Event>, eose: bool) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let events = events.clone();
            let seen_tx = seen_tx.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    let Message::Text(text) = msg else {
                        continue;
                    };
                    let text = text.as_str().to_owned();
                    let _ = seen_tx.send(text.clone());

                    let frame: Value = serde_json::from_str(&text).unwrap();
                    if frame[0] != "REQ" {
                        continue;
                    }
                    let sub = frame[1].as_str().unwrap().to_string();
                    for event in &events {
                        let out = json!(["EVENT", sub, event]).to_string();
                        if ws.send(Message::text(out)).await.is_err() {
                            return;
                        }
                    }
                    if eose {
                        let out = json!(["EOSE", sub]).to_string();
                        let _ = ws.send(Message::text(out)).await;
                    }
                }
            });
        }
    });

    (addr, seen_rx)
}

fn config(timeout_ms: u64) -> SessionConfig {
    SessionConfig {
        timeout: Duration::from_millis(timeout_ms),
        connect_timeout: Duration::from_secs(2),
    }
}

#[tokio::test]
async fn test_session_over_websocket() {
    init_tracing();
    let (addr, mut seen) = start_relay(vec![profile("e1"), profile("e2")], true).await;
    let url = format!("ws://{}", addr);

    let session = RelaySession::new(&url, config(2_000));
    let sub_id = session.subscription_id().to_string();
    let outcome = session
        .run(&WebSocketConnector, &Filter::new().kinds(vec![0]).limit(2))
        .await;

    assert_eq!(outcome.state, SessionState::Closed);
    assert!(!outcome.timed_out);
    let ids: Vec<&str> = outcome.records.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["e1", "e2"]);

    // REQ then CLOSE, both for our subscription
    let req = seen.recv().await.unwrap();
    assert_eq!(
        serde_json::from_str::<Value>(&req).unwrap(),
        json!(["REQ", sub_id, {"kinds": [0], "limit": 2}])
    );
    let close = tokio::time::timeout(Duration::from_secs(2), seen.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(close, json!(["CLOSE", sub_id]).to_string());
}

#[tokio::test]
async fn test_silent_relay_times_out_with_records() {
    init_tracing();
    let (addr, _seen) = start_relay(vec![profile("e1")], false).await;
    let url = format!("ws://{}", addr);

    let outcome = RelaySession::new(&url, config(300))
        .run(&WebSocketConnector, &Filter::new())
        .await;

    assert_eq!(outcome.state, SessionState::Closed);
    assert!(outcome.timed_out);
    assert_eq!(outcome.records.len(), 1);
}

#[tokio::test]
async fn test_unreachable_relay_fails() {
    init_tracing();
    // Bind then drop to get a port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let outcome = RelaySession::new(format!("ws://{}", addr), config(300))
        .run(&WebSocketConnector, &Filter::new())
        .await;

    assert_eq!(outcome.state, SessionState::Failed);
    assert!(outcome.records.is_empty());
    assert!(outcome.error.is_some());
}

#[tokio::test]
async fn test_fanout_over_websocket_merges_relays() {
    init_tracing();
    let (a, _) = start_relay(vec![profile("shared"), profile("only-a")], true).await;
    let (b, _) = start_relay(vec![profile("shared")], true).await;

    let fanout = FanOut::new(Arc::new(WebSocketConnector), config(2_000));
    let relays = vec![format!("ws://{}", a), format!("ws://{}", b)];
    let records = fanout.fetch(&Filter::new(), &relays).await;

    let mut ids: Vec<&str> = records.iter().map(|e| e.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["only-a", "shared"]);
}

#[test]
fn test_relay_frames_parse() {
    let frame = json!(["EVENT", "sub", profile("x")]).to_string();
    assert!(matches!(
        RelayMessage::from_json(&frame),
        Ok(RelayMessage::Event { .. })
    ));
}
