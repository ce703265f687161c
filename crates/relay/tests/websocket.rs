//! End-to-End-Tests mit echtem WebSocket-Client

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use treffpunkt_observability::RelayMetriken;
use treffpunkt_relay::{RelayConfig, RelayServer, RelayState};

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

struct TestServer {
    url: String,
    state: Arc<RelayState>,
    shutdown_tx: watch::Sender<bool>,
}

/// Startet ein Relay auf einem freien Port
async fn server_starten(config: RelayConfig) -> TestServer {
    let state = RelayState::neu(config, RelayMetriken::neu().unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = RelayServer::neu(Arc::clone(&state), addr, Vec::new());
    tokio::spawn(server.mit_listener_starten(listener, shutdown_rx));

    TestServer {
        url: format!("ws://{addr}/ws"),
        state,
        shutdown_tx,
    }
}

async fn verbinden(server: &TestServer, erwartet_online: usize) -> WsStream {
    let (ws, _) = connect_async(server.url.as_str()).await.unwrap();
    warten_bis(|| server.state.online_anzahl() == erwartet_online).await;
    ws
}

async fn warten_bis(bedingung: impl Fn() -> bool) {
    timeout(TIMEOUT, async {
        while !bedingung() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Bedingung nicht rechtzeitig erfuellt");
}

async fn senden(ws: &mut WsStream, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data });
    ws.send(Message::Text(frame.to_string())).await.unwrap();
}

/// Liest den naechsten Text-Frame als JSON
async fn lesen(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("Timeout beim Warten auf Frame")
            .expect("Stream geschlossen")
            .expect("WebSocket-Fehler");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn identifizieren_und_globale_nachricht() {
    let server = server_starten(RelayConfig::default()).await;
    let mut alice = verbinden(&server, 1).await;

    senden(&mut alice, "FirstConnection", json!({ "from": "alice" })).await;

    let presence = lesen(&mut alice).await;
    assert_eq!(presence["event"], "onActiveUsers");
    assert_eq!(presence["data"][0]["userName"], "alice");
    assert!(presence["data"][0]["socketId"].is_string());

    let verlauf = lesen(&mut alice).await;
    assert_eq!(verlauf["event"], "alice");
    assert_eq!(verlauf["data"]["messages"], json!([]));

    let eigener = lesen(&mut alice).await;
    assert_eq!(eigener["event"], "onReceivedGlobalMessage");
    assert_eq!(eigener["data"]["type"], "connection");
    assert_eq!(eigener["data"]["from"], "alice");

    senden(
        &mut alice,
        "newMessage",
        json!({ "value": "hi", "from": "alice", "to": "global" }),
    )
    .await;

    let nachricht = lesen(&mut alice).await;
    assert_eq!(nachricht["event"], "onReceivedGlobalMessage");
    assert_eq!(nachricht["data"]["type"], "message");
    assert_eq!(nachricht["data"]["value"], "hi");
    assert_eq!(nachricht["data"]["to"], "global");
    assert_eq!(nachricht["data"]["fromId"], eigener["data"]["fromId"]);

    let _ = server.shutdown_tx.send(true);
}

#[tokio::test]
async fn direktnachricht_und_trennung() {
    let server = server_starten(RelayConfig::default()).await;
    let mut alice = verbinden(&server, 1).await;
    let mut bob = verbinden(&server, 2).await;

    senden(&mut alice, "FirstConnection", json!({ "from": "alice" })).await;
    for _ in 0..3 {
        lesen(&mut alice).await;
    }
    // bob sieht alice' Presence und Verbindungs-Eintrag
    assert_eq!(lesen(&mut bob).await["event"], "onActiveUsers");
    assert_eq!(lesen(&mut bob).await["data"]["from"], "alice");

    senden(&mut bob, "FirstConnection", json!({ "from": "bob" })).await;
    for _ in 0..3 {
        lesen(&mut bob).await;
    }
    for _ in 0..2 {
        lesen(&mut alice).await;
    }

    senden(
        &mut alice,
        "newMessage",
        json!({ "value": "psst", "from": "alice", "to": "bob" }),
    )
    .await;
    let direkt = lesen(&mut bob).await;
    assert_eq!(direkt["event"], "bob");
    assert_eq!(direkt["data"]["value"], "psst");
    assert_eq!(direkt["data"]["to"], "bob");

    bob.close(None).await.unwrap();

    let presence = lesen(&mut alice).await;
    assert_eq!(presence["event"], "onActiveUsers");
    assert_eq!(presence["data"].as_array().unwrap().len(), 1);

    let trennung = lesen(&mut alice).await;
    assert_eq!(trennung["data"]["type"], "disconnect");
    assert_eq!(trennung["data"]["from"], "bob");

    let _ = server.shutdown_tx.send(true);
}

#[tokio::test]
async fn ungueltiger_frame_liefert_fehler_nur_an_absender() {
    let server = server_starten(RelayConfig::default()).await;
    let mut alice = verbinden(&server, 1).await;

    alice
        .send(Message::Text("{kein json".to_string()))
        .await
        .unwrap();
    let fehler = lesen(&mut alice).await;
    assert_eq!(fehler["event"], "error");
    assert_eq!(fehler["data"]["code"], "INVALID_REQUEST");

    senden(
        &mut alice,
        "newMessage",
        json!({ "value": "x", "from": "alice", "to": "" }),
    )
    .await;
    assert_eq!(lesen(&mut alice).await["event"], "error");

    // Verbindung bleibt nutzbar
    senden(&mut alice, "FirstConnection", json!({ "from": "alice" })).await;
    assert_eq!(lesen(&mut alice).await["event"], "onActiveUsers");
    assert_eq!(server.state.verlauf_laenge(), 1);

    let _ = server.shutdown_tx.send(true);
}

#[tokio::test]
async fn volles_relay_lehnt_upgrade_ab() {
    let server = server_starten(RelayConfig {
        max_clients: 1,
        ..RelayConfig::default()
    })
    .await;
    let _alice = verbinden(&server, 1).await;

    match connect_async(server.url.as_str()).await {
        Err(tokio_tungstenite::tungstenite::Error::Http(antwort)) => {
            assert_eq!(antwort.status(), 503);
        }
        anderes => panic!("HTTP 503 erwartet, erhalten: {:?}", anderes.map(|_| ())),
    }

    let _ = server.shutdown_tx.send(true);
}

#[tokio::test]
async fn shutdown_trennt_alle_sessions() {
    let server = server_starten(RelayConfig::default()).await;
    let mut alice = verbinden(&server, 1).await;

    server.shutdown_tx.send(true).unwrap();

    let ende = timeout(TIMEOUT, async {
        loop {
            match alice.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(ende.is_ok());
    warten_bis(|| server.state.online_anzahl() == 0).await;
}
