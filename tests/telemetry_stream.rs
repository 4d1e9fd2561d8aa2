use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use connect_four_showdown::telemetry::{Ingestor, StreamEvent, StreamState, TelemetryStream};

const RECONNECT: Duration = Duration::from_millis(300);

fn record(backend: &str, latency_ms: f64) -> String {
    serde_json::json!({
        "type": "telemetry",
        "record": {"backend": backend, "latency_ms": latency_ms, "value": 0.2, "fanout": 7.0}
    })
    .to_string()
}

async fn telemetry_ws(
    ws: WebSocketUpgrade,
    State(connections): State<Arc<AtomicUsize>>,
) -> impl IntoResponse {
    let n = connections.fetch_add(1, Ordering::SeqCst);
    ws.on_upgrade(move |socket| feed(socket, n))
}

/// First connection: one good record among junk, then the server hangs up.
/// Later connections: two good records, then stay open.
async fn feed(mut socket: WebSocket, connection: usize) {
    if connection == 0 {
        for text in [
            record("cpu", 40.0),
            "not json".to_string(),
            r#"{"type": "hello"}"#.to_string(),
            r#"{"type": "telemetry"}"#.to_string(),
            r#"{"type": "telemetry", "record": {"backend": "cpu"}}"#.to_string(),
        ] {
            if socket.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    for text in [record("gpu", 3.0), record("gpu", 2.5)] {
        if socket.send(Message::Text(text.into())).await.is_err() {
            return;
        }
    }
    while let Some(Ok(_)) = socket.recv().await {}
}

async fn serve() -> (std::net::SocketAddr, Arc<AtomicUsize>) {
    let connections = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/ws/telemetry", get(telemetry_ws))
        .with_state(Arc::clone(&connections));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, connections)
}

async fn next_event(rx: &mut mpsc::Receiver<StreamEvent>) -> StreamEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("stream event in time")
        .expect("stream still running")
}

#[tokio::test]
async fn test_reconnects_after_delay_and_keeps_appending() {
    let (addr, connections) = serve().await;
    let url = Url::parse(&format!("ws://{addr}/ws/telemetry")).unwrap();
    let stream = TelemetryStream::new(url, RECONNECT);

    let (tx, mut rx) = mpsc::channel(64);
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(stream.run(tx, shutdown.clone()));
    let mut ingestor = Ingestor::new(128);

    // First connection: one sample, junk dropped, then closed
    let mut states = Vec::new();
    let mut closed_at = None;
    while closed_at.is_none() {
        let event = next_event(&mut rx).await;
        if let StreamEvent::State(state) = &event {
            states.push(*state);
            if *state == StreamState::Closed {
                closed_at = Some(Instant::now());
            }
        }
        ingestor.apply(event);
    }
    assert_eq!(
        states,
        vec![StreamState::Connecting, StreamState::Open, StreamState::Closed]
    );
    assert_eq!(ingestor.samples().len(), 1);
    assert_eq!(ingestor.state(), StreamState::Closed);

    // Reconnect only after the fixed delay
    let event = next_event(&mut rx).await;
    assert!(matches!(event, StreamEvent::State(StreamState::Connecting)));
    let waited = closed_at.unwrap().elapsed();
    assert!(waited >= RECONNECT - Duration::from_millis(50), "waited {waited:?}");
    ingestor.apply(event);

    while ingestor.samples().len() < 3 {
        ingestor.apply(next_event(&mut rx).await);
    }
    assert_eq!(ingestor.state(), StreamState::Open);
    assert_eq!(connections.load(Ordering::SeqCst), 2);

    let backends: Vec<String> = ingestor.snapshot().into_iter().map(|s| s.backend).collect();
    assert_eq!(backends, vec!["cpu", "gpu", "gpu"]);
    // Server records carry no timestamp; arrival time is stamped
    assert!(ingestor.snapshot().iter().all(|s| s.ts > 0.0));

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("stream stops on shutdown")
        .unwrap();
}

#[tokio::test]
async fn test_stops_when_consumer_goes_away() {
    let (addr, _connections) = serve().await;
    let url = Url::parse(&format!("ws://{addr}/ws/telemetry")).unwrap();
    let stream = TelemetryStream::new(url, RECONNECT);

    let (tx, mut rx) = mpsc::channel(1);
    let handle = tokio::spawn(stream.run(tx, CancellationToken::new()));
    next_event(&mut rx).await;
    drop(rx);

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("stream stops without a consumer")
        .unwrap();
}
