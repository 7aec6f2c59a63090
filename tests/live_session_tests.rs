//! Live session integration tests.
//!
//! Negotiation is mocked with `wiremock`; the WebSocket side runs against the
//! scripted peer in `mock_providers::websocket_mock`.

mod mock_providers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gladia_client::config::ClientConfig;
use gladia_client::core::live::{
    LiveClient, LiveSession, SessionConfig, SessionHandle, SessionState,
};
use gladia_client::errors::GladiaError;

use mock_providers::{
    GladiaMockServer, MockSessionConfig, StopBehavior, event, lifecycle, negotiation_body,
};

const API_KEY: &str = "test-gladia-key";

fn client_for(server: &MockServer) -> LiveClient {
    let config = ClientConfig {
        base_url: server.uri(),
        ..ClientConfig::new(API_KEY)
    };
    LiveClient::new(config).unwrap()
}

fn session_for(mock: &GladiaMockServer) -> LiveSession {
    LiveSession::new(SessionHandle {
        id: mock.session_id.clone(),
        url: mock.url.clone(),
    })
    .with_connect_timeout(Duration::from_secs(5))
}

type EventLog = Arc<Mutex<Vec<String>>>;

fn record(log: &EventLog, entry: impl Into<String>) {
    log.lock().push(entry.into());
}

// =============================================================================
// Negotiation
// =============================================================================

#[tokio::test]
async fn test_negotiation_success_returns_handle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/live"))
        .and(query_param("region", "us-west"))
        .and(header("x-gladia-key", API_KEY))
        .and(body_partial_json(json!({
            "encoding": "wav/pcm",
            "bit_depth": 16,
            "sample_rate": 16000,
            "channels": 1,
            "model": "solaria-1"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(negotiation_body("sess-42", "wss://api.gladia.io/v2/live?token=t")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let handle = client_for(&server)
        .negotiate(&SessionConfig::default())
        .await
        .unwrap();

    assert_eq!(handle.id, "sess-42");
    assert_eq!(handle.url, "wss://api.gladia.io/v2/live?token=t");
}

#[tokio::test]
async fn test_negotiation_rejection_preserves_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/live"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "timestamp": "2026-10-18T10:00:00.000Z",
            "path": "/v2/live",
            "request_id": "req-abc",
            "statusCode": 400,
            "message": "Invalid parameters",
            "validation_errors": ["sample_rate must be one of 8000, 16000, 32000, 44100, 48000"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .negotiate(&SessionConfig::default())
        .await
        .unwrap_err();

    let negotiation = err.negotiation_error().expect("negotiation error");
    assert_eq!(negotiation.status_code, 400);
    assert_eq!(negotiation.request_id, "req-abc");
    assert_eq!(negotiation.path, "/v2/live");
    assert_eq!(negotiation.message, "Invalid parameters");
    assert_eq!(negotiation.validation_errors.len(), 1);
    assert!(!err.is_transport());
}

#[tokio::test]
async fn test_negotiation_non_json_error_keeps_body_as_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/live"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway\n"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .negotiate(&SessionConfig::default())
        .await
        .unwrap_err();

    match err {
        GladiaError::Negotiation(negotiation) => {
            assert_eq!(negotiation.status_code, 502);
            assert_eq!(negotiation.message, "Bad Gateway");
        }
        other => panic!("expected negotiation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_negotiation_200_is_not_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/live"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(negotiation_body("sess-1", "wss://x/y")),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .negotiate(&SessionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GladiaError::Negotiation(ref e) if e.status_code == 200));
}

#[tokio::test]
async fn test_negotiation_rejects_unusable_session_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/live"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(negotiation_body("sess-1", "https://api.gladia.io/v2/live")),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .negotiate(&SessionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GladiaError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/live"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let config = SessionConfig {
        channels: 0,
        ..Default::default()
    };
    let err = client_for(&server).negotiate(&config).await.unwrap_err();
    assert!(matches!(err, GladiaError::Configuration(_)));
}

#[tokio::test]
async fn test_negotiation_network_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = ClientConfig {
        base_url: format!("http://127.0.0.1:{port}"),
        ..ClientConfig::new(API_KEY)
    };
    let err = LiveClient::new(config)
        .unwrap()
        .negotiate(&SessionConfig::default())
        .await
        .unwrap_err();

    assert!(err.is_transport(), "unexpected error: {err:?}");
}

// =============================================================================
// Streaming
// =============================================================================

#[tokio::test]
async fn test_speech_start_reaches_typed_handler() {
    let mock = GladiaMockServer::start(MockSessionConfig {
        session_id: "sess-b".into(),
        greeting: vec![event("speech_start", "sess-b", json!({"time": 1.2, "channel": 0}))],
        ..Default::default()
    })
    .await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/live"))
        .respond_with(ResponseTemplate::new(201).set_body_json(negotiation_body("sess-b", &mock.url)))
        .mount(&server)
        .await;

    let session = client_for(&server)
        .connect(&SessionConfig::default())
        .await
        .unwrap();
    assert_eq!(session.session_id(), "sess-b");
    assert_eq!(session.state(), SessionState::Idle);

    let (tx, mut rx) = mpsc::unbounded_channel();
    session.events().on_speech_start(move |msg| {
        let tx = tx.clone();
        async move {
            let data = msg.data().cloned().expect("speech_start data");
            let _ = tx.send((msg.session_id.clone(), data.time, data.channel));
        }
    });

    assert!(session.start().await);
    let (session_id, time, channel) = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("speech_start delivered")
        .unwrap();

    assert_eq!(session_id, "sess-b");
    assert!((time - 1.2).abs() < f64::EPSILON);
    assert_eq!(channel, 0);

    session.disconnect().await;
}

#[tokio::test]
async fn test_stream_stop_and_acknowledgment_then_single_disconnect() {
    let mock = GladiaMockServer::start(MockSessionConfig::default()).await;
    let session = session_for(&mock);

    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let disconnects = Arc::new(AtomicUsize::new(0));

    let entries = log.clone();
    session.events().on_stop_recording_acknowledgment(move |msg| {
        let entries = entries.clone();
        async move {
            assert!(msg.acknowledged);
            record(&entries, "stop_recording");
        }
    });
    let entries = log.clone();
    let counter = disconnects.clone();
    session.events().on_disconnected(move || {
        let entries = entries.clone();
        counter.fetch_add(1, Ordering::SeqCst);
        async move { record(&entries, "disconnected") }
    });

    assert!(session.start().await);
    assert!(session.is_ready());

    for _ in 0..3 {
        assert!(session.send_audio_binary(vec![0u8; 3200]).await);
    }
    assert!(session.send_stop().await);
    assert_eq!(session.state(), SessionState::Stopping);

    // Stop latches the send path shut.
    assert!(!session.send_audio_binary(vec![0u8; 3200]).await);
    assert!(!session.send_audio_json(&[0u8; 32]).await);
    assert!(!session.send_stop().await);

    session.close(Duration::from_secs(5)).await;

    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(*log.lock(), vec!["stop_recording", "disconnected"]);
    assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(mock.stats.binary_frames(), 3);
    assert_eq!(mock.stats.audio_bytes(), 3 * 3200);
    assert!(mock.stats.stop_received());
}

#[tokio::test]
async fn test_events_are_delivered_in_wire_order() {
    let sid = "sess-order";
    let mock = GladiaMockServer::start(MockSessionConfig {
        session_id: sid.into(),
        greeting: vec![
            lifecycle("start_session", sid),
            event("speech_start", sid, json!({"time": 0.5, "channel": 0})),
            r#"{"type":"telemetry","data":{}}"#.to_string(),
            "not json at all".to_string(),
            event(
                "transcript",
                sid,
                json!({"id": "u1", "is_final": true, "utterance": {"text": "hello"}}),
            ),
            event("speech_end", sid, json!({"time": 1.5, "channel": 0})),
        ],
        ..Default::default()
    })
    .await;
    let session = session_for(&mock);

    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let entries = log.clone();
    session.events().on_start_session(move |_| {
        let entries = entries.clone();
        async move { record(&entries, "start_session") }
    });
    let entries = log.clone();
    session.events().on_speech_start(move |_| {
        let entries = entries.clone();
        async move { record(&entries, "speech_start") }
    });
    let entries = log.clone();
    session.events().on_transcript(move |msg| {
        let entries = entries.clone();
        async move {
            let text = msg.data().map(|d| d.utterance.text.clone()).unwrap_or_default();
            record(&entries, format!("transcript:{text}"));
        }
    });
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let entries = log.clone();
    session.events().on_speech_end(move |_| {
        let entries = entries.clone();
        let done_tx = done_tx.clone();
        async move {
            record(&entries, "speech_end");
            let _ = done_tx.send(());
        }
    });

    assert!(session.start().await);
    timeout(Duration::from_secs(5), done_rx.recv())
        .await
        .expect("all greeting events delivered");

    assert_eq!(
        *log.lock(),
        vec!["start_session", "speech_start", "transcript:hello", "speech_end"]
    );
    session.disconnect().await;
}

#[tokio::test]
async fn test_json_audio_frame_is_acknowledged() {
    let mock = GladiaMockServer::start(MockSessionConfig {
        ack_audio_chunks: true,
        ..Default::default()
    })
    .await;
    let session = session_for(&mock);

    let (tx, mut rx) = mpsc::unbounded_channel();
    session.events().on_audio_chunk_acknowledgment(move |msg| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(msg.data.map(|d| d.byte_range));
        }
    });

    assert!(session.start().await);
    assert!(session.send_audio_json(&[1, 2, 3, 4]).await);

    let byte_range = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("acknowledgment delivered")
        .unwrap();
    assert_eq!(byte_range, Some([0, 4]));
    assert_eq!(mock.stats.json_chunks(), 1);
    assert!(
        mock.stats.text_frames.lock()[0].contains(r#""chunk":"AQIDBA==""#),
        "frames: {:?}",
        mock.stats.text_frames.lock()
    );

    session.disconnect().await;
}

// =============================================================================
// Lifecycle Edges
// =============================================================================

#[tokio::test]
async fn test_start_is_idempotent_while_open() {
    let mock = GladiaMockServer::start(MockSessionConfig {
        on_stop: StopBehavior::Ignore,
        ..Default::default()
    })
    .await;
    let session = session_for(&mock);

    let connected = Arc::new(AtomicUsize::new(0));
    let counter = connected.clone();
    session.events().on_connected(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async {}
    });

    assert!(session.start().await);
    assert!(session.start().await);
    assert_eq!(session.state(), SessionState::Open);
    assert!(session.is_connected());

    session.disconnect().await;
    assert_eq!(connected.load(Ordering::SeqCst), 1);
    assert_eq!(mock.stats.connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disconnect_while_open_is_idempotent() {
    let mock = GladiaMockServer::start(MockSessionConfig {
        on_stop: StopBehavior::Ignore,
        ..Default::default()
    })
    .await;
    let session = session_for(&mock);

    let disconnects = Arc::new(AtomicUsize::new(0));
    let counter = disconnects.clone();
    session.events().on_disconnected(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async {}
    });

    assert!(session.start().await);
    session.disconnect().await;
    session.disconnect().await;

    assert_eq!(session.state(), SessionState::Closed);
    assert!(!session.is_connected());
    assert!(!session.is_ready());
    assert!(!session.send_audio_binary(vec![0u8; 320]).await);
    assert!(!session.start().await);
    assert_eq!(disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_read_error_fires_error_then_disconnected() {
    let sid = "sess-drop";
    let mock = GladiaMockServer::start(MockSessionConfig {
        session_id: sid.into(),
        greeting: vec![lifecycle("start_session", sid)],
        drop_after_greeting: true,
        ..Default::default()
    })
    .await;
    let session = session_for(&mock);

    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let entries = log.clone();
    session.events().on_start_session(move |_| {
        let entries = entries.clone();
        async move { record(&entries, "start_session") }
    });
    let entries = log.clone();
    session.events().on_error(move |message| {
        let entries = entries.clone();
        async move {
            assert!(!message.is_empty());
            record(&entries, "error");
        }
    });
    let entries = log.clone();
    session.events().on_disconnected(move || {
        let entries = entries.clone();
        async move { record(&entries, "disconnected") }
    });

    assert!(session.start().await);
    timeout(Duration::from_secs(5), session.wait_closed())
        .await
        .expect("session closes after the peer drops");
    session.disconnect().await;

    assert_eq!(*log.lock(), vec!["start_session", "error", "disconnected"]);
    assert!(!session.send_audio_binary(vec![0u8; 16]).await);
}

#[tokio::test]
async fn test_handshake_timeout_leaves_session_closed() {
    // Accepts TCP but never answers the WebSocket upgrade.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let session = LiveSession::new(SessionHandle {
        id: "sess-silent".into(),
        url: format!("ws://127.0.0.1:{port}/v2/live/sess-silent"),
    })
    .with_connect_timeout(Duration::from_millis(200));

    assert!(!session.start().await);
    assert_eq!(session.state(), SessionState::Closed);
    drop(listener);
}

#[tokio::test]
async fn test_drop_sends_stop_in_background() {
    let mock = GladiaMockServer::start(MockSessionConfig {
        on_stop: StopBehavior::Ignore,
        ..Default::default()
    })
    .await;
    let session = session_for(&mock);

    let disconnects = Arc::new(AtomicUsize::new(0));
    let counter = disconnects.clone();
    session.events().on_disconnected(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async {}
    });

    assert!(session.start().await);
    assert!(session.send_audio_binary(vec![0u8; 640]).await);
    drop(session);

    timeout(Duration::from_secs(5), async {
        while !mock.stats.stop_received() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("stop frame sent after drop");

    // Callbacks are disabled as soon as the session is dropped.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(disconnects.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Concurrent Teardown
// =============================================================================

#[tokio::test]
async fn test_disconnect_from_handler_closes_session() {
    let sid = "sess-reentrant";
    let mock = GladiaMockServer::start(MockSessionConfig {
        session_id: sid.into(),
        greeting: vec![lifecycle("end_session", sid)],
        on_stop: StopBehavior::Ignore,
        ..Default::default()
    })
    .await;
    let session = Arc::new(session_for(&mock));

    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let disconnects = Arc::new(AtomicUsize::new(0));

    let weak = Arc::downgrade(&session);
    let entries = log.clone();
    session.events().on_end_session(move |_| {
        let weak = weak.clone();
        let entries = entries.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if let Some(session) = weak.upgrade() {
                session.disconnect().await;
                record(&entries, "disconnect_returned");
            }
        }
    });
    let entries = log.clone();
    let counter = disconnects.clone();
    session.events().on_disconnected(move || {
        let entries = entries.clone();
        counter.fetch_add(1, Ordering::SeqCst);
        async move { record(&entries, "disconnected") }
    });

    assert!(session.start().await);

    // Well under the receive task join bound: the handler must not wait on
    // its own task.
    timeout(Duration::from_secs(2), session.wait_closed())
        .await
        .expect("session closes after disconnect() from a handler");

    timeout(Duration::from_secs(2), session.disconnect())
        .await
        .expect("external disconnect joins the finished task");

    assert_eq!(session.state(), SessionState::Closed);
    assert!(!session.is_connected());
    assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(*log.lock(), vec!["disconnect_returned", "disconnected"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_handler_runs_after_disconnect_races_start() {
    let mock = GladiaMockServer::start(MockSessionConfig {
        on_stop: StopBehavior::Ignore,
        ..Default::default()
    })
    .await;

    for _ in 0..50 {
        let session = Arc::new(session_for(&mock));
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));

        let entries = log.clone();
        session.events().on_connected(move || {
            let entries = entries.clone();
            async move { record(&entries, "connected") }
        });
        let entries = log.clone();
        session.events().on_disconnected(move || {
            let entries = entries.clone();
            async move { record(&entries, "disconnected") }
        });

        let racer_session = session.clone();
        let entries = log.clone();
        let racer = tokio::spawn(async move {
            while !matches!(
                racer_session.state(),
                SessionState::Open | SessionState::Closed
            ) {
                tokio::task::yield_now().await;
            }
            racer_session.disconnect().await;
            record(&entries, "disconnect_returned");
        });

        session.start().await;
        timeout(Duration::from_secs(10), racer)
            .await
            .expect("disconnect finishes")
            .unwrap();

        // Anything still scheduled would land here.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let entries = log.lock().clone();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(entries.last().map(String::as_str), Some("disconnect_returned"));
        assert!(entries.iter().filter(|e| *e == "disconnected").count() <= 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_audio_never_follows_stop_frame() {
    let mock = GladiaMockServer::start(MockSessionConfig {
        on_stop: StopBehavior::Ignore,
        ..Default::default()
    })
    .await;
    let session = Arc::new(session_for(&mock));
    assert!(session.start().await);

    let senders: Vec<_> = (0..8)
        .map(|_| {
            let session = session.clone();
            tokio::spawn(async move {
                while session.send_audio_json(&[1, 2, 3, 4]).await {
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(session.send_stop().await);
    for sender in senders {
        timeout(Duration::from_secs(5), sender)
            .await
            .expect("senders stop after the latch")
            .unwrap();
    }

    timeout(Duration::from_secs(5), async {
        while !mock.stats.stop_received() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("stop frame received");
    session.disconnect().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let frames = mock.stats.text_frames.lock().clone();
    let stop_at = frames
        .iter()
        .position(|f| f.contains("stop_recording"))
        .expect("stop frame recorded");
    assert!(stop_at > 0);
    assert_eq!(stop_at, frames.len() - 1);
}
