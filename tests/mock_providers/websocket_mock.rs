//! WebSocket mock of a Gladia live session endpoint.
//!
//! Accepts connections on an ephemeral port, pushes a scripted greeting,
//! counts the audio it receives and answers `stop_recording` the way the
//! real endpoint does: acknowledgment, trailing results, then close.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// What the mock does when it receives `stop_recording`.
#[derive(Debug, Clone)]
pub enum StopBehavior {
    /// Send the acknowledgment, then `trailing`, then a close frame
    AckAndClose { trailing: Vec<String> },
    /// Record the frame and keep the connection open
    Ignore,
}

impl Default for StopBehavior {
    fn default() -> Self {
        StopBehavior::AckAndClose {
            trailing: Vec::new(),
        }
    }
}

/// Script for one mocked session.
#[derive(Debug, Clone)]
pub struct MockSessionConfig {
    pub session_id: String,
    /// Text frames pushed right after the handshake
    pub greeting: Vec<String>,
    pub on_stop: StopBehavior,
    /// Drop the TCP connection after the greeting without a close frame
    pub drop_after_greeting: bool,
    /// Answer each JSON `audio_chunk` with an acknowledgment
    pub ack_audio_chunks: bool,
}

impl Default for MockSessionConfig {
    fn default() -> Self {
        Self {
            session_id: "sess-mock".to_string(),
            greeting: Vec::new(),
            on_stop: StopBehavior::default(),
            drop_after_greeting: false,
            ack_audio_chunks: false,
        }
    }
}

/// What the mock observed.
#[derive(Debug, Default)]
pub struct MockSessionStats {
    pub connections: AtomicU64,
    pub binary_frames: AtomicU64,
    pub audio_bytes: AtomicU64,
    pub json_chunks: AtomicU64,
    pub stop_received: AtomicBool,
    /// Every text frame from the client, in arrival order
    pub text_frames: Mutex<Vec<String>>,
}

impl MockSessionStats {
    pub fn binary_frames(&self) -> u64 {
        self.binary_frames.load(Ordering::SeqCst)
    }

    pub fn audio_bytes(&self) -> u64 {
        self.audio_bytes.load(Ordering::SeqCst)
    }

    pub fn json_chunks(&self) -> u64 {
        self.json_chunks.load(Ordering::SeqCst)
    }

    pub fn stop_received(&self) -> bool {
        self.stop_received.load(Ordering::SeqCst)
    }
}

/// Running mock server. The accept loop stops when this is dropped.
pub struct GladiaMockServer {
    pub url: String,
    pub session_id: String,
    pub stats: Arc<MockSessionStats>,
    accept_task: JoinHandle<()>,
}

impl Drop for GladiaMockServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

impl GladiaMockServer {
    pub async fn start(config: MockSessionConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock listener");
        let port = listener.local_addr().expect("mock local addr").port();
        let stats = Arc::new(MockSessionStats::default());
        let config = Arc::new(config);

        let url = format!("ws://127.0.0.1:{}/v2/live/{}", port, config.session_id);
        let session_id = config.session_id.clone();

        let task_stats = stats.clone();
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let config = config.clone();
                let stats = task_stats.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_session(stream, config, stats).await {
                        eprintln!("Mock session error: {}", e);
                    }
                });
            }
        });

        Self {
            url,
            session_id,
            stats,
            accept_task,
        }
    }
}

fn stop_acknowledgment(session_id: &str) -> String {
    json!({
        "type": "stop_recording",
        "session_id": session_id,
        "created_at": "2026-10-18T10:00:05.000Z",
        "acknowledged": true,
        "data": {"recording_duration": 0.3, "recording_left_to_process": 0.0}
    })
    .to_string()
}

fn chunk_acknowledgment(session_id: &str, start: u64, len: u64) -> String {
    json!({
        "type": "audio_chunk",
        "session_id": session_id,
        "created_at": "2026-10-18T10:00:01.000Z",
        "acknowledged": true,
        "data": {"byte_range": [start, start + len], "time_range": [0.0, 0.1]}
    })
    .to_string()
}

async fn handle_session(
    stream: TcpStream,
    config: Arc<MockSessionConfig>,
    stats: Arc<MockSessionStats>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();
    stats.connections.fetch_add(1, Ordering::SeqCst);

    for frame in &config.greeting {
        write.send(Message::Text(frame.clone().into())).await?;
    }

    if config.drop_after_greeting {
        write.flush().await?;
        // Dropping both halves closes the socket without a close frame.
        return Ok(());
    }

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Binary(audio)) => {
                stats.binary_frames.fetch_add(1, Ordering::SeqCst);
                stats
                    .audio_bytes
                    .fetch_add(audio.len() as u64, Ordering::SeqCst);
            }
            Ok(Message::Text(text)) => {
                stats.text_frames.lock().push(text.as_str().to_string());
                let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) else {
                    continue;
                };

                match frame.get("type").and_then(Value::as_str) {
                    Some("audio_chunk") => {
                        let chunk = frame["data"]["chunk"].as_str().unwrap_or_default();
                        let decoded = BASE64.decode(chunk)?;
                        let start = stats
                            .audio_bytes
                            .fetch_add(decoded.len() as u64, Ordering::SeqCst);
                        stats.json_chunks.fetch_add(1, Ordering::SeqCst);
                        if config.ack_audio_chunks {
                            let ack = chunk_acknowledgment(
                                &config.session_id,
                                start,
                                decoded.len() as u64,
                            );
                            write.send(Message::Text(ack.into())).await?;
                        }
                    }
                    Some("stop_recording") => {
                        stats.stop_received.store(true, Ordering::SeqCst);
                        if let StopBehavior::AckAndClose { trailing } = &config.on_stop {
                            write
                                .send(Message::Text(stop_acknowledgment(&config.session_id).into()))
                                .await?;
                            for frame in trailing {
                                write.send(Message::Text(frame.clone().into())).await?;
                            }
                            write.send(Message::Close(None)).await?;
                        }
                    }
                    _ => {}
                }
            }
            Ok(Message::Ping(data)) => {
                write.send(Message::Pong(data)).await?;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(_) => break,
        }
    }

    Ok(())
}
