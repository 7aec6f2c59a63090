//! Live transcription session over one WebSocket connection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   sink (Mutex)   ┌─────────────────┐
//! │ send_audio_binary()  │─────────────────▶│                 │
//! │ send_audio_json()    │                  │    WebSocket    │
//! │ send_stop()          │                  │                 │
//! └──────────────────────┘                  └────────┬────────┘
//!                                                    │ stream
//!                                           ┌────────▼────────┐
//!                                           │  Receive Task   │──▶ EventDispatcher ──▶ handlers
//!                                           └─────────────────┘
//! ```
//!
//! Sends write straight to the sink with no intermediate queue, so frames go
//! out in call order and each call waits only for its own write. One receive
//! task runs from `Open` until `Closed`; it is the only place that tears the
//! connection down.

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, oneshot};
use tokio::task::{self, JoinHandle};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use super::dispatcher::EventDispatcher;
use super::frames;
use super::negotiator::SessionHandle;
use super::state::{SessionState, StateCell};

// =============================================================================
// Constants
// =============================================================================

/// Default bound on the TCP + TLS + WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `disconnect()` waits for the receive task before aborting it.
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type SharedSink = Arc<Mutex<Option<WsSink>>>;
type TaskIdCell = Arc<parking_lot::Mutex<Option<task::Id>>>;

/// Why the receive task is asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownKind {
    /// Explicit `disconnect()`: close the socket.
    Disconnect,
    /// Session dropped: send the stop frame if still open, then close.
    Drop,
}

// =============================================================================
// LiveSession
// =============================================================================

/// One live transcription session.
///
/// Created from a [`SessionHandle`] returned by negotiation. Register handlers
/// through [`events`](Self::events) before calling [`start`](Self::start).
///
/// All methods take `&self`, so the session can be shared behind an `Arc`
/// between the task that feeds audio and the task that stops it.
///
/// Handlers run on the receive task, never on the caller's task.
///
/// Dropping the session disables every handler immediately, then sends the
/// stop frame (if it was not sent yet) and a close frame in the background.
/// Call [`close`](Self::close) instead to wait for trailing events.
pub struct LiveSession {
    handle: SessionHandle,
    state: Arc<StateCell>,
    /// One-way latch: true until the stop frame is sent or the session closes
    can_send: Arc<AtomicBool>,
    is_connected: Arc<AtomicBool>,
    sink: SharedSink,
    dispatcher: EventDispatcher,
    shutdown_tx: parking_lot::Mutex<Option<oneshot::Sender<ShutdownKind>>>,
    /// Held by `start` from publishing the shutdown channel until the task
    /// handle is stored, so `disconnect` always finds a task it can join
    connection_handle: Mutex<Option<JoinHandle<()>>>,
    /// Id of the running receive task, recorded by the task itself
    receive_task_id: TaskIdCell,
    connect_timeout: Duration,
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("id", &self.handle.id)
            .field("state", &self.state.get())
            .field("can_send", &self.can_send.load(Ordering::Acquire))
            .finish()
    }
}

impl LiveSession {
    pub fn new(handle: SessionHandle) -> Self {
        Self::with_dispatcher(handle, EventDispatcher::new())
    }

    /// Build a session that shares an existing handler registry.
    ///
    /// The registry's enabled flag is shared too: dropping this session
    /// disables the handlers for every session built from the same
    /// dispatcher. Give each session its own clone of the registrations
    /// instead when sessions are dropped independently.
    pub fn with_dispatcher(handle: SessionHandle, dispatcher: EventDispatcher) -> Self {
        Self {
            handle,
            state: Arc::new(StateCell::new()),
            can_send: Arc::new(AtomicBool::new(true)),
            is_connected: Arc::new(AtomicBool::new(false)),
            sink: Arc::new(Mutex::new(None)),
            dispatcher,
            shutdown_tx: parking_lot::Mutex::new(None),
            connection_handle: Mutex::new(None),
            receive_task_id: Arc::new(parking_lot::Mutex::new(None)),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    #[inline]
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    #[inline]
    pub fn session_id(&self) -> &str {
        &self.handle.id
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Handler registry for this session.
    #[inline]
    pub fn events(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::Acquire)
    }

    /// Whether audio frames are currently accepted.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.can_send.load(Ordering::Acquire) && self.state.get() == SessionState::Open
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open the WebSocket and spawn the receive task.
    ///
    /// # Returns
    /// * `true` - The session is `Open` (including when it already was)
    /// * `false` - Handshake failed or timed out, or the session was already
    ///   stopping or closed. A failed handshake leaves the session `Closed`.
    pub async fn start(&self) -> bool {
        if !self
            .state
            .transition(&[SessionState::Idle], SessionState::Connecting)
        {
            let state = self.state.get();
            if state == SessionState::Open {
                debug!("Gladia session {} already open", self.handle.id);
                return true;
            }
            warn!(
                "Cannot start Gladia session {} from state {}",
                self.handle.id, state
            );
            return false;
        }

        let ws_stream = match timeout(self.connect_timeout, connect_async(self.handle.url.as_str()))
            .await
        {
            Ok(Ok((ws_stream, _response))) => ws_stream,
            Ok(Err(e)) => {
                error!("Failed to connect to Gladia session {}: {}", self.handle.id, e);
                self.state.close();
                return false;
            }
            Err(_) => {
                error!(
                    "Timed out after {:?} connecting to Gladia session {}",
                    self.connect_timeout, self.handle.id
                );
                self.state.close();
                return false;
            }
        };

        let (sink, stream) = ws_stream.split();
        let mut connection_handle = self.connection_handle.lock().await;
        *self.sink.lock().await = Some(sink);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *self.shutdown_tx.lock() = Some(shutdown_tx);

        if !self
            .state
            .transition(&[SessionState::Connecting], SessionState::Open)
        {
            // disconnect() ran while the handshake was in flight
            warn!(
                "Gladia session {} closed during handshake",
                self.handle.id
            );
            self.shutdown_tx.lock().take();
            if let Some(mut sink) = self.sink.lock().await.take() {
                let _ = sink.close().await;
            }
            return false;
        }

        self.is_connected.store(true, Ordering::Release);
        info!("Connected to Gladia live session {}", self.handle.id);

        let task = ReceiveTask {
            session_id: self.handle.id.clone(),
            stream,
            sink: self.sink.clone(),
            state: self.state.clone(),
            can_send: self.can_send.clone(),
            is_connected: self.is_connected.clone(),
            task_id: self.receive_task_id.clone(),
            dispatcher: self.dispatcher.clone(),
        };
        *connection_handle = Some(tokio::spawn(task.run(shutdown_rx)));

        true
    }

    /// Send the stop frame. The server flushes post-processing results and
    /// then closes the connection.
    ///
    /// Succeeds at most once per session; audio sends fail from then on.
    pub async fn send_stop(&self) -> bool {
        if !self
            .state
            .transition(&[SessionState::Open], SessionState::Stopping)
        {
            debug!(
                "Ignoring stop for Gladia session {} in state {}",
                self.handle.id,
                self.state.get()
            );
            return false;
        }
        self.can_send.store(false, Ordering::Release);

        match frames::stop_recording() {
            Ok(frame) => {
                let sent = write_frame(&self.sink, frame).await;
                if sent {
                    info!("Sent stop_recording to Gladia session {}", self.handle.id);
                }
                sent
            }
            Err(e) => {
                error!("Failed to encode stop_recording frame: {}", e);
                false
            }
        }
    }

    /// Close the connection and wait for the receive task to finish.
    ///
    /// Idempotent. No handler runs after this returns.
    ///
    /// Called from inside a handler, it only signals the shutdown: the
    /// receive task closes the session once the handler returns, and fires
    /// `on_disconnected` then. Use [`wait_closed`](Self::wait_closed) from
    /// another task to observe it.
    pub async fn disconnect(&self) {
        self.can_send.store(false, Ordering::Release);

        if self.on_receive_task() {
            debug!(
                "disconnect() called from a handler of Gladia session {}",
                self.handle.id
            );
            self.signal_shutdown(ShutdownKind::Disconnect);
            return;
        }

        let (task, closed_idle) = {
            let mut connection_handle = self.connection_handle.lock().await;
            self.signal_shutdown(ShutdownKind::Disconnect);
            let task = connection_handle.take();
            // Close under the lock so a concurrent start() cannot reach Open
            let closed_idle = task.is_none() && self.state.close();
            (task, closed_idle)
        };

        if let Some(mut task) = task
            && timeout(TASK_JOIN_TIMEOUT, &mut task).await.is_err()
        {
            warn!(
                "Receive task for Gladia session {} did not stop in {:?}, aborting",
                self.handle.id, TASK_JOIN_TIMEOUT
            );
            task.abort();
            let _ = task.await;
            self.sink.lock().await.take();
        }

        self.is_connected.store(false, Ordering::Release);
        if self.state.close() || closed_idle {
            info!("Disconnected from Gladia session {}", self.handle.id);
        }
    }

    fn signal_shutdown(&self, kind: ShutdownKind) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(kind);
        }
    }

    /// Whether the caller is running on this session's receive task.
    fn on_receive_task(&self) -> bool {
        match (task::try_id(), *self.receive_task_id.lock()) {
            (Some(current), Some(receiver)) => current == receiver,
            _ => false,
        }
    }

    /// Resolve once the session is `Closed`. Returns immediately for a
    /// session that was never started.
    pub async fn wait_closed(&self) {
        if self.state.get() == SessionState::Idle {
            return;
        }
        self.state.wait_closed().await;
    }

    /// Stop, wait up to `grace` for the server to deliver trailing events and
    /// close, then disconnect.
    ///
    /// Inside a handler the session cannot close while the handler is still
    /// running, so this waits out the full `grace`. Use
    /// [`send_stop`](Self::send_stop) or [`disconnect`](Self::disconnect)
    /// there instead.
    pub async fn close(&self, grace: Duration) {
        if self.state.get() == SessionState::Open {
            self.send_stop().await;
        }
        if self.state.get().is_active() && timeout(grace, self.wait_closed()).await.is_err() {
            debug!(
                "Gladia session {} still open after {:?} grace period",
                self.handle.id, grace
            );
        }
        self.disconnect().await;
    }

    // =========================================================================
    // Send Path
    // =========================================================================

    /// Send raw audio as one binary frame.
    ///
    /// Returns false without writing when the session is not open or stop
    /// was already sent, and false after logging when the write fails.
    pub async fn send_audio_binary(&self, audio: impl Into<Bytes>) -> bool {
        if !self.is_ready() {
            debug!(
                "Dropping audio for Gladia session {}: not accepting audio",
                self.handle.id
            );
            return false;
        }
        write_audio_frame(&self.sink, &self.can_send, frames::binary_audio(audio)).await
    }

    /// Send audio base64-encoded in an `audio_chunk` JSON text frame.
    ///
    /// Same return contract as [`send_audio_binary`](Self::send_audio_binary).
    pub async fn send_audio_json(&self, audio: &[u8]) -> bool {
        if !self.is_ready() {
            debug!(
                "Dropping audio for Gladia session {}: not accepting audio",
                self.handle.id
            );
            return false;
        }
        match frames::json_audio(audio) {
            Ok(frame) => write_audio_frame(&self.sink, &self.can_send, frame).await,
            Err(e) => {
                error!("Failed to encode audio_chunk frame: {}", e);
                false
            }
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.dispatcher.disable();
        if let Some(tx) = self.shutdown_tx.get_mut().take() {
            let _ = tx.send(ShutdownKind::Drop);
        }
    }
}

/// Write one frame through the shared sink.
async fn write_frame(sink: &SharedSink, frame: Message) -> bool {
    let mut guard = sink.lock().await;
    send_locked(guard.as_mut(), frame).await
}

/// Write an audio frame unless the stop frame got the sink first.
async fn write_audio_frame(sink: &SharedSink, can_send: &AtomicBool, frame: Message) -> bool {
    let mut guard = sink.lock().await;
    // send_stop clears the latch before taking the sink
    if !can_send.load(Ordering::Acquire) {
        debug!("Dropping audio queued behind stop_recording");
        return false;
    }
    send_locked(guard.as_mut(), frame).await
}

async fn send_locked(sink: Option<&mut WsSink>, frame: Message) -> bool {
    let Some(sink) = sink else {
        debug!("WebSocket sink already closed");
        return false;
    };

    match sink.send(frame).await {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to write to Gladia WebSocket: {}", e);
            false
        }
    }
}

// =============================================================================
// Receive Task
// =============================================================================

struct ReceiveTask {
    session_id: String,
    stream: SplitStream<WsStream>,
    sink: SharedSink,
    state: Arc<StateCell>,
    can_send: Arc<AtomicBool>,
    is_connected: Arc<AtomicBool>,
    task_id: TaskIdCell,
    dispatcher: EventDispatcher,
}

impl ReceiveTask {
    async fn run(self, mut shutdown_rx: oneshot::Receiver<ShutdownKind>) {
        let ReceiveTask {
            session_id,
            mut stream,
            sink,
            state,
            can_send,
            is_connected,
            task_id,
            dispatcher,
        } = self;

        *task_id.lock() = task::try_id();
        dispatcher.notify_connected().await;

        let mut read_error: Option<String> = None;

        loop {
            tokio::select! {
                biased;

                kind = &mut shutdown_rx => {
                    let kind = kind.unwrap_or(ShutdownKind::Drop);
                    info!("Shutting down Gladia session {} ({:?})", session_id, kind);

                    if kind == ShutdownKind::Drop
                        && state.transition(&[SessionState::Open], SessionState::Stopping)
                        && can_send.swap(false, Ordering::AcqRel)
                        && let Ok(frame) = frames::stop_recording()
                    {
                        write_frame(&sink, frame).await;
                    }

                    write_frame(&sink, Message::Close(None)).await;
                    break;
                }

                message = stream.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            debug!("Received Gladia message: {}", text.as_str());
                            dispatcher.dispatch(text.as_str()).await;
                        }
                        Some(Ok(Message::Binary(data))) => {
                            debug!("Ignoring {} byte binary frame from Gladia", data.len());
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!("Gladia closed session {}: {:?}", session_id, frame);
                            break;
                        }
                        Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                            debug!("Received ping/pong from Gladia");
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            read_error = Some(format!("WebSocket read error: {e}"));
                            break;
                        }
                        None => {
                            info!("Gladia WebSocket stream ended for session {}", session_id);
                            break;
                        }
                    }
                }
            }
        }

        can_send.store(false, Ordering::Release);
        is_connected.store(false, Ordering::Release);
        if let Some(mut sink) = sink.lock().await.take() {
            let _ = sink.close().await;
        }
        state.close();

        if let Some(message) = read_error {
            error!("Gladia session {}: {}", session_id, message);
            dispatcher.notify_error(message).await;
        }
        dispatcher.notify_disconnected().await;

        info!("Gladia session {} receive task finished", session_id);
    }
}
