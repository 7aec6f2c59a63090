//! Event dispatcher for live sessions.
//!
//! The dispatcher parses each text frame into a [`LiveEvent`] and awaits the
//! single handler registered for its [`EventKind`]. Handlers are registered
//! through typed methods (`on_transcript`, `on_speech_start`, ...) so a handler
//! always receives the payload type of its own event kind.
//!
//! # Execution context
//!
//! Handlers run on the session's receive task, not on the task that
//! registered them. Events are delivered one at a time in wire order, and the
//! next frame is not read until the current handler's future completes. A
//! handler that blocks or awaits for a long time stalls every later event.
//!
//! Malformed frames, unknown event types and panicking handlers are logged and
//! absorbed; none of them stop the receive loop.

use futures::FutureExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, warn};

use super::messages::{
    AcknowledgmentMessage, AudioChunkAck, ChapterizationData, EndRecordingData, EventKind,
    EventMessage, EventParseError, FinalTranscriptData, LifecycleMessage, LiveEvent,
    NamedEntityRecognitionData, PostTranscriptData, SentimentAnalysisData, SpeechData,
    StopRecordingAck, SummarizationData, TranscriptData, TranslationData,
};

// =============================================================================
// Type Aliases
// =============================================================================

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Type-erased event handler stored in the registry.
type ErasedHandler = Arc<dyn Fn(LiveEvent) -> BoxFuture + Send + Sync>;

/// Callback for connect and disconnect notifications.
pub type ConnectivityCallback = Arc<dyn Fn() -> BoxFuture + Send + Sync>;

/// Callback for transport errors on the receive path.
pub type ErrorCallback = Arc<dyn Fn(String) -> BoxFuture + Send + Sync>;

// =============================================================================
// EventDispatcher
// =============================================================================

/// Registry of event handlers plus the dispatch routine.
///
/// Cloning is cheap and clones share the same registry.
#[derive(Clone)]
pub struct EventDispatcher {
    handlers: Arc<RwLock<HashMap<EventKind, ErasedHandler>>>,
    on_connected: Arc<RwLock<Option<ConnectivityCallback>>>,
    on_disconnected: Arc<RwLock<Option<ConnectivityCallback>>>,
    on_error: Arc<RwLock<Option<ErrorCallback>>>,
    enabled: Arc<AtomicBool>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            on_connected: Arc::new(RwLock::new(None)),
            on_disconnected: Arc::new(RwLock::new(None)),
            on_error: Arc::new(RwLock::new(None)),
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.read().len())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, kind: EventKind, handler: ErasedHandler) {
        if self.handlers.write().insert(kind, handler).is_some() {
            debug!("Replaced existing handler for {} events", kind);
        }
    }

    /// Remove the handler for `kind`, if any.
    pub fn remove(&self, kind: EventKind) -> bool {
        self.handlers.write().remove(&kind).is_some()
    }

    #[inline]
    pub fn has_handler(&self, kind: EventKind) -> bool {
        self.handlers.read().contains_key(&kind)
    }

    #[inline]
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Stop invoking any handler or callback from now on.
    pub(crate) fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    /// Parse one text frame and invoke its handler.
    ///
    /// # Returns
    /// * `Some(kind)` - A handler for `kind` was invoked
    /// * `None` - The frame was dropped or no handler is registered
    pub async fn dispatch(&self, text: &str) -> Option<EventKind> {
        if !self.is_enabled() {
            return None;
        }

        match LiveEvent::parse(text) {
            Ok(event) => self.deliver(event).await,
            Err(EventParseError::UnknownType(message_type)) => {
                warn!("Ignoring unknown Gladia event type: {}", message_type);
                None
            }
            Err(e) => {
                warn!("Dropping malformed Gladia message: {}", e);
                None
            }
        }
    }

    /// Invoke the handler registered for an already parsed event.
    pub async fn deliver(&self, event: LiveEvent) -> Option<EventKind> {
        let kind = event.kind();
        let handler = self.handlers.read().get(&kind).cloned();

        let Some(handler) = handler else {
            debug!("No handler registered for {} event", kind);
            return None;
        };

        if !self.is_enabled() {
            return None;
        }

        let future = match catch_unwind(AssertUnwindSafe(|| handler(event))) {
            Ok(future) => future,
            Err(_) => {
                error!("Handler for {} event panicked", kind);
                return Some(kind);
            }
        };

        if AssertUnwindSafe(future).catch_unwind().await.is_err() {
            error!("Handler for {} event panicked", kind);
        }

        Some(kind)
    }

    // =========================================================================
    // Connectivity Callbacks
    // =========================================================================

    /// Called once the WebSocket is open, on the receive task.
    pub fn on_connected<F, Fut>(&self, callback: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        *self.on_connected.write() = Some(Arc::new(move || Box::pin(callback()) as BoxFuture));
    }

    /// Called exactly once when the receive task ends.
    pub fn on_disconnected<F, Fut>(&self, callback: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        *self.on_disconnected.write() = Some(Arc::new(move || Box::pin(callback()) as BoxFuture));
    }

    /// Called on a read error, before the disconnect notification.
    pub fn on_error<F, Fut>(&self, callback: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        *self.on_error.write() = Some(Arc::new(move |message| Box::pin(callback(message)) as BoxFuture));
    }

    pub(crate) async fn notify_connected(&self) {
        let callback = self.on_connected.read().clone();
        if let Some(callback) = callback {
            self.run_guarded("connected", || callback()).await;
        }
    }

    pub(crate) async fn notify_disconnected(&self) {
        let callback = self.on_disconnected.read().clone();
        if let Some(callback) = callback {
            self.run_guarded("disconnected", || callback()).await;
        }
    }

    pub(crate) async fn notify_error(&self, message: String) {
        let callback = self.on_error.read().clone();
        match callback {
            Some(callback) => self.run_guarded("error", || callback(message)).await,
            None => error!("Gladia session error (no callback registered): {}", message),
        }
    }

    async fn run_guarded(&self, name: &str, call: impl FnOnce() -> BoxFuture) {
        if !self.is_enabled() {
            return;
        }
        match catch_unwind(AssertUnwindSafe(call)) {
            Ok(future) => {
                if AssertUnwindSafe(future).catch_unwind().await.is_err() {
                    error!("{} callback panicked", name);
                }
            }
            Err(_) => error!("{} callback panicked", name),
        }
    }
}

// =============================================================================
// Typed Registration
// =============================================================================

/// Generates one `on_*` method per event kind. The closure only ever unpacks
/// the variant it was registered for.
macro_rules! typed_handlers {
    ($( $(#[$doc:meta])* $method:ident => $variant:ident($payload:ty); )*) => {
        impl EventDispatcher {
            $(
                $(#[$doc])*
                pub fn $method<F, Fut>(&self, handler: F)
                where
                    F: Fn($payload) -> Fut + Send + Sync + 'static,
                    Fut: Future<Output = ()> + Send + 'static,
                {
                    let erased: ErasedHandler = Arc::new(move |event: LiveEvent| -> BoxFuture {
                        match event {
                            LiveEvent::$variant(payload) => Box::pin(handler(payload)) as BoxFuture,
                            other => {
                                warn!("{} handler received {} event", EventKind::$variant, other.kind());
                                Box::pin(async {}) as BoxFuture
                            }
                        }
                    });
                    self.register(EventKind::$variant, erased);
                }
            )*
        }
    };
}

typed_handlers! {
    /// Voice activity started.
    on_speech_start => SpeechStart(EventMessage<SpeechData>);
    /// Voice activity ended.
    on_speech_end => SpeechEnd(EventMessage<SpeechData>);
    /// Partial or final utterance transcript.
    on_transcript => Transcript(EventMessage<TranscriptData>);
    on_translation => Translation(EventMessage<TranslationData>);
    on_named_entity_recognition => NamedEntityRecognition(EventMessage<NamedEntityRecognitionData>);
    on_sentiment_analysis => SentimentAnalysis(EventMessage<SentimentAnalysisData>);
    /// Full transcript, sent after the recording ends.
    on_post_transcript => PostTranscript(EventMessage<PostTranscriptData>);
    /// Final result including every enabled add-on.
    on_final_transcript => FinalTranscript(EventMessage<FinalTranscriptData>);
    on_chapterization => Chapterization(EventMessage<ChapterizationData>);
    on_summarization => Summarization(EventMessage<SummarizationData>);
    on_start_session => StartSession(LifecycleMessage);
    on_end_session => EndSession(LifecycleMessage);
    on_start_recording => StartRecording(LifecycleMessage);
    on_end_recording => EndRecording(EventMessage<EndRecordingData>);
    /// Server acknowledged an `audio_chunk` frame.
    on_audio_chunk_acknowledgment => AudioChunkAcknowledgment(AcknowledgmentMessage<AudioChunkAck>);
    /// Server acknowledged the `stop_recording` frame.
    on_stop_recording_acknowledgment => StopRecordingAcknowledgment(AcknowledgmentMessage<StopRecordingAck>);
}
