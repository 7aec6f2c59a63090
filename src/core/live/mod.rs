//! Gladia live (real-time) transcription.
//!
//! A live session runs in two phases:
//!
//! 1. **Negotiation**: [`LiveClient::negotiate`] posts a [`SessionConfig`] to
//!    `/v2/live` and receives a [`SessionHandle`] (session id + WebSocket URL).
//! 2. **Streaming**: [`LiveSession::start`] opens the WebSocket. Audio goes up
//!    as binary frames or base64 `audio_chunk` JSON frames, events come down
//!    as JSON text frames and are routed by the [`EventDispatcher`].
//!
//! # Session states
//!
//! ```text
//! Idle ──start()──▶ Connecting ──handshake ok──▶ Open ──send_stop()──▶ Stopping
//!                        │                         │                       │
//!                        └──── failure ────────────┴──── server close ─────┴──▶ Closed
//! ```
//!
//! `Closed` is terminal. Audio is accepted only while `Open` and before the
//! stop frame has been sent.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use gladia_client::config::ClientConfig;
//! use gladia_client::core::live::{LiveClient, MessagesConfig, SessionConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LiveClient::new(ClientConfig::from_env()?)?;
//! let config = SessionConfig {
//!     messages_config: Some(MessagesConfig::all()),
//!     ..Default::default()
//! };
//!
//! let session = client.connect(&config).await?;
//! session.events().on_transcript(|msg| async move {
//!     if let Some(data) = msg.data() && data.is_final {
//!         println!("{}", data.utterance.text);
//!     }
//! });
//! session.events().on_disconnected(|| async { println!("done") });
//!
//! if session.start().await {
//!     session.send_audio_binary(vec![0u8; 3200]).await;
//!     session.close(Duration::from_secs(30)).await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
mod dispatcher;
pub mod frames;
pub mod messages;
mod negotiator;
mod session;
mod state;


pub use config::{
    AudioEncoding, BitDepth, CallbackConfig, CustomSpellingConfig, CustomVocabularyConfig,
    LanguageConfig, LiveModel, MessagesConfig, PostProcessing, PreProcessing, RealtimeProcessing,
    Region, SampleRate, SessionConfig, SummarizationConfig, SummaryType, TranslationConfig,
    TranslationModel, VocabularyEntry,
};
pub use dispatcher::{ConnectivityCallback, ErrorCallback, EventDispatcher};
pub use messages::{
    AcknowledgmentMessage, AudioChunkAck, Chapter, ChapterizationData, EndRecordingData,
    EventKind, EventMessage, EventParseError, FinalTranscriptData, LifecycleMessage, LiveEvent,
    NamedEntity, NamedEntityRecognitionData, PostTranscriptData, Sentiment, SentimentAnalysisData,
    SpeechData, StopRecordingAck, SummarizationData, TranscriptData, TranscriptMetadata,
    TranslationData, Utterance, Word,
};
pub use negotiator::{LIVE_PATH, LiveClient, SessionHandle};
pub use session::{DEFAULT_CONNECT_TIMEOUT, LiveSession};
pub use state::SessionState;
