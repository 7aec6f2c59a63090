//! Server-to-client event catalog for Gladia live sessions.
//!
//! Every text frame from the server is one JSON object with a `type`
//! discriminant, `session_id`, `created_at`, an optional `error` and a
//! type-specific `data` object. [`LiveEvent::parse`] turns one frame into one
//! variant of the [`LiveEvent`] sum type.
//!
//! The provider omits fields inconsistently across event kinds, so every
//! payload field decodes to its default when absent.
//!
//! Three envelope shapes are used:
//!
//! - [`EventMessage`]: `data` or `error`, never both and never neither
//! - [`AcknowledgmentMessage`]: `acknowledged` flag, optional `data` and `error`
//! - [`LifecycleMessage`]: session and recording markers without data

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::warn;

use crate::errors::EventError;

// =============================================================================
// Event Kind
// =============================================================================

/// Discriminant of a live event, as carried in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SpeechStart,
    SpeechEnd,
    Transcript,
    Translation,
    NamedEntityRecognition,
    SentimentAnalysis,
    PostTranscript,
    FinalTranscript,
    Chapterization,
    Summarization,
    StartSession,
    EndSession,
    StartRecording,
    EndRecording,
    AudioChunkAcknowledgment,
    StopRecordingAcknowledgment,
}

impl EventKind {
    /// Every known kind, in catalog order.
    pub const ALL: [EventKind; 16] = [
        EventKind::SpeechStart,
        EventKind::SpeechEnd,
        EventKind::Transcript,
        EventKind::Translation,
        EventKind::NamedEntityRecognition,
        EventKind::SentimentAnalysis,
        EventKind::PostTranscript,
        EventKind::FinalTranscript,
        EventKind::Chapterization,
        EventKind::Summarization,
        EventKind::StartSession,
        EventKind::EndSession,
        EventKind::StartRecording,
        EventKind::EndRecording,
        EventKind::AudioChunkAcknowledgment,
        EventKind::StopRecordingAcknowledgment,
    ];

    /// Wire value of the `type` field.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpeechStart => "speech_start",
            Self::SpeechEnd => "speech_end",
            Self::Transcript => "transcript",
            Self::Translation => "translation",
            Self::NamedEntityRecognition => "named_entity_recognition",
            Self::SentimentAnalysis => "sentiment_analysis",
            Self::PostTranscript => "post_transcript",
            Self::FinalTranscript => "final_transcript",
            Self::Chapterization => "chapterization",
            Self::Summarization => "summarization",
            Self::StartSession => "start_session",
            Self::EndSession => "end_session",
            Self::StartRecording => "start_recording",
            Self::EndRecording => "end_recording",
            Self::AudioChunkAcknowledgment => "audio_chunk",
            Self::StopRecordingAcknowledgment => "stop_recording",
        }
    }

    /// Map a `type` value to its kind.
    ///
    /// The `post_*` spellings used by some API versions for post-processing
    /// results resolve to the same kinds.
    pub fn from_wire(value: &str) -> Option<Self> {
        let kind = match value {
            "speech_start" => Self::SpeechStart,
            "speech_end" => Self::SpeechEnd,
            "transcript" => Self::Transcript,
            "translation" => Self::Translation,
            "named_entity_recognition" => Self::NamedEntityRecognition,
            "sentiment_analysis" => Self::SentimentAnalysis,
            "post_transcript" => Self::PostTranscript,
            "final_transcript" | "post_final_transcript" => Self::FinalTranscript,
            "chapterization" | "post_chapterization" => Self::Chapterization,
            "summarization" | "post_summarization" => Self::Summarization,
            "start_session" => Self::StartSession,
            "end_session" => Self::EndSession,
            "start_recording" => Self::StartRecording,
            "end_recording" => Self::EndRecording,
            "audio_chunk" => Self::AudioChunkAcknowledgment,
            "stop_recording" => Self::StopRecordingAcknowledgment,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Parse Errors
// =============================================================================

/// Why a text frame could not be turned into a [`LiveEvent`].
#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Message has no type field")]
    MissingType,

    #[error("Unknown event type: {0}")]
    UnknownType(String),

    #[error("Invalid {kind} payload: {reason}")]
    InvalidPayload { kind: EventKind, reason: String },

    #[error("{0} event carries neither data nor error")]
    MissingPayload(EventKind),
}

// =============================================================================
// Envelopes
// =============================================================================

/// Event whose outcome is either a data payload or a per-event error.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMessage<T> {
    pub session_id: String,
    pub created_at: String,
    /// `Ok(data)` or `Err(error)`, mirroring the exclusive `data` / `error` fields.
    pub outcome: Result<T, EventError>,
}

impl<T> EventMessage<T> {
    #[inline]
    pub fn data(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    #[inline]
    pub fn error(&self) -> Option<&EventError> {
        self.outcome.as_ref().err()
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Server acknowledgment of a client frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AcknowledgmentMessage<T> {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<EventError>,
}

/// Session or recording lifecycle marker.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LifecycleMessage {
    pub session_id: String,
    pub created_at: String,
    pub error: Option<EventError>,
}

/// Wire form of [`EventMessage`] before the data/error check.
#[derive(Deserialize)]
struct RawEventMessage<T> {
    #[serde(default)]
    session_id: String,
    #[serde(default)]
    created_at: String,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    error: Option<EventError>,
}

impl<T> RawEventMessage<T> {
    fn into_message(self, kind: EventKind) -> Result<EventMessage<T>, EventParseError> {
        let outcome = match (self.data, self.error) {
            (_, Some(error)) if error_is_set(&error) => {
                // error wins when both are present
                Err(error)
            }
            (Some(data), _) => Ok(data),
            (None, Some(error)) => Err(error),
            (None, None) => return Err(EventParseError::MissingPayload(kind)),
        };

        if let Err(error) = &outcome {
            warn!(
                "Gladia {} event for session {} reported an error: {}",
                kind, self.session_id, error
            );
        }

        Ok(EventMessage {
            session_id: self.session_id,
            created_at: self.created_at,
            outcome,
        })
    }
}

/// An `error: {}` object with nothing in it does not count as an error when
/// data is also present.
fn error_is_set(error: &EventError) -> bool {
    error.status_code != 0 || !error.exception.is_empty() || !error.message.is_empty()
}

// =============================================================================
// Shared Transcript Types
// =============================================================================

/// One recognized word with timing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Word {
    pub word: String,
    pub start: f64,
    pub end: f64,
    pub confidence: f64,
}

/// One contiguous recognized speech segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Utterance {
    pub language: String,
    pub start: f64,
    pub end: f64,
    pub confidence: f64,
    pub channel: u32,
    pub words: Vec<Word>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<u32>,
}

// =============================================================================
// Realtime Payloads
// =============================================================================

/// Payload of `speech_start` and `speech_end`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpeechData {
    /// Seconds since the start of the recording
    pub time: f64,
    pub channel: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TranscriptData {
    pub id: String,
    /// False for partial transcripts that may still change
    pub is_final: bool,
    pub utterance: Utterance,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TranslationData {
    pub utterance_id: String,
    pub utterance: Utterance,
    pub original_language: String,
    pub target_language: String,
    pub translated_utterance: Utterance,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NamedEntity {
    pub entity_type: String,
    pub text: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NamedEntityRecognitionData {
    pub utterance_id: String,
    pub utterance: Utterance,
    pub results: Vec<NamedEntity>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Sentiment {
    pub sentiment: String,
    pub emotion: String,
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub channel: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SentimentAnalysisData {
    pub utterance_id: String,
    pub utterance: Utterance,
    pub results: Vec<Sentiment>,
}

// =============================================================================
// Post-Processing Payloads
// =============================================================================

/// Full transcript assembled after the recording ended.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PostTranscriptData {
    pub full_transcript: String,
    pub languages: Vec<String>,
    pub utterances: Vec<Utterance>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TranscriptMetadata {
    pub audio_duration: f64,
    pub number_of_distinct_channels: u32,
    pub billing_time: f64,
    pub transcription_time: f64,
}

/// Last result of a session: transcript plus every enabled add-on.
///
/// Add-on results are kept as raw JSON; their shape depends on the
/// configuration of each feature.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FinalTranscriptData {
    pub metadata: TranscriptMetadata,
    pub transcription: Option<PostTranscriptData>,
    pub translation: Option<serde_json::Value>,
    pub summarization: Option<serde_json::Value>,
    pub named_entity_recognition: Option<serde_json::Value>,
    pub sentiment_analysis: Option<serde_json::Value>,
    pub chapterization: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Chapter {
    pub headline: String,
    pub summary: String,
    pub abstractive_summary: String,
    pub keywords: Vec<String>,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChapterizationData {
    pub results: Vec<Chapter>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SummarizationData {
    pub results: String,
}

// =============================================================================
// Lifecycle / Acknowledgment Payloads
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EndRecordingData {
    /// Seconds of audio received
    pub recording_duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AudioChunkAck {
    /// Byte offsets of the chunk within the stream
    pub byte_range: [u64; 2],
    /// Time span of the chunk in seconds
    pub time_range: [f64; 2],
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StopRecordingAck {
    pub recording_duration: f64,
    pub recording_left_to_process: f64,
}

// =============================================================================
// LiveEvent
// =============================================================================

/// Every event the live endpoint can push.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    SpeechStart(EventMessage<SpeechData>),
    SpeechEnd(EventMessage<SpeechData>),
    Transcript(EventMessage<TranscriptData>),
    Translation(EventMessage<TranslationData>),
    NamedEntityRecognition(EventMessage<NamedEntityRecognitionData>),
    SentimentAnalysis(EventMessage<SentimentAnalysisData>),
    PostTranscript(EventMessage<PostTranscriptData>),
    FinalTranscript(EventMessage<FinalTranscriptData>),
    Chapterization(EventMessage<ChapterizationData>),
    Summarization(EventMessage<SummarizationData>),
    StartSession(LifecycleMessage),
    EndSession(LifecycleMessage),
    StartRecording(LifecycleMessage),
    EndRecording(EventMessage<EndRecordingData>),
    AudioChunkAcknowledgment(AcknowledgmentMessage<AudioChunkAck>),
    StopRecordingAcknowledgment(AcknowledgmentMessage<StopRecordingAck>),
}

fn decode<T: DeserializeOwned>(text: &str, kind: EventKind) -> Result<T, EventParseError> {
    serde_json::from_str(text).map_err(|e| EventParseError::InvalidPayload {
        kind,
        reason: e.to_string(),
    })
}

fn decode_event<T: DeserializeOwned>(
    text: &str,
    kind: EventKind,
) -> Result<EventMessage<T>, EventParseError> {
    decode::<RawEventMessage<T>>(text, kind)?.into_message(kind)
}

impl LiveEvent {
    /// Parse one WebSocket text frame.
    ///
    /// # Returns
    /// * `Ok(LiveEvent)` - Known event with a decodable payload
    /// * `Err(EventParseError)` - Malformed JSON, missing or unknown `type`,
    ///   or a payload that breaks the data/error rule
    pub fn parse(text: &str) -> Result<Self, EventParseError> {
        #[derive(Deserialize)]
        struct TypePeek {
            #[serde(rename = "type", default)]
            message_type: Option<String>,
        }

        let peek: TypePeek =
            serde_json::from_str(text).map_err(|e| EventParseError::InvalidJson(e.to_string()))?;
        let message_type = peek.message_type.ok_or(EventParseError::MissingType)?;
        let kind = EventKind::from_wire(&message_type)
            .ok_or_else(|| EventParseError::UnknownType(message_type.clone()))?;

        let event = match kind {
            EventKind::SpeechStart => LiveEvent::SpeechStart(decode_event(text, kind)?),
            EventKind::SpeechEnd => LiveEvent::SpeechEnd(decode_event(text, kind)?),
            EventKind::Transcript => LiveEvent::Transcript(decode_event(text, kind)?),
            EventKind::Translation => LiveEvent::Translation(decode_event(text, kind)?),
            EventKind::NamedEntityRecognition => {
                LiveEvent::NamedEntityRecognition(decode_event(text, kind)?)
            }
            EventKind::SentimentAnalysis => {
                LiveEvent::SentimentAnalysis(decode_event(text, kind)?)
            }
            EventKind::PostTranscript => LiveEvent::PostTranscript(decode_event(text, kind)?),
            EventKind::FinalTranscript => LiveEvent::FinalTranscript(decode_event(text, kind)?),
            EventKind::Chapterization => LiveEvent::Chapterization(decode_event(text, kind)?),
            EventKind::Summarization => LiveEvent::Summarization(decode_event(text, kind)?),
            EventKind::StartSession => LiveEvent::StartSession(decode(text, kind)?),
            EventKind::EndSession => LiveEvent::EndSession(decode(text, kind)?),
            EventKind::StartRecording => LiveEvent::StartRecording(decode(text, kind)?),
            EventKind::EndRecording => LiveEvent::EndRecording(decode_event(text, kind)?),
            EventKind::AudioChunkAcknowledgment => {
                LiveEvent::AudioChunkAcknowledgment(decode(text, kind)?)
            }
            EventKind::StopRecordingAcknowledgment => {
                LiveEvent::StopRecordingAcknowledgment(decode(text, kind)?)
            }
        };

        Ok(event)
    }

    /// Discriminant of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            LiveEvent::SpeechStart(_) => EventKind::SpeechStart,
            LiveEvent::SpeechEnd(_) => EventKind::SpeechEnd,
            LiveEvent::Transcript(_) => EventKind::Transcript,
            LiveEvent::Translation(_) => EventKind::Translation,
            LiveEvent::NamedEntityRecognition(_) => EventKind::NamedEntityRecognition,
            LiveEvent::SentimentAnalysis(_) => EventKind::SentimentAnalysis,
            LiveEvent::PostTranscript(_) => EventKind::PostTranscript,
            LiveEvent::FinalTranscript(_) => EventKind::FinalTranscript,
            LiveEvent::Chapterization(_) => EventKind::Chapterization,
            LiveEvent::Summarization(_) => EventKind::Summarization,
            LiveEvent::StartSession(_) => EventKind::StartSession,
            LiveEvent::EndSession(_) => EventKind::EndSession,
            LiveEvent::StartRecording(_) => EventKind::StartRecording,
            LiveEvent::EndRecording(_) => EventKind::EndRecording,
            LiveEvent::AudioChunkAcknowledgment(_) => EventKind::AudioChunkAcknowledgment,
            LiveEvent::StopRecordingAcknowledgment(_) => EventKind::StopRecordingAcknowledgment,
        }
    }

    /// Session the event belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            LiveEvent::SpeechStart(m) | LiveEvent::SpeechEnd(m) => &m.session_id,
            LiveEvent::Transcript(m) => &m.session_id,
            LiveEvent::Translation(m) => &m.session_id,
            LiveEvent::NamedEntityRecognition(m) => &m.session_id,
            LiveEvent::SentimentAnalysis(m) => &m.session_id,
            LiveEvent::PostTranscript(m) => &m.session_id,
            LiveEvent::FinalTranscript(m) => &m.session_id,
            LiveEvent::Chapterization(m) => &m.session_id,
            LiveEvent::Summarization(m) => &m.session_id,
            LiveEvent::StartSession(m) | LiveEvent::EndSession(m) | LiveEvent::StartRecording(m) => {
                &m.session_id
            }
            LiveEvent::EndRecording(m) => &m.session_id,
            LiveEvent::AudioChunkAcknowledgment(m) => &m.session_id,
            LiveEvent::StopRecordingAcknowledgment(m) => &m.session_id,
        }
    }

    /// Check if this event is a final (non-partial) transcript.
    #[inline]
    pub fn is_final_transcript(&self) -> bool {
        matches!(self, LiveEvent::Transcript(m) if m.data().is_some_and(|d| d.is_final))
    }
}
