//! Client-to-server frames for live sessions.
//!
//! Audio goes out either as a raw binary frame or base64-wrapped in an
//! `audio_chunk` JSON text frame. The stop signal is always a JSON text frame.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::Serialize;
use tokio_tungstenite::tungstenite::protocol::Message;

/// Payload of an `audio_chunk` frame.
#[derive(Debug, Clone, Serialize)]
pub struct AudioChunkData {
    /// Base64 (standard alphabet, padded) audio bytes
    pub chunk: String,
}

/// JSON-wrapped audio frame.
#[derive(Debug, Clone, Serialize)]
pub struct AudioChunkFrame {
    #[serde(rename = "type")]
    pub message_type: &'static str,
    pub data: AudioChunkData,
}

impl AudioChunkFrame {
    pub fn new(audio: &[u8]) -> Self {
        Self {
            message_type: "audio_chunk",
            data: AudioChunkData {
                chunk: BASE64.encode(audio),
            },
        }
    }
}

/// Request to stop recording and flush post-processing results.
#[derive(Debug, Clone, Serialize)]
pub struct StopRecordingFrame {
    #[serde(rename = "type")]
    pub message_type: &'static str,
}

impl Default for StopRecordingFrame {
    fn default() -> Self {
        Self {
            message_type: "stop_recording",
        }
    }
}

/// Raw audio as one binary frame, bytes untouched.
#[inline]
pub fn binary_audio(audio: impl Into<Bytes>) -> Message {
    Message::Binary(audio.into())
}

/// Audio wrapped as `{"type":"audio_chunk","data":{"chunk":"<base64>"}}`.
pub fn json_audio(audio: &[u8]) -> Result<Message, serde_json::Error> {
    let json = serde_json::to_string(&AudioChunkFrame::new(audio))?;
    Ok(Message::Text(json.into()))
}

/// `{"type":"stop_recording"}` text frame.
pub fn stop_recording() -> Result<Message, serde_json::Error> {
    let json = serde_json::to_string(&StopRecordingFrame::default())?;
    Ok(Message::Text(json.into()))
}
