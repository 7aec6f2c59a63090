//! Gladia pre-recorded (batch) transcription.
//!
//! Audio is either uploaded with [`GladiaRestClient::upload`] or referenced by
//! URL. A job is submitted with [`GladiaRestClient::pre_recorded`] and its
//! result fetched by id once its status is `done`.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use gladia_client::config::ClientConfig;
//! use gladia_client::core::rest::{GladiaRestClient, TranscriptionRequest};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GladiaRestClient::new(ClientConfig::from_env()?)?;
//! let upload = client.upload(Path::new("meeting.wav")).await?;
//!
//! let job = client
//!     .pre_recorded(&TranscriptionRequest::new(upload.audio_url))
//!     .await?;
//! let result = client
//!     .wait_for_result(&job.id, Duration::from_secs(2), Duration::from_secs(600))
//!     .await?;
//! println!("{}", result.full_transcript().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod messages;


pub use client::{GladiaRestClient, PRERECORDED_PATH, UPLOAD_PATH};
pub use messages::{
    AudioMetadata, AudioToLlmConfig, CallbackMethod, DiarizationConfig, JobStatus,
    ListResultsQuery, PrerecordedCallbackConfig, PrerecordedTranscript,
    StructuredDataExtractionConfig, Subtitle, SubtitleFormat, SubtitleStyle, SubtitlesConfig,
    TranscriptionFile, TranscriptionJobResponse, TranscriptionListResults, TranscriptionOutput,
    TranscriptionRequest, TranscriptionResult, UploadResponse,
};
