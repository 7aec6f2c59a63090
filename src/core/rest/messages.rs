//! Request and response types for the pre-recorded transcription API.
//!
//! Feature sections shared with live sessions (vocabulary, spelling,
//! translation, summarization, language) reuse the live config types so both
//! APIs serialize them identically.

use serde::{Deserialize, Serialize};

use crate::core::live::{
    CustomSpellingConfig, CustomVocabularyConfig, LanguageConfig, SummarizationConfig,
    TranscriptMetadata, TranslationConfig, Utterance,
};
use crate::utils::url_validation::validate_callback_url;

// =============================================================================
// Transcription Request
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallbackMethod {
    #[default]
    Post,
    Put,
}

/// Where the API posts the result once the job completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrerecordedCallbackConfig {
    pub url: String,
    #[serde(default)]
    pub method: CallbackMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Srt,
    Vtt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleStyle {
    #[default]
    Default,
    Compliance,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitlesConfig {
    pub formats: Vec<SubtitleFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_characters_per_row: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_rows_per_caption: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<SubtitleStyle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiarizationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_speakers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_speakers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_speakers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredDataExtractionConfig {
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioToLlmConfig {
    pub prompts: Vec<String>,
}

/// Body of `POST /v2/pre-recorded`.
///
/// Each feature is a boolean switch plus an optional `*_config` section. A
/// config section without its switch is ignored by the API.
///
/// ```rust
/// use gladia_client::core::rest::{DiarizationConfig, TranscriptionRequest};
///
/// let request = TranscriptionRequest {
///     diarization: true,
///     diarization_config: Some(DiarizationConfig {
///         number_of_speakers: Some(2),
///         ..Default::default()
///     }),
///     ..TranscriptionRequest::new("https://example.com/call.wav")
/// };
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionRequest {
    pub audio_url: String,

    pub custom_vocabulary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_vocabulary_config: Option<CustomVocabularyConfig>,

    pub callback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_config: Option<PrerecordedCallbackConfig>,

    pub subtitles: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitles_config: Option<SubtitlesConfig>,

    pub diarization: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diarization_config: Option<DiarizationConfig>,

    pub translation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_config: Option<TranslationConfig>,

    pub summarization: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summarization_config: Option<SummarizationConfig>,

    pub moderation: bool,
    pub named_entity_recognition: bool,
    pub chapterization: bool,
    pub name_consistency: bool,

    pub custom_spelling: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_spelling_config: Option<CustomSpellingConfig>,

    pub structured_data_extraction: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_data_extraction_config: Option<StructuredDataExtractionConfig>,

    pub sentiment_analysis: bool,

    pub audio_to_llm: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_to_llm_config: Option<AudioToLlmConfig>,

    pub sentences: bool,
    pub display_mode: bool,
    pub punctuation_enhanced: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_config: Option<LanguageConfig>,
}

impl TranscriptionRequest {
    /// Request with every feature off.
    pub fn new(audio_url: impl Into<String>) -> Self {
        Self {
            audio_url: audio_url.into(),
            ..Default::default()
        }
    }

    /// Reject requests the API would refuse for structural reasons.
    pub fn validate(&self) -> Result<(), String> {
        if self.audio_url.trim().is_empty() {
            return Err("audio_url is required".to_string());
        }

        if self.callback {
            let Some(callback) = &self.callback_config else {
                return Err("callback requires callback_config".to_string());
            };
            validate_callback_url(&callback.url)
                .map_err(|e| format!("invalid callback url: {e}"))?;
        }

        if self.translation
            && self
                .translation_config
                .as_ref()
                .is_none_or(|t| t.target_languages.is_empty())
        {
            return Err("translation requires at least one target language".to_string());
        }

        if let Some(diarization) = &self.diarization_config
            && let (Some(min), Some(max)) = (diarization.min_speakers, diarization.max_speakers)
            && min > max
        {
            return Err(format!(
                "min_speakers ({min}) cannot exceed max_speakers ({max})"
            ));
        }

        if self.subtitles
            && self
                .subtitles_config
                .as_ref()
                .is_some_and(|s| s.formats.is_empty())
        {
            return Err("subtitles_config.formats cannot be empty".to_string());
        }

        Ok(())
    }
}

// =============================================================================
// Listing Query
// =============================================================================

/// Job status as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Queued,
    Processing,
    Done,
    Error,
}

impl JobStatus {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    /// Whether the job will not change anymore.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "done" => Ok(JobStatus::Done),
            "error" => Ok(JobStatus::Error),
            other => Err(format!("Unknown job status: {other}")),
        }
    }
}

/// Filters for `GET /v2/pre-recorded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResultsQuery {
    pub offset: u32,
    pub limit: u32,
    pub date: Option<String>,
    pub before_date: Option<String>,
    pub after_date: Option<String>,
    pub status: Vec<JobStatus>,
}

impl Default for ListResultsQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
            date: None,
            before_date: None,
            after_date: None,
            status: Vec::new(),
        }
    }
}

impl ListResultsQuery {
    /// Query string pairs. `status` repeats once per value.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("offset", self.offset.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(date) = &self.date {
            pairs.push(("date", date.clone()));
        }
        if let Some(before) = &self.before_date {
            pairs.push(("before_date", before.clone()));
        }
        if let Some(after) = &self.after_date {
            pairs.push(("after_date", after.clone()));
        }
        pairs.extend(self.status.iter().map(|s| ("status", s.as_str().to_string())));
        pairs
    }
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AudioMetadata {
    pub id: String,
    pub filename: String,
    pub extension: String,
    pub size: u64,
    pub audio_duration: f64,
    pub number_of_channels: u32,
}

/// Answer to `POST /v2/upload`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UploadResponse {
    /// URL to pass as `audio_url` in a transcription request
    pub audio_url: String,
    pub audio_metadata: AudioMetadata,
}

/// Answer to `POST /v2/pre-recorded`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TranscriptionJobResponse {
    pub id: String,
    pub result_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TranscriptionFile {
    pub id: String,
    pub filename: String,
    pub source: String,
    pub audio_duration: f64,
    pub number_of_channels: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Subtitle {
    pub format: String,
    pub subtitles: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PrerecordedTranscript {
    pub full_transcript: String,
    pub languages: Vec<String>,
    pub utterances: Vec<Utterance>,
    pub subtitles: Vec<Subtitle>,
}

/// `result` section of a finished job. Add-on results stay raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TranscriptionOutput {
    pub metadata: TranscriptMetadata,
    pub transcription: Option<PrerecordedTranscript>,
    pub translation: Option<serde_json::Value>,
    pub summarization: Option<serde_json::Value>,
    pub moderation: Option<serde_json::Value>,
    pub named_entity_recognition: Option<serde_json::Value>,
    pub name_consistency: Option<serde_json::Value>,
    pub custom_spelling: Option<serde_json::Value>,
    pub structured_data_extraction: Option<serde_json::Value>,
    pub sentiment_analysis: Option<serde_json::Value>,
    pub audio_to_llm: Option<serde_json::Value>,
    pub sentences: Option<serde_json::Value>,
    pub display_mode: Option<serde_json::Value>,
    pub chapterization: Option<serde_json::Value>,
    pub diarization: Option<serde_json::Value>,
}

/// Answer to `GET /v2/pre-recorded/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TranscriptionResult {
    pub id: String,
    pub request_id: String,
    pub version: u32,
    pub status: JobStatus,
    pub created_at: String,
    pub kind: String,
    pub completed_at: Option<String>,
    pub error_code: Option<i32>,
    pub file: Option<TranscriptionFile>,
    pub request_params: Option<serde_json::Value>,
    pub result: Option<TranscriptionOutput>,
}

impl TranscriptionResult {
    /// Full transcript, once the job is done.
    pub fn full_transcript(&self) -> Option<&str> {
        self.result
            .as_ref()?
            .transcription
            .as_ref()
            .map(|t| t.full_transcript.as_str())
    }
}

/// One page of `GET /v2/pre-recorded`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TranscriptionListResults {
    pub first: String,
    pub current: String,
    pub next: Option<String>,
    pub items: Vec<TranscriptionResult>,
}
