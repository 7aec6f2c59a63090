//! Configuration types for Gladia live transcription sessions.
//!
//! [`SessionConfig`] is the body of the session negotiation request. Field
//! names and enum string forms follow the provider's wire format, so the
//! struct can be serialized directly with `serde_json`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::utils::url_validation::validate_callback_url;

// =============================================================================
// Audio Encoding
// =============================================================================

/// Audio encodings accepted by the live endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioEncoding {
    /// Linear PCM (default)
    #[default]
    #[serde(rename = "wav/pcm")]
    WavPcm,
    /// G.711 A-law
    #[serde(rename = "wav/alaw")]
    WavAlaw,
    /// G.711 mu-law
    #[serde(rename = "wav/ulaw")]
    WavUlaw,
}

impl AudioEncoding {
    /// Wire value of the encoding.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WavPcm => "wav/pcm",
            Self::WavAlaw => "wav/alaw",
            Self::WavUlaw => "wav/ulaw",
        }
    }
}

impl FromStr for AudioEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wav/pcm" | "pcm" | "linear16" => Ok(Self::WavPcm),
            "wav/alaw" | "alaw" => Ok(Self::WavAlaw),
            "wav/ulaw" | "ulaw" | "mulaw" => Ok(Self::WavUlaw),
            other => Err(format!("Unsupported audio encoding: {other}")),
        }
    }
}

// =============================================================================
// Bit Depth / Sample Rate
// =============================================================================

/// Bits per sample. Serialized as a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum BitDepth {
    Eight,
    #[default]
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

impl From<BitDepth> for u32 {
    fn from(depth: BitDepth) -> Self {
        match depth {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
            BitDepth::TwentyFour => 24,
            BitDepth::ThirtyTwo => 32,
        }
    }
}

impl TryFrom<u32> for BitDepth {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            8 => Ok(Self::Eight),
            16 => Ok(Self::Sixteen),
            24 => Ok(Self::TwentyFour),
            32 => Ok(Self::ThirtyTwo),
            other => Err(format!("Unsupported bit depth: {other}")),
        }
    }
}

/// Sample rate in Hz. Serialized as a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum SampleRate {
    Hz8000,
    #[default]
    Hz16000,
    Hz32000,
    Hz44100,
    Hz48000,
}

impl SampleRate {
    #[inline]
    pub fn as_hz(&self) -> u32 {
        u32::from(*self)
    }
}

impl From<SampleRate> for u32 {
    fn from(rate: SampleRate) -> Self {
        match rate {
            SampleRate::Hz8000 => 8000,
            SampleRate::Hz16000 => 16000,
            SampleRate::Hz32000 => 32000,
            SampleRate::Hz44100 => 44100,
            SampleRate::Hz48000 => 48000,
        }
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            8000 => Ok(Self::Hz8000),
            16000 => Ok(Self::Hz16000),
            32000 => Ok(Self::Hz32000),
            44100 => Ok(Self::Hz44100),
            48000 => Ok(Self::Hz48000),
            other => Err(format!("Unsupported sample rate: {other} Hz")),
        }
    }
}

// =============================================================================
// Model / Region
// =============================================================================

/// Live transcription model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LiveModel {
    #[default]
    #[serde(rename = "solaria-1")]
    Solaria1,
}

impl LiveModel {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solaria1 => "solaria-1",
        }
    }
}

/// Processing region, sent as the `region` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Region {
    #[default]
    #[serde(rename = "us-west")]
    UsWest,
    #[serde(rename = "eu-west")]
    EuWest,
}

impl Region {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsWest => "us-west",
            Self::EuWest => "eu-west",
        }
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "us-west" | "us" => Ok(Self::UsWest),
            "eu-west" | "eu" => Ok(Self::EuWest),
            other => Err(format!("Unknown region: {other}")),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Feature Sections
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Expected languages (ISO 639-1). Empty means automatic detection.
    pub languages: Vec<String>,
    pub code_switching: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreProcessing {
    pub audio_enhancer: bool,
    /// Voice activity sensitivity between 0 and 1.
    pub speech_threshold: f32,
}

impl Default for PreProcessing {
    fn default() -> Self {
        Self {
            audio_enhancer: false,
            speech_threshold: 0.6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyEntry {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pronunciations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl VocabularyEntry {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomVocabularyConfig {
    pub vocabulary: Vec<VocabularyEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_intensity: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomSpellingConfig {
    /// Replacement spelling mapped to the spellings it replaces.
    pub spelling_dictionary: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationModel {
    #[default]
    Base,
    Enhanced,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub model: TranslationModel,
    pub target_languages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_original_utterances: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lipsync: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_adaptation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub informal: Option<bool>,
}

/// Realtime features applied to each utterance as it is recognized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeProcessing {
    pub custom_vocabulary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_vocabulary_config: Option<CustomVocabularyConfig>,
    pub custom_spelling: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_spelling_config: Option<CustomSpellingConfig>,
    pub translation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_config: Option<TranslationConfig>,
    pub named_entity_recognition: bool,
    pub sentiment_analysis: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryType {
    #[default]
    General,
    BulletPoints,
    Concise,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationConfig {
    #[serde(rename = "type")]
    pub summary_type: SummaryType,
}

/// Features run once the recording has ended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessing {
    pub summarization: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summarization_config: Option<SummarizationConfig>,
    pub chapterization: bool,
}

/// Which event categories the server pushes over the WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub receive_partial_transcripts: bool,
    pub receive_final_transcripts: bool,
    pub receive_speech_events: bool,
    pub receive_pre_processing_events: bool,
    pub receive_realtime_processing_events: bool,
    pub receive_post_processing_events: bool,
    pub receive_acknowledgments: bool,
    pub receive_errors: bool,
    pub receive_lifecycle_events: bool,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            receive_partial_transcripts: false,
            receive_final_transcripts: true,
            receive_speech_events: true,
            receive_pre_processing_events: true,
            receive_realtime_processing_events: true,
            receive_post_processing_events: true,
            receive_acknowledgments: true,
            receive_errors: true,
            receive_lifecycle_events: false,
        }
    }
}

impl MessagesConfig {
    /// Every category enabled.
    pub fn all() -> Self {
        Self {
            receive_partial_transcripts: true,
            receive_lifecycle_events: true,
            ..Default::default()
        }
    }
}

/// HTTP callback target that mirrors the WebSocket events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackConfig {
    pub url: String,
    #[serde(flatten)]
    pub events: Option<MessagesConfig>,
}

// =============================================================================
// SessionConfig
// =============================================================================

/// Body of the live session negotiation request.
///
/// Built once by the caller and never mutated by the client.
///
/// ```rust
/// use gladia_client::core::live::{SessionConfig, SampleRate, MessagesConfig};
///
/// let config = SessionConfig {
///     sample_rate: SampleRate::Hz16000,
///     messages_config: Some(MessagesConfig::all()),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub encoding: AudioEncoding,
    pub bit_depth: BitDepth,
    pub sample_rate: SampleRate,
    pub channels: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_metadata: Option<serde_json::Value>,
    pub model: LiveModel,
    /// Silence in seconds that closes an utterance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpointing: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_duration_without_endpointing: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_config: Option<LanguageConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_processing: Option<PreProcessing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime_processing: Option<RealtimeProcessing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_processing: Option<PostProcessing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages_config: Option<MessagesConfig>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub callback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_config: Option<CallbackConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            encoding: AudioEncoding::WavPcm,
            bit_depth: BitDepth::Sixteen,
            sample_rate: SampleRate::Hz16000,
            channels: 1,
            custom_metadata: None,
            model: LiveModel::Solaria1,
            endpointing: None,
            maximum_duration_without_endpointing: None,
            language_config: None,
            pre_processing: None,
            realtime_processing: None,
            post_processing: None,
            messages_config: None,
            callback: false,
            callback_config: None,
        }
    }
}

impl SessionConfig {
    /// Check the ranges the live endpoint enforces before making a request.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=8).contains(&self.channels) {
            return Err(format!(
                "channels must be between 1 and 8, got {}",
                self.channels
            ));
        }

        if let Some(endpointing) = self.endpointing
            && !(0.01..=10.0).contains(&endpointing)
        {
            return Err(format!(
                "endpointing must be between 0.01 and 10 seconds, got {endpointing}"
            ));
        }

        if let Some(max) = self.maximum_duration_without_endpointing
            && !(5.0..=60.0).contains(&max)
        {
            return Err(format!(
                "maximum_duration_without_endpointing must be between 5 and 60 seconds, got {max}"
            ));
        }

        if let Some(pre) = &self.pre_processing
            && !(0.0..=1.0).contains(&pre.speech_threshold)
        {
            return Err(format!(
                "speech_threshold must be between 0 and 1, got {}",
                pre.speech_threshold
            ));
        }

        if let Some(rt) = &self.realtime_processing
            && rt.translation
        {
            let has_targets = rt
                .translation_config
                .as_ref()
                .is_some_and(|t| !t.target_languages.is_empty());
            if !has_targets {
                return Err("translation requires at least one target language".to_string());
            }
        }

        if self.callback
            && self
                .callback_config
                .as_ref()
                .is_none_or(|c| c.url.is_empty())
        {
            return Err("callback requires callback_config.url".to_string());
        }

        if let Some(callback) = &self.callback_config
            && !callback.url.is_empty()
        {
            validate_callback_url(&callback.url)
                .map_err(|e| format!("invalid callback url: {e}"))?;
        }

        Ok(())
    }

    /// Duration in seconds covered by `bytes` of audio in this format.
    pub fn bytes_to_seconds(&self, bytes: usize) -> f64 {
        let bytes_per_second = self.sample_rate.as_hz() as f64
            * self.channels as f64
            * (u32::from(self.bit_depth) as f64 / 8.0);
        if bytes_per_second == 0.0 {
            return 0.0;
        }
        bytes as f64 / bytes_per_second
    }
}
