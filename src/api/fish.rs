//! Fish Audio request/response types
//!
//! The proxy forwards caller bodies unchanged; these types only validate
//! and summarize what passes through.

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Audio container requested from `/v1/tts`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Pcm,
    #[default]
    Mp3,
    Opus,
}

impl AudioFormat {
    /// Known format by its wire name; the upstream may accept others
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "wav" => Some(AudioFormat::Wav),
            "pcm" => Some(AudioFormat::Pcm),
            "mp3" => Some(AudioFormat::Mp3),
            "opus" => Some(AudioFormat::Opus),
            _ => None,
        }
    }

    /// MIME type of audio produced in this format
    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Pcm => "audio/pcm",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Opus => "audio/ogg",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Pcm => "pcm",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Opus => "opus",
        }
    }
}

/// Body of `POST /tts`.
///
/// The upstream owns this schema, so only `text` is checked; option fields
/// keep whatever strings and numbers the caller sent.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TtsRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalize: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mp3_bitrate: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opus_bitrate: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<String>,
}

impl TtsRequest {
    /// Parse a raw request body: a JSON object with a string `text`
    pub fn parse(body: &[u8]) -> Result<Self, String> {
        serde_json::from_slice(body).map_err(|e| e.to_string())
    }

    /// Requested format name, `mp3` when omitted
    pub fn format_name(&self) -> &str {
        self.format.as_deref().unwrap_or(AudioFormat::default().as_str())
    }

    /// Format the audio will come back in, if it is one we know
    pub fn audio_format(&self) -> Option<AudioFormat> {
        AudioFormat::from_name(self.format_name())
    }
}

/// Response of `GET /model`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelList {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub items: Vec<ModelSummary>,
}

/// A single voice model entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}
