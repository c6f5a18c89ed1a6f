//! Google Cloud Text-to-Speech REST backend.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::VoiceConfig;
use crate::error::{Error, Result};

/// A single synthesis call against the speech service.
pub trait SpeechBackend {
    /// Synthesize `text` with `voice`, authorized by `token` and billed to `project_id`.
    async fn synthesize(&self, token: &str, project_id: &str, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisRequest<'a> {
    input: TextInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    speaking_rate: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisResponse {
    #[serde(default)]
    audio_content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

impl<'a> SynthesisRequest<'a> {
    fn new(text: &'a str, voice: &'a VoiceConfig) -> Self {
        Self {
            input: TextInput { text },
            voice: VoiceSelection { language_code: &voice.language_code, name: &voice.voice_name },
            audio_config: AudioConfig { audio_encoding: voice.audio_encoding.api_name(), speaking_rate: voice.speaking_rate },
        }
    }
}

/// HTTP client for `text:synthesize`.
pub struct GoogleTts {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTts {
    /// Create a backend posting to `endpoint`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint: endpoint.into() })
    }
}

impl SpeechBackend for GoogleTts {
    async fn synthesize(&self, token: &str, project_id: &str, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>> {
        debug!("POST {} ({} chars)", self.endpoint, text.chars().count());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .header("X-Goog-User-Project", project_id)
            .json(&SynthesisRequest::new(text, voice))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body).map(|b| b.error.message).unwrap_or(body);
            return Err(status_error(status, message.trim()));
        }

        let body: SynthesisResponse = response.json().await?;
        match body.audio_content.filter(|content| !content.is_empty()) {
            Some(content) => Ok(STANDARD.decode(content)?),
            None => Err(Error::Synthesis("no audio content received".to_string())),
        }
    }
}

fn status_error(status: StatusCode, message: &str) -> Error {
    match status {
        StatusCode::UNAUTHORIZED => Error::Unauthorized(format!("{}: {}", status, message)),
        StatusCode::FORBIDDEN => Error::Auth(format!("permission denied, check the Text-to-Speech role ({})", message)),
        _ => Error::Synthesis(format!("backend returned {}: {}", status, message)),
    }
}
