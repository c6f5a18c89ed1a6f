//! Synthesis gateway: token caching and the refresh-and-retry-once policy.

use tracing::{debug, info, warn};

use super::credentials::{AccessToken, TokenSource};
use super::google::SpeechBackend;
use crate::config::VoiceConfig;
use crate::error::{Error, Result};

/// Turns sentence text into audio bytes.
pub trait Synthesize {
    async fn synthesize(&mut self, text: &str) -> Result<Vec<u8>>;
}

/// Speech synthesis gateway.
///
/// Keeps one cached access token. A request rejected as unauthorized triggers exactly
/// one token refresh and one retry before the failure is surfaced.
pub struct Gateway<T, B> {
    tokens: T,       // Access token source
    backend: B,      // Speech service
    voice: VoiceConfig,
    token: Option<AccessToken>,
}

impl<T: TokenSource, B: SpeechBackend> Gateway<T, B> {
    pub fn new(tokens: T, backend: B, voice: VoiceConfig) -> Self {
        Self { tokens, backend, voice, token: None }
    }

    /// Fetch the first token up front so credential problems surface at startup.
    ///
    /// # Errors
    /// Returns an error if no token can be obtained.
    pub async fn authorize(&mut self) -> Result<()> {
        self.refresh().await.map(|_| ())
    }

    async fn refresh(&mut self) -> Result<String> {
        let token = self.tokens.fetch().await?;
        info!("🔑 Access token refreshed");
        let value = token.value.clone();
        self.token = Some(token);
        Ok(value)
    }

    async fn current_token(&mut self) -> Result<String> {
        if let Some(token) = self.token.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }
        self.refresh().await
    }

    async fn attempt(&self, token: &str, text: &str) -> Result<Vec<u8>> {
        self.backend.synthesize(token, self.tokens.project_id(), text, &self.voice).await
    }
}

impl<T: TokenSource, B: SpeechBackend> Synthesize for Gateway<T, B> {
    async fn synthesize(&mut self, text: &str) -> Result<Vec<u8>> {
        let token = self.current_token().await?;

        match self.attempt(&token, text).await {
            Err(Error::Unauthorized(reason)) => {
                warn!("Synthesis unauthorized ({}), refreshing token and retrying once", reason);
                self.token = None;
                let token = self.refresh().await?;
                match self.attempt(&token, text).await {
                    Err(Error::Unauthorized(reason)) => Err(Error::Auth(format!("credential rejected after refresh: {}", reason))),
                    other => other,
                }
            }
            Ok(audio) => {
                debug!("Synthesized {} bytes", audio.len());
                Ok(audio)
            }
            Err(e) => Err(e),
        }
    }
}
