//! Service-account credentials and OAuth access tokens.

use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Lifetime requested for the signed assertion.
const ASSERTION_LIFETIME: Duration = Duration::from_secs(3600);

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// The fields of a service-account JSON key that token exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Read and parse a service-account key file.
    ///
    /// # Errors
    /// Returns `Input` if the file is missing or is not a service-account key.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Input(format!("cannot read credential file {}: {}", path.display(), e)))?;
        let key: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Input(format!("{} is not a service-account key: {}", path.display(), e)))?;

        if key.project_id.is_empty() || key.client_email.is_empty() {
            return Err(Error::Input(format!("{} has no project_id or client_email", path.display())));
        }

        Ok(key)
    }
}

/// A bearer token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Instant,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, lifetime: Duration) -> Self {
        Self { value: value.into(), expires_at: Instant::now() + lifetime }
    }

    /// True while the token is usable without a refresh.
    pub fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}

/// Source of access tokens for the synthesis backend.
pub trait TokenSource {
    /// Obtain a new access token.
    async fn fetch(&self) -> Result<AccessToken>;

    /// Project billed for the requests.
    fn project_id(&self) -> &str;
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME.as_secs()
}

/// Exchanges a signed service-account assertion for access tokens.
pub struct ServiceAccount {
    key: ServiceAccountKey,
    client: reqwest::Client,
}

impl ServiceAccount {
    /// Create a token source for `key`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(key: ServiceAccountKey, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        info!("Using service account {} (project {})", key.client_email, key.project_id);
        Ok(Self { key, client })
    }

    /// Build the RS256-signed JWT assertion.
    fn assertion(&self) -> Result<String> {
        let iat = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|e| Error::Auth(format!("system clock before epoch: {}", e)))?.as_secs();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME.as_secs(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes()).map_err(|e| Error::Auth(format!("invalid private key: {}", e)))?;
        jsonwebtoken::encode(&header, &claims, &key).map_err(|e| Error::Auth(format!("cannot sign assertion: {}", e)))
    }
}

impl TokenSource for ServiceAccount {
    async fn fetch(&self) -> Result<AccessToken> {
        let assertion = self.assertion()?;
        let body = format!("grant_type={}&assertion={}", urlencoding::encode(JWT_BEARER_GRANT), urlencoding::encode(&assertion));

        debug!("Requesting access token from {}", self.key.token_uri);
        let response = self
            .client
            .post(&self.key.token_uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!("token endpoint returned {}: {}", status, detail.trim())));
        }

        let token: TokenResponse = response.json().await?;
        debug!("Access token valid for {}s", token.expires_in);
        Ok(AccessToken::new(token.access_token, Duration::from_secs(token.expires_in)))
    }

    fn project_id(&self) -> &str {
        &self.key.project_id
    }
}
