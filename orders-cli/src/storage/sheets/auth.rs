//! Service account authentication for the Google Sheets API
//!
//! Signs an RS256 JWT with the account's private key and exchanges it for a
//! bearer token at the account's token endpoint. Tokens are cached until
//! shortly before they expire.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::Utc;
use ring::rand::SystemRandom;
use ring::signature::{RSA_PKCS1_SHA256, RsaKeyPair};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::config::GoogleSheetsConfig;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const EXPIRY_MARGIN_SECS: i64 = 60;

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

/// Source of bearer tokens for API requests
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self, http: &reqwest::Client) -> Result<String>;
}

#[cfg(test)]
pub struct StaticToken(pub String);

#[cfg(test)]
#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self, _http: &reqwest::Client) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// The fields of a service account JSON key that matter here
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid service account JSON key")
    }

    /// Environment variable first, then the key file
    pub fn load(config: &GoogleSheetsConfig) -> Result<Self> {
        if let Ok(content) = std::env::var(&config.credentials_env) {
            log::debug!("Using service account key from ${}", config.credentials_env);
            return Self::from_json(&content)
                .with_context(|| format!("Failed to parse ${}", config.credentials_env));
        }

        if let Some(ref path) = config.credentials_file {
            log::debug!("Using service account key from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read key file: {}", path.display()))?;
            return Self::from_json(&content)
                .with_context(|| format!("Failed to parse key file: {}", path.display()));
        }

        bail!(
            "No Google service account key: set ${} or storage.credentials_file",
            config.credentials_env
        )
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

struct CachedToken {
    value: String,
    expires_at: i64,
}

pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    signer: RsaKeyPair,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey) -> Result<Self> {
        let der = pem_to_der(&key.private_key)?;
        let signer = RsaKeyPair::from_pkcs8(&der)
            .map_err(|e| anyhow!("Invalid service account private key: {}", e))?;
        Ok(Self {
            key,
            signer,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Signed JWT asserting the service account identity at `now`
    fn assertion(&self, now: i64) -> Result<String> {
        let mut header = json!({ "alg": "RS256", "typ": "JWT" });
        if let Some(ref kid) = self.key.private_key_id {
            header["kid"] = json!(kid);
        }
        let claims = json!({
            "iss": self.key.client_email,
            "scope": SCOPES.join(" "),
            "aud": self.key.token_uri,
            "iat": now,
            "exp": now + TOKEN_LIFETIME_SECS,
        });

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );

        let mut signature = vec![0u8; self.signer.public().modulus_len()];
        self.signer
            .sign(
                &RSA_PKCS1_SHA256,
                &SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|_| anyhow!("Failed to sign token request"))?;

        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }

    async fn fetch_token(&self, http: &reqwest::Client, now: i64) -> Result<CachedToken> {
        let assertion = self.assertion(now)?;
        let response = http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .with_context(|| format!("Token request to {} failed", self.key.token_uri))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Token request rejected ({}): {}", status, body);
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;
        log::debug!("Obtained access token for {}", self.key.client_email);

        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS),
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountAuth {
    async fn access_token(&self, http: &reqwest::Client) -> Result<String> {
        let now = Utc::now().timestamp();
        let mut cached = self.cached.lock().await;
        if let Some(ref token) = *cached {
            if token.expires_at - EXPIRY_MARGIN_SECS > now {
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch_token(http, now).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}

/// Body of a PEM block, base64-decoded
fn pem_to_der(pem: &str) -> Result<Vec<u8>> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect();
    if body.is_empty() {
        bail!("Service account private key is empty");
    }
    STANDARD
        .decode(body)
        .context("Service account private key is not valid PEM")
}
