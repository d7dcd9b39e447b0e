//! Service account authentication for Google APIs
//!
//! Signs an RS256 JWT assertion with the service account key and exchanges
//! it for an OAuth2 access token, cached until shortly before expiry.

use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

use crate::error::{Error, Result};

const SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_LIFETIME_SECS: u64 = 3600;

#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Access token source for a service account
pub struct GcpAuth {
    key: ServiceAccountKey,
    project_id: String,
    http: reqwest::Client,
    token: RwLock<Option<CachedToken>>,
}

impl GcpAuth {
    /// Load the service account JSON key file
    pub fn from_service_account(key_path: impl AsRef<Path>, project_id: String) -> Result<Self> {
        let key_path = key_path.as_ref();
        let content = std::fs::read_to_string(key_path).map_err(|e| {
            Error::Config(format!(
                "Failed to read service account key {}: {}",
                key_path.display(),
                e
            ))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid service account key format: {}", e)))?;

        Ok(Self {
            key,
            project_id,
            http: reqwest::Client::new(),
            token: RwLock::new(None),
        })
    }

    /// GCP project ID
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Service account email
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// A valid access token, refreshed when less than a minute remains
    pub async fn token(&self) -> Result<String> {
        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.expires_at > Instant::now() + Duration::from_secs(60) {
                return Ok(cached.access_token.clone());
            }
        }

        let mut slot = self.token.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(cached) = slot.as_ref() {
            if cached.expires_at > Instant::now() + Duration::from_secs(60) {
                return Ok(cached.access_token.clone());
            }
        }

        let fresh = self.exchange().await?;
        let access_token = fresh.access_token.clone();
        *slot = Some(fresh);
        Ok(access_token)
    }

    /// Authorization headers for a request
    pub async fn headers(&self) -> Result<HeaderMap> {
        let token = self.token().await?;
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| Error::Config("Access token is not a valid header value".to_string()))?,
        );
        Ok(headers)
    }

    fn token_uri(&self) -> &str {
        self.key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }

    fn assertion(&self) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::internal(format!("System clock before epoch: {}", e)))?
            .as_secs();

        let claims = serde_json::json!({
            "iss": self.key.client_email,
            "scope": SCOPE,
            "aud": self.token_uri(),
            "iat": now,
            "exp": now + TOKEN_LIFETIME_SECS,
        });

        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let signing_input = format!(
            "{}.{}",
            engine.encode(br#"{"alg":"RS256","typ":"JWT"}"#),
            engine.encode(claims.to_string().as_bytes())
        );

        let pem_text = self.key.private_key.replace("\\n", "\n");
        let parsed = pem::parse(&pem_text)
            .map_err(|e| Error::Config(format!("Failed to parse private key PEM: {}", e)))?;
        let key_pair = ring::signature::RsaKeyPair::from_pkcs8(parsed.contents())
            .map_err(|e| Error::Config(format!("Failed to parse private key: {}", e)))?;

        let mut signature = vec![0u8; key_pair.public().modulus_len()];
        key_pair
            .sign(
                &ring::signature::RSA_PKCS1_SHA256,
                &ring::rand::SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|e| Error::Config(format!("Failed to sign JWT: {}", e)))?;

        Ok(format!("{}.{}", signing_input, engine.encode(&signature)))
    }

    async fn exchange(&self) -> Result<CachedToken> {
        let assertion = self.assertion()?;
        let response = self
            .http
            .post(self.token_uri())
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Config(format!("Token exchange request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Config(format!(
                "Token exchange failed ({}): {}",
                status, body
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Config(format!("Failed to parse token response: {}", e)))?;

        tracing::debug!("Refreshed access token for {}", self.key.client_email);
        Ok(CachedToken {
            access_token: parsed.access_token,
            expires_at: Instant::now()
                + Duration::from_secs(parsed.expires_in.unwrap_or(TOKEN_LIFETIME_SECS)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_key_file() {
        let err = GcpAuth::from_service_account("/nonexistent/key.json", "p".to_string())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_key_file_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"client_email": "svc@p.iam.gserviceaccount.com", "private_key": "x"}}"#
        )
        .unwrap();

        let auth = GcpAuth::from_service_account(file.path(), "p".to_string()).unwrap();
        assert_eq!(auth.project_id(), "p");
        assert_eq!(auth.client_email(), "svc@p.iam.gserviceaccount.com");
        assert_eq!(auth.token_uri(), DEFAULT_TOKEN_URI);
        // Not a PEM key
        assert!(matches!(auth.assertion(), Err(Error::Config(_))));
    }
}
