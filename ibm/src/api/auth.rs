//! Request authentication: IAM API key exchange or a caller supplied token

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::ApiError;

pub const DEFAULT_IAM_ENDPOINT: &str = "https://iam.cloud.ibm.com";
const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Tokens are refreshed this long before IAM says they expire
const REFRESH_MARGIN_SECONDS: i64 = 60;

#[derive(Clone)]
pub enum Authenticator {
    Iam(Arc<IamAuthenticator>),
    Bearer(String),
    NoAuth,
}

impl Authenticator {
    pub fn iam(api_key: &str, iam_endpoint: &str, http: reqwest::Client) -> Self {
        Authenticator::Iam(Arc::new(IamAuthenticator::new(api_key, iam_endpoint, http)))
    }

    /// Accepts tokens with or without the `Bearer ` prefix
    pub fn bearer(token: &str) -> Self {
        let token = token.strip_prefix("Bearer ").unwrap_or(token);
        Authenticator::Bearer(token.to_string())
    }

    /// Value for the Authorization header, None for unauthenticated clients
    pub async fn authorization(&self) -> Result<Option<String>, ApiError> {
        match self {
            Authenticator::Iam(iam) => iam.token().await.map(|t| Some(format!("Bearer {}", t))),
            Authenticator::Bearer(token) => Ok(Some(format!("Bearer {}", token))),
            Authenticator::NoAuth => Ok(None),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IamTokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_in: i64,
    pub expiration: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECONDS) < self.expires_at
    }
}

/// Exchanges an API key for IAM access tokens and caches them until expiry
pub struct IamAuthenticator {
    api_key: String,
    token_url: String,
    http: reqwest::Client,
    cache: RwLock<Option<CachedToken>>,
}

impl IamAuthenticator {
    pub fn new(api_key: &str, iam_endpoint: &str, http: reqwest::Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            token_url: format!("{}/identity/token", iam_endpoint.trim_end_matches('/')),
            http,
            cache: RwLock::new(None),
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub async fn token(&self) -> Result<String, ApiError> {
        let now = Utc::now();
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.is_fresh(now) {
                return Ok(cached.access_token.clone());
            }
        }

        let mut cache = self.cache.write().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh(now) {
                return Ok(cached.access_token.clone());
            }
        }

        let response = self.request_token().await?;
        let expires_at = Utc
            .timestamp_opt(response.expiration, 0)
            .single()
            .unwrap_or_else(|| now + Duration::seconds(response.expires_in));
        *cache = Some(CachedToken {
            access_token: response.access_token.clone(),
            expires_at,
        });

        Ok(response.access_token)
    }

    async fn request_token(&self) -> Result<IamTokenResponse, ApiError> {
        tracing::debug!(url = %self.token_url, "requesting IAM access token");

        let response = self
            .http
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", APIKEY_GRANT_TYPE),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!(%status, "IAM token request rejected");
            return Err(ApiError::AuthError(format!(
                "IAM token request failed with status {}: {}",
                status, text
            )));
        }

        serde_json::from_str(&text)
            .map_err(|e| ApiError::ParseError(format!("Failed to parse IAM token response: {}", e)))
    }
}
