use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tfplug::Context;

use super::auth::Authenticator;
use super::common::{ApiErrorDetails, ApiErrorResponse, ApiQueryParams};
use super::error::ApiError;
use super::pool::{ConnectionPoolConfig, ConnectionPoolManager, ConnectionStats};

const MERGE_PATCH_JSON: &str = "application/merge-patch+json";

/// IBM Cloud REST client bound to one service URL
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth: Authenticator,
    retry_config: RetryConfig,
    pool_manager: ConnectionPoolManager,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 30_000,
            timeout_seconds: 60,
        }
    }
}

impl RetryConfig {
    /// Retry policy from the provider's `max_retries` and
    /// `max_retry_interval` (seconds) settings
    pub fn from_settings(max_retries: u32, max_retry_interval_seconds: u64) -> Self {
        Self {
            max_retries,
            max_backoff_ms: max_retry_interval_seconds.saturating_mul(1000),
            ..Self::default()
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
        Duration::from_millis(exp.min(self.max_backoff_ms))
    }
}

enum Attempt<T> {
    Done(Result<T, ApiError>),
    Retry(ApiError),
}

impl Client {
    /// Create a new API client with default retry configuration
    pub fn new(base_url: &str, auth: Authenticator) -> Result<Self, ApiError> {
        Self::with_config(base_url, auth, RetryConfig::default())
    }

    pub fn with_config(
        base_url: &str,
        auth: Authenticator,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        url::Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let pool_config = ConnectionPoolConfig {
            request_timeout: Duration::from_secs(retry_config.timeout_seconds),
            ..Default::default()
        };
        let pool_manager = ConnectionPoolManager::new(pool_config);
        let http_client = pool_manager.build_client()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: base_url.trim_end_matches('/').to_string(),
                auth,
                retry_config,
                pool_manager,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub async fn get_connection_stats(&self) -> ConnectionStats {
        self.inner.pool_manager.get_stats().await
    }

    /// Tekton pipeline operations
    pub fn tekton(&self) -> crate::api::tekton::TektonApi<'_> {
        crate::api::tekton::TektonApi::new(self)
    }

    /// Enterprise usage report operations
    pub fn usage_reports(&self) -> crate::api::usage_reports::UsageReportsApi<'_> {
        crate::api::usage_reports::UsageReportsApi::new(self)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    pub async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        ctx: &Context,
        path: &str,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        self.execute(ctx, path, || {
            tracing::debug!("GET request to: {}", url);
            self.inner.http_client.get(&url)
        })
        .await
    }

    pub async fn get_with_params<T: for<'de> Deserialize<'de>>(
        &self,
        ctx: &Context,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(ctx, &full_path).await
    }

    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        ctx: &Context,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        self.execute(ctx, path, || {
            tracing::debug!("POST request to: {}", url);
            self.inner.http_client.post(&url).json(body)
        })
        .await
    }

    pub async fn put<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        ctx: &Context,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        self.execute(ctx, path, || {
            tracing::debug!("PUT request to: {}", url);
            self.inner.http_client.put(&url).json(body)
        })
        .await
    }

    /// JSON merge patch: only the fields present in `body` change
    pub async fn patch<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        ctx: &Context,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let payload = serde_json::to_vec(body)
            .map_err(|e| ApiError::ParseError(format!("Failed to encode request: {}", e)))?;
        self.execute(ctx, path, || {
            tracing::debug!("PATCH request to: {}", url);
            self.inner
                .http_client
                .patch(&url)
                .header(CONTENT_TYPE, MERGE_PATCH_JSON)
                .body(payload.clone())
        })
        .await
    }

    pub async fn delete(&self, ctx: &Context, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        self.execute::<serde_json::Value, _>(ctx, path, || {
            tracing::debug!("DELETE request to: {}", url);
            self.inner.http_client.delete(&url)
        })
        .await
        .map(|_| ())
    }

    /// Runs the request with retries, failing early when `ctx` is cancelled
    /// or its deadline passes
    async fn execute<T, F>(&self, ctx: &Context, path: &str, build: F) -> Result<T, ApiError>
    where
        F: Fn() -> RequestBuilder,
        T: for<'de> Deserialize<'de>,
    {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                tracing::debug!("request to {} abandoned: context done", path);
                if ctx.is_deadline_exceeded() {
                    Err(ApiError::DeadlineExceeded)
                } else {
                    Err(ApiError::Cancelled)
                }
            }
            result = self.execute_with_retry(path, build) => result,
        }
    }

    async fn execute_with_retry<T, F>(&self, path: &str, build: F) -> Result<T, ApiError>
    where
        F: Fn() -> RequestBuilder,
        T: for<'de> Deserialize<'de>,
    {
        let retry = &self.inner.retry_config;
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= retry.max_retries {
            if attempt > 0 {
                let backoff = retry.backoff(attempt);
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff.as_millis(),
                    attempt
                );
                self.inner.pool_manager.record_retry().await;
                tokio::time::sleep(backoff).await;
            }

            match self.attempt(build()).await? {
                Attempt::Done(result) => return result,
                Attempt::Retry(error) => last_error = Some(error),
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    async fn attempt<T: for<'de> Deserialize<'de>>(
        &self,
        request: RequestBuilder,
    ) -> Result<Attempt<T>, ApiError> {
        let mut request = request.header(ACCEPT, "application/json");
        if let Some(authorization) = self.inner.auth.authorization().await? {
            request = request.header(AUTHORIZATION, authorization);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.inner.pool_manager.record_request(false).await;
                return Ok(if e.is_timeout() {
                    Attempt::Retry(ApiError::Timeout(self.inner.retry_config.timeout_seconds))
                } else if e.is_connect() {
                    Attempt::Retry(ApiError::ServiceUnavailable)
                } else {
                    Attempt::Done(Err(ApiError::RequestError(e)))
                });
            }
        };

        let status = response.status();
        self.inner
            .pool_manager
            .record_request(status.is_success())
            .await;

        if status.is_success() {
            return Ok(Attempt::Done(self.parse_success_response(response).await));
        }

        let error = self.error_from_response(response).await;
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Ok(Attempt::Retry(error))
        } else {
            Ok(Attempt::Done(Err(error)))
        }
    }

    async fn parse_success_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        // 204 and friends carry no body
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };

        serde_json::from_str::<T>(text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(e.to_string())
        })
    }

    async fn error_from_response(&self, response: reqwest::Response) -> ApiError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let parsed = serde_json::from_str::<ApiErrorResponse>(&body).ok();
        let message = parsed
            .as_ref()
            .and_then(ApiErrorResponse::first_message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
        let details = parsed.map(|p| {
            Box::new(ApiErrorDetails {
                trace: p.trace,
                errors: p.errors,
            })
        });

        ApiError::ApiError {
            status: status.as_u16(),
            message,
            body,
            details,
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
