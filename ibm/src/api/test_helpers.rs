//! Test helpers for the IBM Cloud API clients

use super::{Authenticator, Client, RetryConfig};

/// Client with a static token and near-instant retries
pub fn create_test_client(url: &str) -> Client {
    Client::with_config(
        url,
        Authenticator::bearer("test-token"),
        RetryConfig {
            max_retries: 1,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
        },
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 30_000);
        assert_eq!(config.timeout_seconds, 60);
    }

    #[test]
    fn api_error_formatting() {
        let details = ApiErrorDetails {
            trace: Some("trace-1".to_string()),
            errors: vec![],
        };
        let error = ApiError::ApiError {
            status: 400,
            message: "Bad Request".to_string(),
            body: r#"{"trace":"trace-1"}"#.to_string(),
            details: Some(Box::new(details)),
        };

        assert_eq!(error.to_string(), "Bad Request");
        assert_eq!(error.status(), Some(400));
        assert!(!error.is_not_found());
        assert_eq!(
            error.response(),
            "Response status code: 400\nResponse body: {\"trace\":\"trace-1\"}"
        );
        assert_eq!(ApiError::Cancelled.response(), "<nil>");
    }
}
