//! Common types and utilities for IBM Cloud APIs

use serde::{Deserialize, Serialize};

/// Error body returned by IBM Cloud platform services
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub errors: Vec<ApiErrorItem>,
    pub trace: Option<String>,
    pub status_code: Option<u16>,
    // Some services answer with a flat {"error": "..."} body instead
    pub error: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorItem {
    pub code: Option<String>,
    pub message: Option<String>,
    pub more_info: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("API error details: trace={trace:?}, errors={errors:?}")]
pub struct ApiErrorDetails {
    pub trace: Option<String>,
    pub errors: Vec<ApiErrorItem>,
}

impl ApiErrorResponse {
    /// First human readable message in the body
    pub fn first_message(&self) -> Option<String> {
        self.errors
            .iter()
            .find_map(|e| e.message.clone())
            .or_else(|| self.message.clone())
            .or_else(|| self.error.clone())
    }
}

/// A hypermedia link as returned in paginated collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub href: String,
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// Percent-encodes one path segment
pub fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
