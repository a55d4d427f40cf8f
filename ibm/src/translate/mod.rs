//! Conversion between API bodies and Terraform state values

pub mod composite_id;
pub mod maps;
pub mod pipeline;
pub mod trigger;

use thiserror::Error;

use crate::api::tekton::UnrecognizedTriggerType;
use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error(transparent)]
    Subtype(#[from] UnrecognizedTriggerType),

    #[error("Unexpected ID format '{id}', expected {expected}")]
    MalformedId { id: String, expected: String },

    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error("Field '{field}' must be a {expected}")]
    InvalidField { field: String, expected: String },
}

/// Error text for a failed API call, in the form
/// `{operation}WithContext failed {error}\n{response}`. Logged at debug.
pub fn with_context_failed(operation: &str, err: &ApiError) -> String {
    let message = format!(
        "{}WithContext failed {}\n{}",
        operation,
        err,
        err.response()
    );
    tracing::debug!("{}", message);
    message
}
