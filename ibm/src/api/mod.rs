//! IBM Cloud REST clients: Tekton pipelines, enterprise usage reports, IAM

pub mod auth;
pub mod client;
pub mod common;
pub mod error;
pub mod pool;
pub mod tekton;
pub mod usage_reports;

#[cfg(test)]
pub mod test_helpers;

pub use auth::Authenticator;
pub use client::{Client, RetryConfig};
pub use common::{ApiErrorDetails, ApiQueryParams, Link};
pub use error::ApiError;
