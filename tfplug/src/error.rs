//! Framework errors

#[derive(Debug, thiserror::Error)]
pub enum TfplugError {
    #[error("Resource type not found: {0}")]
    ResourceNotFound(String),

    #[error("Data source type not found: {0}")]
    DataSourceNotFound(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// A path step did not resolve against the value it was applied to
    #[error("Attribute path error: {0}")]
    PathError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "grpc")]
    #[error("TLS configuration error: {0}")]
    TlsError(String),

    #[cfg(feature = "grpc")]
    #[error("Transport error: {0}")]
    TransportError(#[from] tonic::transport::Error),
}

pub type Result<T> = std::result::Result<T, TfplugError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_names_both_types() {
        let err = TfplugError::TypeMismatch {
            expected: "string".to_string(),
            actual: "bool".to_string(),
        };
        assert_eq!(err.to_string(), "Type mismatch: expected string, got bool");
    }

    #[test]
    fn io_errors_convert() {
        let err: TfplugError = std::io::Error::new(std::io::ErrorKind::NotFound, "cert").into();
        assert!(matches!(err, TfplugError::IoError(_)));
    }
}
