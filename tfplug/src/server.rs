//! Server module for running Terraform providers
//!
//! This module provides functionality to start a Terraform provider server
//! with TLS support and the go-plugin handshake on stdout.

use crate::error::{Result, TfplugError};
use crate::grpc::GrpcProviderServer;
use crate::proto::ProviderServer;
use crate::provider::Provider;
use std::path::PathBuf;
use tonic::transport::{Identity, Server, ServerTlsConfig};

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to TLS certificate file
    pub cert_path: PathBuf,
    /// Path to TLS key file
    pub key_path: PathBuf,
    /// Maximum message size in bytes
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("./certs/localhost.pem"),
            key_path: PathBuf::from("./certs/localhost-key.pem"),
            max_message_size: 256 << 20, // 256MB
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cert_path(mut self, path: PathBuf) -> Self {
        self.cert_path = path;
        self
    }

    pub fn with_key_path(mut self, path: PathBuf) -> Self {
        self.key_path = path;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

/// Main entry point for running a provider
///
/// Binds an ephemeral localhost port, prints the handshake line Terraform
/// waits for and serves until the process is terminated.
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    // Err only means a crypto provider is already installed
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let provider_service = ProviderServer::new(GrpcProviderServer::new(provider))
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let cert = tokio::fs::read(&config.cert_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read certificate: {}", e)))?;
    let key = tokio::fs::read(&config.key_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read key: {}", e)))?;

    let tls_config = ServerTlsConfig::new().identity(Identity::from_pem(cert, key));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tracing::info!(%addr, "provider server listening");
    println!("1|6|tcp|{}|grpc", addr);

    let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
    Server::builder()
        .tls_config(tls_config)?
        .add_service(provider_service)
        .serve_with_incoming(incoming)
        .await?;

    Ok(())
}
