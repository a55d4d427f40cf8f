use ibm::IbmProvider;
use std::env;
use std::path::PathBuf;
use tfplug::ServerConfig;
use tracing::Level;

/// Terraform's TF_LOG levels; JSON and unknown values fall back to INFO
fn log_level() -> Level {
    match env::var("TF_LOG").map(|v| v.to_ascii_uppercase()).as_deref() {
        Ok("TRACE") => Level::TRACE,
        Ok("DEBUG") => Level::DEBUG,
        Ok("WARN") => Level::WARN,
        Ok("ERROR") => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main]
async fn main() -> tfplug::Result<()> {
    // stdout carries the plugin handshake
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level())
        .init();

    let mut config = ServerConfig::default();
    if let Ok(cert) = env::var("TF_PROVIDER_TLS_CERT") {
        config.cert_path = PathBuf::from(cert);
    }
    if let Ok(key) = env::var("TF_PROVIDER_TLS_KEY") {
        config.key_path = PathBuf::from(key);
    }

    tfplug::serve(IbmProvider::new(), config).await
}
