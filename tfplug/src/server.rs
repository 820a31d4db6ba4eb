//! Server module for running Terraform providers
//!
//! This module starts the gRPC server, optionally with TLS, and prints the
//! go-plugin handshake line Terraform reads from stdout.

use crate::error::{Result, TfplugError};
use crate::grpc::ProviderService;
use crate::provider::Provider;
use std::env;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tracing::info;

pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

const CORE_PROTOCOL_VERSION: u32 = 1;
const PLUGIN_PROTOCOL_VERSION: u32 = 6;

/// Certificate and key files in PEM format
#[derive(Debug, Clone, PartialEq)]
pub struct TlsIdentity {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Plaintext when None
    pub tls: Option<TlsIdentity>,
    /// Maximum message size in bytes
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tls: None,
            max_message_size: 256 << 20, // 256MB
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `<prefix>_CERT` and `<prefix>_KEY`; TLS is enabled only when
    /// both are set
    pub fn from_env(prefix: &str) -> Self {
        let cert = env::var(format!("{}_CERT", prefix)).ok();
        let key = env::var(format!("{}_KEY", prefix)).ok();

        let tls = match (cert, key) {
            (Some(cert), Some(key)) if !cert.is_empty() && !key.is_empty() => Some(TlsIdentity {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            _ => None,
        };

        Self {
            tls,
            ..Self::default()
        }
    }

    pub fn with_tls(mut self, cert_path: PathBuf, key_path: PathBuf) -> Self {
        self.tls = Some(TlsIdentity {
            cert_path,
            key_path,
        });
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

/// Refuse to run unless launched by Terraform
pub fn check_magic_cookie() -> Result<()> {
    match env::var(MAGIC_COOKIE_KEY) {
        Ok(value) if value == MAGIC_COOKIE_VALUE => Ok(()),
        _ => Err(TfplugError::NotLaunchedByTerraform),
    }
}

fn handshake_line(addr: std::net::SocketAddr) -> String {
    format!(
        "{}|{}|tcp|{}|grpc",
        CORE_PROTOCOL_VERSION, PLUGIN_PROTOCOL_VERSION, addr
    )
}

async fn load_identity(tls: &TlsIdentity) -> Result<Identity> {
    let cert = tokio::fs::read(&tls.cert_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read certificate: {}", e)))?;
    let key = tokio::fs::read(&tls.key_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read key: {}", e)))?;
    Ok(Identity::from_pem(cert, key))
}

/// Main entry point for running a provider
pub async fn serve<P: Provider>(provider: P, config: ServerConfig) -> Result<()> {
    check_magic_cookie()?;

    let provider_service = ProviderService::new(provider)
        .into_server()
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let mut server = Server::builder();
    if let Some(tls) = &config.tls {
        // another component may already have installed one
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let identity = load_identity(tls).await?;
        server = server.tls_config(ServerTlsConfig::new().identity(identity))?;
    }

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    println!("{}", handshake_line(addr));
    info!(%addr, tls = config.tls.is_some(), "provider server listening");

    server
        .add_service(provider_service)
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn from_env_enables_tls_only_with_both_files() {
        env::set_var("TFPLUG_TEST_CERT", "/tmp/cert.pem");
        env::remove_var("TFPLUG_TEST_KEY");
        assert_eq!(ServerConfig::from_env("TFPLUG_TEST").tls, None);

        env::set_var("TFPLUG_TEST_KEY", "/tmp/key.pem");
        let config = ServerConfig::from_env("TFPLUG_TEST");
        assert_eq!(
            config.tls,
            Some(TlsIdentity {
                cert_path: PathBuf::from("/tmp/cert.pem"),
                key_path: PathBuf::from("/tmp/key.pem"),
            })
        );

        env::remove_var("TFPLUG_TEST_CERT");
        env::remove_var("TFPLUG_TEST_KEY");
    }

    #[test]
    #[serial]
    fn magic_cookie_must_match() {
        env::remove_var(MAGIC_COOKIE_KEY);
        assert!(matches!(
            check_magic_cookie(),
            Err(TfplugError::NotLaunchedByTerraform)
        ));

        env::set_var(MAGIC_COOKIE_KEY, "wrong");
        assert!(check_magic_cookie().is_err());

        env::set_var(MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE);
        assert!(check_magic_cookie().is_ok());
        env::remove_var(MAGIC_COOKIE_KEY);
    }

    #[test]
    fn handshake_line_uses_protocol_six() {
        let addr: std::net::SocketAddr = "127.0.0.1:40123".parse().unwrap();
        assert_eq!(handshake_line(addr), "1|6|tcp|127.0.0.1:40123|grpc");
    }

    #[test]
    fn default_config_is_plaintext() {
        let config = ServerConfig::new().with_max_message_size(1024);
        assert!(config.tls.is_none());
        assert_eq!(config.max_message_size, 1024);
    }
}
