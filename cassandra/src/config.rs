//! Provider block configuration
//!
//! `ClusterConfig` is built once by ConfigureProvider and never changes
//! afterwards; every resource operation opens its session from it.

use rustls::RootCertStore;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tfplug::Config;
use thiserror::Error;

pub const USERNAME_ENV: &str = "CASSANDRA_USERNAME";
pub const PASSWORD_ENV: &str = "CASSANDRA_PASSWORD";

pub const DEFAULT_PORT: u16 = 9042;
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 1000;

static TLS13_ONLY: &[&rustls::SupportedProtocolVersion] = &[&rustls::version::TLS13];

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("hosts must contain at least one host")]
    MissingHosts,

    #[error("{attribute} is required (set in provider config or {env} env var)")]
    MissingCredential {
        attribute: &'static str,
        env: &'static str,
    },

    #[error("port must be a whole number between 1 and 65535, got {0}")]
    InvalidPort(f64),

    #[error("connection_timeout must be a positive number of milliseconds, got {0}")]
    InvalidTimeout(f64),

    #[error("min_tls_version must be TLS1.2 or TLS1.3, got {0}")]
    InvalidTlsVersion(String),

    #[error("root_ca could not be parsed: {0}")]
    InvalidRootCa(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsVersion {
    #[default]
    Tls12,
    Tls13,
}

impl TlsVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Tls12 => "TLS1.2",
            TlsVersion::Tls13 => "TLS1.3",
        }
    }

    fn protocol_versions(&self) -> &'static [&'static rustls::SupportedProtocolVersion] {
        match self {
            TlsVersion::Tls12 => rustls::ALL_VERSIONS,
            TlsVersion::Tls13 => TLS13_ONLY,
        }
    }
}

impl FromStr for TlsVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TLS1.2" => Ok(TlsVersion::Tls12),
            "TLS1.3" => Ok(TlsVersion::Tls13),
            other => Err(ConfigError::InvalidTlsVersion(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    /// PEM bundle; the webpki roots are trusted when absent
    pub root_ca: Option<String>,
    pub min_version: TlsVersion,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    pub hosts: Vec<String>,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub connection_timeout: Duration,
    pub tls: Option<TlsSettings>,
}

impl fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("hosts", &self.hosts)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connection_timeout", &self.connection_timeout)
            .field("tls", &self.tls)
            .finish()
    }
}

impl ClusterConfig {
    pub fn from_provider_config(config: &Config) -> Result<Self, ConfigError> {
        let hosts = config.get_string_list("hosts").unwrap_or_default();
        if hosts.is_empty() {
            return Err(ConfigError::MissingHosts);
        }

        let username = credential(config, "username", USERNAME_ENV)?;
        let password = credential(config, "password", PASSWORD_ENV)?;

        let port = match config.get_number("port") {
            Some(port) if port.fract() == 0.0 && (1.0..=65535.0).contains(&port) => port as u16,
            Some(port) => return Err(ConfigError::InvalidPort(port)),
            None => DEFAULT_PORT,
        };

        let connection_timeout = match config.get_number("connection_timeout") {
            Some(ms) if ms >= 1.0 => Duration::from_millis(ms as u64),
            Some(ms) => return Err(ConfigError::InvalidTimeout(ms)),
            None => Duration::from_millis(DEFAULT_CONNECTION_TIMEOUT_MS),
        };

        let tls = if config.get_bool("use_ssl").unwrap_or(false) {
            let min_version = match config.get_string("min_tls_version") {
                Some(version) => version.parse()?,
                None => TlsVersion::default(),
            };
            Some(TlsSettings {
                root_ca: config
                    .get_string("root_ca")
                    .filter(|pem| !pem.is_empty())
                    .map(str::to_string),
                min_version,
            })
        } else {
            None
        };

        Ok(Self {
            hosts,
            port,
            username,
            password,
            connection_timeout,
            tls,
        })
    }

    /// `host:port` for every host, IPv6 literals in brackets
    pub fn contact_points(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|host| {
                if host.contains(':') && !host.starts_with('[') {
                    format!("[{}]:{}", host, self.port)
                } else {
                    format!("{}:{}", host, self.port)
                }
            })
            .collect()
    }

    /// rustls client configuration, or None when TLS is off
    pub fn tls_client_config(&self) -> Result<Option<Arc<rustls::ClientConfig>>, ConfigError> {
        let Some(tls) = &self.tls else {
            return Ok(None);
        };

        let roots = root_store(tls.root_ca.as_deref())?;
        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());

        let config = rustls::ClientConfig::builder_with_provider(provider)
            .with_protocol_versions(tls.min_version.protocol_versions())
            .map_err(|e| ConfigError::Tls(e.to_string()))?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Some(Arc::new(config)))
    }
}

fn credential(
    config: &Config,
    attribute: &'static str,
    env: &'static str,
) -> Result<String, ConfigError> {
    config
        .get_string(attribute)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| std::env::var(env).ok().filter(|v| !v.is_empty()))
        .ok_or(ConfigError::MissingCredential { attribute, env })
}

/// Trust store from a PEM bundle, or the webpki roots when none is given
pub fn root_store(root_ca: Option<&str>) -> Result<RootCertStore, ConfigError> {
    let mut roots = RootCertStore::empty();

    match root_ca {
        Some(pem) => {
            let certs = rustls_pemfile::certs(&mut pem.as_bytes())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ConfigError::InvalidRootCa(e.to_string()))?;
            if certs.is_empty() {
                return Err(ConfigError::InvalidRootCa(
                    "no certificates found".to_string(),
                ));
            }

            let (added, ignored) = roots.add_parsable_certificates(certs);
            if added == 0 {
                return Err(ConfigError::InvalidRootCa(format!(
                    "{} certificates could not be used",
                    ignored
                )));
            }
        }
        None => roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
    }

    Ok(roots)
}
