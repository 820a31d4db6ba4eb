use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to cluster: {0}")]
    Connect(#[source] BoxError),

    #[error("Statement failed: {0}")]
    Execute(#[source] BoxError),

    #[error("Failed to decode rows: {0}")]
    Rows(#[source] BoxError),

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error("Provider not configured")]
    NotConfigured,

    #[error("Operation cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn connect(err: impl Into<BoxError>) -> Self {
        ClientError::Connect(err.into())
    }

    pub fn execute(err: impl Into<BoxError>) -> Self {
        ClientError::Execute(err.into())
    }

    pub fn rows(err: impl Into<BoxError>) -> Self {
        ClientError::Rows(err.into())
    }
}
