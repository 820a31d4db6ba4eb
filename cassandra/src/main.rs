use cassandra::CassandraProvider;
use tfplug::ServerConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the plugin handshake
    let filter = std::env::var("TF_LOG_PROVIDER")
        .ok()
        .and_then(|level| EnvFilter::try_new(level.to_lowercase()).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let provider = CassandraProvider::new();
    let config = ServerConfig::from_env("TF_PROVIDER_CASSANDRA");

    tfplug::serve(provider, config).await?;

    Ok(())
}
