use anyhow::Context;
use demo_server::ServerConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing::subscriber::set_global_default(demo_server::logging::json_subscriber(filter, std::io::stdout))
        .context("installing log subscriber")?;

    let config = ServerConfig::from_env().context("reading demo server configuration")?;
    demo_server::run(config).await.context("demo server failed")?;
    Ok(())
}
