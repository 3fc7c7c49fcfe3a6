use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let config = taskhub::config::Config::from_env()?;

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "taskhub",
        "taskhub starting: RUST_LOG='{}', port={}, token_ttl={}s, email={}, db_uri={:?}, dev_mode={}",
        rust_log,
        config.port,
        config.token_ttl.as_secs(),
        config.email.is_some(),
        config.db_uri,
        config.dev_mode
    );

    taskhub::server::run(config).await
}
