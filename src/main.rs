use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use minierp_console::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let config = Config::from_env();
    info!(
        target: "minierp",
        "Console shell starting: RUST_LOG='{}', http_port={}, api_url='{}', idle_timeout={}s",
        rust_log,
        config.http_port,
        config.api_url,
        config.idle_timeout.as_secs()
    );

    minierp_console::server::run(config).await
}
