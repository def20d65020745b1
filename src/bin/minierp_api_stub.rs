use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let port = std::env::var("MINIERP_API_STUB_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(5000);
    info!(target: "minierp", "API stub starting on port {} (seed users use '<role>123' passwords)", port);

    minierp_console::stub_api::serve(port).await
}
