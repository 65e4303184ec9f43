use mock_service::{rps_measure_task, run, DEFAULT_ADDR};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mock_service=info,tower_http=warn")),
        )
        .init();

    let addr: SocketAddr = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MOCK_ADDR").ok())
        .unwrap_or_else(|| DEFAULT_ADDR.to_string())
        .parse()?;

    tokio::spawn(rps_measure_task());
    run(addr).await
}
