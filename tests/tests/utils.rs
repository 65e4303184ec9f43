use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[allow(unused)]
pub const MOCK_TARGET: &str = "http://127.0.0.1:3002";

#[allow(unused)]
pub async fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    let wait = ONCE_LOCK.get().is_none();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
            std::process::exit(1);
        }));

        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("surge=debug,mock_service=info"))
            .init();

        // NOTE: Own runtime, so the service outlives the test that started it.
        std::thread::spawn(|| {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                PrometheusBuilder::new()
                    .with_http_listener("0.0.0.0:8002".parse::<SocketAddr>().unwrap())
                    .install()
                    .unwrap();

                let addr: SocketAddr = "0.0.0.0:3002".parse().unwrap();
                if let Err(err) = mock_service::run(addr).await {
                    error!("Mock service stopped: {err}");
                }
            });
        });
    });

    if wait {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}
