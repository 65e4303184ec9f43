use axum::{debug_handler, http::StatusCode, routing::get, Json, Router};
use metrics::counter;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tower_http::trace::TraceLayer;
#[allow(unused)]
use tracing::{debug, error, info, warn};

pub const DEFAULT_ADDR: &str = "0.0.0.0:4221";

const IO_DELAY: Duration = Duration::from_millis(500);
const PRIME_LIMIT: u64 = 100_000;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub message: &'static str,
}

impl Reply {
    const SUCCESS: Reply = Reply {
        status: 200,
        message: "success",
    };

    const NOT_FOUND: Reply = Reply {
        status: 404,
        message: "not found",
    };
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(simple))
        .route("/io", get(io))
        .route("/compute", get(compute))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Mock service listening on {}", listener.local_addr()?);
    axum::serve(listener, app()).await?;
    Ok(())
}

#[debug_handler]
async fn simple() -> Json<Reply> {
    hit("simple");
    debug!("Simple request");
    Json(Reply::SUCCESS)
}

#[debug_handler]
async fn io() -> Json<Reply> {
    hit("io");
    tokio::time::sleep(IO_DELAY).await;
    debug!("I/O task complete");
    Json(Reply::SUCCESS)
}

#[debug_handler]
async fn compute() -> Result<Json<Reply>, StatusCode> {
    hit("compute");
    let primes = tokio::task::spawn_blocking(|| count_primes(PRIME_LIMIT))
        .await
        .map_err(|err| {
            error!("Compute task failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    debug!("Compute task result: {primes}");
    Ok(Json(Reply::SUCCESS))
}

async fn not_found() -> (StatusCode, Json<Reply>) {
    RPS_MEASURE.fetch_add(1, Ordering::Relaxed);
    (StatusCode::NOT_FOUND, Json(Reply::NOT_FOUND))
}

fn hit(route: &'static str) {
    counter!("mock-service.requests", "route" => route).increment(1);
    RPS_MEASURE.fetch_add(1, Ordering::Relaxed);
}

/// Number of primes strictly below `limit`, by trial division.
pub fn count_primes(limit: u64) -> usize {
    (2..limit).filter(|n| is_prime(*n)).count()
}

fn is_prime(n: u64) -> bool {
    if n < 4 {
        return n >= 2;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/** RPS Printer **/

static RPS_MEASURE: AtomicU64 = AtomicU64::new(0);

pub async fn rps_measure_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let requests = RPS_MEASURE.swap(0, Ordering::Relaxed);
        if requests > 0 {
            info!("{requests} RPS");
        }
    }
}
