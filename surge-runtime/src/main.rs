use surge_runtime::{init_tracing, SurgeRuntime};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    SurgeRuntime::new().with_args().with_env()?.run().await?;

    Ok(())
}
