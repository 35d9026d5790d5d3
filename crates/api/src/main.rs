use anyhow::Context;

use botica_api::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the environment and defaults still apply.
    let _ = dotenvy::dotenv();
    botica_observability::init();

    let config = Config::load().context("invalid configuration")?;
    let app = botica_api::app::build_app(&config).context("failed to wire services")?;

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        scales = config.pricing.scales.len(),
        match_threshold = config.restock.match_threshold,
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
