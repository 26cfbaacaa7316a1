use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tubedeck::config::Config;
use tubedeck::service::usage::UsageCounter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.listen_addr,
        public_url = %cfg.public_url,
        database_url = %cfg.database_url,
        token_file = %cfg.token_file.display(),
        proxy = %cfg.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %cfg.loglevel,
    );

    let storage = tubedeck::db::connect(&cfg.database_url).await?;
    let usage = UsageCounter::new(storage);
    if let Err(e) = usage.purge_before_today().await {
        warn!(error = %e, "failed to prune old usage events");
    }

    let addr = cfg.listen_addr.clone();
    let state = tubedeck::router::DeckState::new(cfg, usage)?;
    let app = tubedeck::router::deck_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
