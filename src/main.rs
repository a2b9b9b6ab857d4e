use affiliate_recon::orchestration::{Mutator, PageLoader};
use affiliate_recon::{api, AffiliateSource, Config, EhubClient, StoreSource, UpgatesClient};
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("configuration error")?;

    let client = reqwest::Client::builder()
        .timeout(UPSTREAM_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let affiliate: Arc<dyn AffiliateSource> = Arc::new(EhubClient::with_client(
        client.clone(),
        config.ehub_api_url.clone(),
        config.ehub_advertiser_id.clone(),
        config.ehub_api_key.clone(),
    ));
    let store: Arc<dyn StoreSource> = Arc::new(UpgatesClient::with_client(
        client,
        config.upgates_api_url.clone(),
        config.upgates_username.clone(),
        config.upgates_api_key.clone(),
    ));

    let loader = PageLoader::new(
        affiliate.clone(),
        store,
        config.store_window_padding(),
    );
    let mutator = Mutator::new(affiliate, config.default_currency.clone());

    let app = api::create_router(api::AppState::new(&config, loader, mutator));

    let addr = SocketAddr::from((config.bind_addr, config.port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
