use std::sync::Arc;

use hk_gateway::catalog::Catalog;
use hk_gateway::config::Config;
use hk_gateway::eta::{AreaFilter, EtaService};
use hk_gateway::kmb::{KmbCache, KmbClient, KmbClientConfig};
use hk_gateway::llm::LlmClient;
use hk_gateway::notify::TelegramNotifier;
use hk_gateway::refresh::{RefreshService, RefreshSettings, SystemClock};
use hk_gateway::store::KvStore;
use hk_gateway::weather::{HkoClient, WeatherService};
use hk_gateway::web::{AppState, create_router};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env().expect("Failed to load configuration");
    info!(
        bind = %config.bind_addr,
        home_stops = ?config.kmb.home_stop_names,
        work_stops = ?config.kmb.work_stop_names,
        "Loaded configuration"
    );

    let store = Arc::new(match &config.kmb.cache_path {
        Some(path) => KvStore::open(path),
        None => KvStore::in_memory(),
    });
    let cache = KmbCache::new(store);

    let home = config.kmb.home_matcher();
    let work = config.kmb.work_matcher();
    if home.is_empty() || work.is_empty() {
        warn!(
            home_empty = home.is_empty(),
            work_empty = work.is_empty(),
            "An area has no stop names configured; its endpoints will stay empty"
        );
    }

    let kmb_config = KmbClientConfig::new()
        .with_base_url(&config.kmb.base_url)
        .with_timeout(config.http_timeout.as_secs());
    let kmb = Arc::new(KmbClient::new(kmb_config).expect("Failed to create KMB client"));

    let refresher = Arc::new(RefreshService::new(
        kmb.clone(),
        cache.clone(),
        Arc::new(SystemClock),
        RefreshSettings {
            interval: config.kmb.refresh_interval,
            home,
            work,
        },
    ));
    let refresh_handle = refresher.start();

    let home_filter =
        AreaFilter::dedup_secondary(&config.kmb.home_primary_stop, &config.kmb.home_secondary_stop);
    if home_filter == AreaFilter::None {
        warn!("Home secondary-stop filter disabled: primary or secondary stop name is blank");
    }
    let eta = EtaService::new(kmb, cache, home_filter);

    if config.llm.api_key.is_none() {
        warn!("OPENROUTER_API_KEY not set. Radar analysis will fail.");
    }
    let llm = LlmClient::new(
        &config.llm.base_url,
        config.llm.api_key.clone(),
        &config.llm.model,
        config.http_timeout,
    )
    .expect("Failed to create LLM client");
    let notifier = config.telegram.as_ref().map(|telegram| {
        TelegramNotifier::new(telegram, config.http_timeout)
            .expect("Failed to create Telegram client")
    });
    if notifier.is_none() {
        info!("Telegram forwarding disabled");
    }
    let hko =
        HkoClient::new(&config.weather, config.http_timeout).expect("Failed to create HKO client");
    let weather = WeatherService::new(
        hko,
        config.weather.cache_ttl,
        llm,
        notifier,
        config.llm.inline_image,
    );

    let state = AppState::new(eta, weather, Catalog::new(&config.catalog_dir));
    let app = create_router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listener");
    info!(addr = %config.bind_addr, "HK gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    refresh_handle.stop();
    info!("Shut down");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
