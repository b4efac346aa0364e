use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use sh_actor::{ActorClient, HttpActorClient, MockActorClient};
use sh_domain::clock::SystemClock;
use sh_domain::config::Config;
use sh_providers::LazyProviderRegistry;
use sh_sessions::SessionStore;
use sh_store::{Cache, DocumentStore, MemoryDocumentStore};
use sh_tools::{ToolContext, catalog};

mod api;
mod runtime;
mod state;

use runtime::cancel::CancelMap;
use runtime::session_lock::SessionLockMap;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config_path = std::env::var("SH_CONFIG_PATH").unwrap_or_else(|_| "config.toml".into());
    let config = Arc::new(Config::load_or_default(&config_path));

    tracing::info!("signalhouse starting");

    let clock = Arc::new(SystemClock);

    // ── Document store + cache ───────────────────────────────────────
    // The real document store (spec §1: "out of scope, specified only
    // by the collection interface it exposes") is a live database behind
    // `SH_STORE_URI`; no such adapter ships here, so the in-process
    // stand-in always backs `DocumentStore` regardless of that var.
    if std::env::var("SH_STORE_URI").is_err() {
        tracing::info!("SH_STORE_URI not set; using in-memory document store");
    }
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    create_ttl_indexes(&store, &config).await;
    let cache = Arc::new(Cache::new(store.clone(), clock.clone()));

    // ── Upstream actor client ────────────────────────────────────────
    let actor: Arc<dyn ActorClient> = match (std::env::var("SH_ACTOR_BASE_URL"), std::env::var("SH_ACTOR_TOKEN_ENV")) {
        (Ok(base_url), Ok(token_env)) => {
            tracing::info!(base_url = %base_url, "actor client: HTTP");
            Arc::new(HttpActorClient::new(base_url, &token_env).context("initializing actor client")?)
        }
        _ => {
            tracing::warn!(
                "SH_ACTOR_BASE_URL / SH_ACTOR_TOKEN_ENV not set — using a mock actor client \
                 that returns \"no mock response registered\" for every call"
            );
            Arc::new(MockActorClient::new())
        }
    };

    // ── Tool registry ────────────────────────────────────────────────
    let mut dispatcher = sh_tools::Dispatcher::new();
    catalog::register_all(&mut dispatcher, store.clone(), clock.clone());
    let dispatcher = Arc::new(dispatcher);
    let tool_defs = Arc::new(catalog::tool_definitions());
    tracing::info!(tools = tool_defs.len(), "tool catalog registered");

    // ── LLM providers (lazy: missing key is fatal on first use, not now) ──
    let providers = Arc::new(LazyProviderRegistry::new(config.llm.clone()));
    if config.llm.providers.is_empty() {
        tracing::warn!("no LLM providers configured — every chat turn will fail until [llm] is set");
    }

    // ── Sessions ─────────────────────────────────────────────────────
    let sessions = Arc::new(SessionStore::new(clock.clone(), config.sessions.clone()));
    sh_sessions::spawn_idle_sweep(sessions.clone(), config.sessions.sweep_interval_secs);
    tracing::info!(
        max_sessions = config.sessions.max_sessions,
        idle_timeout_secs = config.sessions.idle_timeout_secs,
        "session store ready"
    );

    let session_locks = Arc::new(SessionLockMap::new());
    let cancel_map = Arc::new(CancelMap::new());

    // ── Background scheduler (C10) ───────────────────────────────────
    let scheduler_ctx = ToolContext {
        cache: cache.clone(),
        actor: actor.clone(),
        store: store.clone(),
        clock: clock.clone(),
    };
    let _scheduler = sh_scheduler::spawn(store.clone(), dispatcher.clone(), scheduler_ctx, clock.clone(), &config.scheduler);
    tracing::info!(
        monitor_interval_secs = config.scheduler.monitor_interval_secs,
        prefetch_interval_secs = config.scheduler.prefetch_interval_secs,
        "scheduler jobs spawned"
    );

    let state = AppState {
        config: config.clone(),
        clock,
        sessions,
        session_locks,
        cancel_map,
        store,
        cache,
        actor,
        dispatcher,
        tool_defs,
        providers,
    };

    // ── Router ───────────────────────────────────────────────────────
    let cors_layer = build_cors_layer(&config.server.cors);
    let app = api::router(state.clone()).layer(cors_layer).with_state(state);

    // ── Bind ─────────────────────────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    tracing::info!(addr = %addr, "signalhouse listening");

    axum::serve(listener, app).await.context("axum server error")?;

    Ok(())
}

/// Initialize structured JSON tracing.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sh_gateway=debug")))
        .json()
        .init();
}

/// Declare a TTL index per cache kind (spec §4.C3/§6) so the backing
/// store can physically reap stale documents; freshness on read is
/// still enforced separately by `Cache::read`.
async fn create_ttl_indexes(store: &Arc<dyn DocumentStore>, config: &Config) {
    use sh_domain::cache::CacheKind;
    let kinds = [
        CacheKind::Profile,
        CacheKind::Post,
        CacheKind::Reel,
        CacheKind::HashtagPost,
        CacheKind::HashtagMeta,
        CacheKind::SnapshotHistory,
    ];
    for kind in kinds {
        let ttl = std::time::Duration::from_secs(config.cache.ttl_secs(kind));
        if let Err(err) = store.create_ttl_index(kind.collection(), "cached_at", ttl).await {
            tracing::warn!(%err, collection = kind.collection(), "failed to create TTL index");
        }
    }
}

/// Build a [`CorsLayer`] from the configured allowed origins. A literal
/// `"*"` allows all origins (not recommended for production).
fn build_cors_layer(cors: &sh_domain::config::CorsConfig) -> CorsLayer {
    use axum::http::header;

    if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
