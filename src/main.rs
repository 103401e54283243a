//! evslot-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use evslot_gateway::api;
use evslot_gateway::app_state::AppState;
use evslot_gateway::backoff::ExponentialBackoff;
use evslot_gateway::cache::ReadCache;
use evslot_gateway::config::GatewayConfig;
use evslot_gateway::persistence;
use evslot_gateway::relay::{EventBus, EventPublisher, RedisBridge, RedisPublisher, RelayStatus};
use evslot_gateway::service::StoreService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config =
        GatewayConfig::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting evslot-gateway");

    // Relay and read cache
    let event_bus = EventBus::new(config.event_bus_capacity);
    let (publisher, cache, relay) = connect_relay(&config, &event_bus).await;

    // Datastore, degraded to a no-op when unreachable
    let audit = persistence::connect_with_retry(&config).await;

    let app_state = AppState {
        store: Arc::new(StoreService::new(publisher, audit)),
        cache,
        event_bus,
        payments: Arc::new(config.payments.clone()),
        relay,
    };
    let app = api::build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

/// Chooses the relay and cache backends. Redis failures fall back to the
/// in-process bus and memory cache.
async fn connect_relay(
    config: &GatewayConfig,
    bus: &EventBus,
) -> (EventPublisher, ReadCache, watch::Receiver<RelayStatus>) {
    let local = || {
        (
            EventPublisher::Local(bus.clone()),
            ReadCache::memory(config.cache_list_ttl, config.cache_stats_ttl),
            RelayStatus::Local.fixed(),
        )
    };
    if !config.redis_enabled {
        tracing::info!("redis disabled; using in-process relay and memory cache");
        return local();
    }

    let client = match redis::Client::open(config.redis_url.as_str()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid REDIS_URL; using in-process relay");
            return local();
        }
    };
    let publisher = match RedisPublisher::connect(&client, &config.relay_channel).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "redis unreachable; using in-process relay");
            return local();
        }
    };
    let cache = match client.get_connection_manager().await {
        Ok(conn) => ReadCache::redis(conn, config.cache_list_ttl, config.cache_stats_ttl),
        Err(e) => {
            tracing::warn!(error = %e, "redis cache unavailable; using memory cache");
            ReadCache::memory(config.cache_list_ttl, config.cache_stats_ttl)
        }
    };

    let bridge = RedisBridge::new(
        client,
        &config.relay_channel,
        bus.clone(),
        ExponentialBackoff::default(),
    );
    let relay = bridge.status();
    let _bridge = bridge.spawn();
    tracing::info!(channel = %config.relay_channel, "redis relay connected");

    (EventPublisher::Redis(publisher), cache, relay)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
