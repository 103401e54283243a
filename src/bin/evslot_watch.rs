//! evslot-watch: follows a gateway the way a dashboard does and logs what
//! it sees.
//!
//! Settings come from the environment (or `.env`):
//! - `GATEWAY_URL` (default `http://localhost:3000`)
//! - `WATCH_ROOM`: user id whose room to join
//! - `WATCH_GRACE_SECS`, `WATCH_POLL_SECS`

use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use evslot_gateway::domain::DocumentId;
use evslot_gateway::reconciler::{
    ActivityEntry, Dashboard, DashboardView, HttpFetcher, ReconcilerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let gateway_url =
        std::env::var("GATEWAY_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let mut config = ReconcilerConfig::new(&gateway_url);
    if let Ok(room) = std::env::var("WATCH_ROOM") {
        config.room = Some(
            room.parse::<DocumentId>()
                .with_context(|| format!("WATCH_ROOM is not a document id: {room}"))?,
        );
    }
    if let Some(secs) = env_secs("WATCH_GRACE_SECS") {
        config.grace = secs;
    }
    if let Some(secs) = env_secs("WATCH_POLL_SECS") {
        config.poll_interval = secs;
    }

    tracing::info!(gateway = %config.gateway_url, room = ?config.room, "watching");
    let dashboard = Dashboard::spawn(config, HttpFetcher::new(&gateway_url));
    let mut view = dashboard.view();
    let mut previous = view.borrow().clone();

    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = view.borrow_and_update().clone();
                report(&previous, &current);
                previous = current;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    dashboard.shutdown();
    Ok(())
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
}

fn report(previous: &DashboardView, current: &DashboardView) {
    if previous.mode != current.mode {
        tracing::info!(mode = ?current.mode, "sync mode changed");
    }
    if previous.connection != current.connection {
        tracing::info!(connection = ?current.connection, "connection state changed");
    }
    if let Some(err) = &current.refetch_error
        && previous.refetch_error.as_ref() != Some(err)
    {
        tracing::warn!(error = %err, "refetch failing");
    }
    let seen = previous.activity.first();
    let fresh: Vec<&ActivityEntry> = current
        .activity
        .iter()
        .take_while(|e| Some(*e) != seen)
        .collect();
    for entry in fresh.iter().rev() {
        tracing::info!(at = %entry.at, "{entry}");
    }
    if previous.last_refetch != current.last_refetch {
        tracing::info!(
            clients = current.clients.len(),
            stations = current.stations.len(),
            payments = current.payments.len(),
            "snapshot refreshed"
        );
    }
}
