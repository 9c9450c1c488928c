// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `storybot serve` command implementation.
//!
//! Connects the Telegram transport, the SQLite user store and the lazily
//! connected session bridge, then feeds inbound updates to the queue engine
//! until a signal, an admin restart or a stuck task stops it.

use std::sync::Arc;
use std::time::Duration;

use storybot_config::model::StorybotConfig;
use storybot_core::{HealthStatus, PluginAdapter, SharedSession, StorySource, StorybotError};
use storybot_queue::{InboundRouter, QueueEngine, QueueSettings, install_signal_handler};
use storybot_session::BridgeClient;
use storybot_storage::SqliteUserStore;
use storybot_telegram::TelegramChannel;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Heap size above which the memory monitor starts warning.
const MEMORY_WARN_MB: usize = 512;

/// Runs the `storybot serve` command.
///
/// Returns an error when the engine stopped because a task got stuck, so the
/// process exits non-zero and its supervisor restarts it.
pub async fn run_serve(config: StorybotConfig) -> Result<(), StorybotError> {
    init_tracing(&config.bot.log_level);

    info!(environment = %config.bot.environment, "starting storybot serve");

    let settings = QueueSettings::from_config(&config);

    let users = Arc::new(SqliteUserStore::new(config.storage.clone()));
    let telegram = Arc::new(TelegramChannel::new(&config.telegram)?);
    match telegram.health_check().await {
        Ok(HealthStatus::Healthy) => info!("telegram reachable"),
        Ok(status) => warn!(?status, "telegram health check did not pass"),
        Err(e) => warn!(error = %e, "telegram health check failed"),
    }

    let session_config = config.session.clone();
    let session: Arc<SharedSession<dyn StorySource>> =
        Arc::new(SharedSession::lazy(move || {
            let session_config = session_config.clone();
            async move {
                let client = BridgeClient::connect(&session_config).await?;
                Ok(client as Arc<dyn StorySource>)
            }
        }));

    let (engine, handle) = QueueEngine::new(
        telegram.clone(),
        session.clone(),
        users.clone(),
        settings.clone(),
    );

    // Signals and the admin restart confirmation share one token.
    let cancel = install_signal_handler();
    let router = InboundRouter::new(
        handle,
        telegram.clone(),
        settings.admin_chat,
        settings.story_link_hosts.clone(),
        cancel.clone(),
    );

    telegram.connect()?;
    info!(admin_chat = %settings.admin_chat, "telegram polling started");

    {
        let cancel = cancel.clone();
        tokio::spawn(async move { memory_monitor(cancel).await });
    }

    let mut engine_task = tokio::spawn(engine.run(cancel.clone()));

    let outcome = loop {
        tokio::select! {
            joined = &mut engine_task => break flatten(joined),
            event = telegram.receive() => match event {
                Ok(event) => {
                    if let Err(e) = router.route(event).await {
                        warn!(error = %e, "failed to route inbound update");
                    }
                }
                Err(e) => {
                    error!(error = %e, "telegram receive failed, stopping");
                    cancel.cancel();
                    break flatten(engine_task.await);
                }
            },
        }
    };
    cancel.cancel();

    if let Err(e) = telegram.shutdown().await {
        warn!(error = %e, "telegram shutdown failed");
    }
    if session.is_initialized() {
        match session.get().await {
            Ok(client) => {
                if let Err(e) = client.shutdown().await {
                    warn!(error = %e, "session shutdown failed");
                }
            }
            Err(e) => debug!(error = %e, "session unavailable at shutdown"),
        }
    }
    if let Err(e) = users.shutdown().await {
        warn!(error = %e, "user store shutdown failed");
    }

    match &outcome {
        Ok(()) => info!("storybot serve shutdown complete"),
        Err(e) => error!(error = %e, "storybot serve stopped with error"),
    }
    outcome
}

fn flatten(joined: Result<Result<(), StorybotError>, JoinError>) -> Result<(), StorybotError> {
    joined
        .map_err(|e| StorybotError::Internal(format!("queue engine task failed: {e}")))
        .and_then(|result| result)
}

/// Logs jemalloc heap statistics and warns when the heap grows past
/// [`MEMORY_WARN_MB`]. Downloaded story payloads live in memory until upload.
#[cfg(not(target_env = "msvc"))]
async fn memory_monitor(cancel: CancellationToken) {
    let warn_bytes = MEMORY_WARN_MB * 1024 * 1024;
    let mut interval = tokio::time::interval(Duration::from_secs(60));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Stats are cached until the epoch advances.
                let _ = tikv_jemalloc_ctl::epoch::advance();
                let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
                let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);

                debug!(
                    allocated_mb = allocated / (1024 * 1024),
                    resident_mb = resident / (1024 * 1024),
                    "memory stats"
                );
                if allocated > warn_bytes {
                    warn!(
                        allocated_mb = allocated / (1024 * 1024),
                        threshold_mb = MEMORY_WARN_MB,
                        "memory pressure: heap above warning threshold"
                    );
                }
            }
            _ = cancel.cancelled() => {
                debug!("memory monitor shutting down");
                break;
            }
        }
    }
}

#[cfg(target_env = "msvc")]
async fn memory_monitor(cancel: CancellationToken) {
    cancel.cancelled().await;
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("storybot={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
