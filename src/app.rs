//! Startup sequence and top-level wiring.
//!
//! 1. Connect to Redis (fatal on failure)
//! 2. Build the GitHub client
//! 3. Ensure the consumer group (failure is logged, not fatal)
//! 4. Optionally reclaim stale pending entries
//! 5. Optionally start the health server
//! 6. Run the dispatch loop until it fails or `shutdown` is cancelled

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::github::{OctocrabClient, Publisher};
use crate::server::{self, AppState};
use crate::stream::{ConsumerGroupManager, EventLog, LogError, RedisLog};
use crate::types::ConsumerGroup;

/// Errors that end the process.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Connection(LogError),

    #[error("cannot build GitHub client: {0}")]
    GitHub(#[source] octocrab::Error),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Runs the bridge with `config` until a fatal error or shutdown.
pub async fn run(config: Config, shutdown: CancellationToken) -> Result<(), AppError> {
    info!(
        repo = %config.repo,
        branch = ?config.branch,
        directory = %config.directory,
        "Starting dashboard bridge"
    );

    let log = RedisLog::connect(&config.redis_addr)
        .await
        .map_err(AppError::Connection)?;
    let publisher = OctocrabClient::from_token(config.token.clone(), config.api_url.as_deref())
        .map_err(AppError::GitHub)?;

    run_with(log, publisher, &config, shutdown).await
}

/// Runs the bridge over an already-connected log and publisher.
pub async fn run_with<L, P>(
    mut log: L,
    publisher: P,
    config: &Config,
    shutdown: CancellationToken,
) -> Result<(), AppError>
where
    L: EventLog + Send,
    P: Publisher + Send,
{
    let manager = ConsumerGroupManager::new(ConsumerGroup::dashboards());
    info!(consumer = %manager.consumer(), "Consumer identity for this run");

    manager.ensure_group(&mut log).await;

    let backlog = match config.reclaim_idle {
        Some(min_idle) => {
            let reclaimed = manager.reclaim_stale(&mut log, min_idle).await;
            if let Some(e) = &reclaimed.error {
                warn!(error = %e, "Continuing with the entries reclaimed so far");
            }
            reclaimed.entries
        }
        None => Vec::new(),
    };

    let dispatcher = Dispatcher::new(
        log,
        publisher,
        &manager,
        config.publish_settings(),
        config.dispatch_table(),
    )
    .with_backlog(backlog);

    if let Some(addr) = config.health_addr {
        let state = AppState::new(dispatcher.stats());
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = server::serve(addr, state, shutdown).await {
                error!(addr = %addr, error = %e, "Health server failed");
            }
        });
    }

    dispatcher.run(shutdown).await?;
    info!("Dashboard bridge stopped");
    Ok(())
}
