use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{
    dao::{storage::StorageError, store::BuzzerStore},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECOVERY_ATTEMPTS: u32 = 3;

/// Open the store and keep the shared state in degraded mode while it is unhealthy.
///
/// A failing health check flips degraded mode on and is retried with back-off; once
/// the retries are exhausted the store is dropped and reopened through `connect`.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn BuzzerStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.set_store(store.clone()).await;
                info!("storage ready; leaving degraded mode");
                delay = INITIAL_DELAY;

                loop {
                    match store.health_check().await {
                        Ok(()) => {
                            if state.update_degraded(false) {
                                info!("storage healthy again; leaving degraded mode");
                            }
                            sleep(HEALTH_POLL_INTERVAL).await;
                        }
                        Err(err) => {
                            warn!(error = %err, "storage health check failed; entering degraded mode");
                            state.update_degraded(true);
                            if recover(store.as_ref()).await {
                                state.update_degraded(false);
                                info!("storage recovered after health check failure");
                                sleep(HEALTH_POLL_INTERVAL).await;
                                continue;
                            }
                            warn!("exhausted storage recovery attempts; reopening the store");
                            state.clear_store().await;
                            break;
                        }
                    }
                }

                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) if !err.is_transient() => {
                error!(error = %err, "store cannot be opened until its data is repaired");
                sleep(MAX_DELAY).await;
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

async fn recover(store: &dyn BuzzerStore) -> bool {
    let mut delay = INITIAL_DELAY;
    for attempt in 1..=MAX_RECOVERY_ATTEMPTS {
        sleep(delay).await;
        match store.health_check().await {
            Ok(()) => return true,
            Err(err) => {
                warn!(attempt, error = %err, "storage recovery attempt failed");
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
    false
}
