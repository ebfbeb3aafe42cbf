use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the installed store and combine the result with the degraded flag.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let reachable = match state.store().await {
        Some(store) => match store.health_check().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                false
            }
        },
        None => {
            warn!("no store installed (degraded mode)");
            false
        }
    };

    HealthResponse::new(reachable, state.is_degraded())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        auth::StaticAdminList,
        dao::store::MemoryStore,
        dto::health::HealthStatus,
        state::AppState,
    };

    #[tokio::test]
    async fn missing_store_is_degraded() {
        let state = AppState::new(Arc::new(StaticAdminList::default()), Duration::from_secs(1));

        let health = health_status(&state).await;

        assert_eq!(health.status, HealthStatus::Degraded);
        assert!(!health.storage_reachable);
    }

    #[tokio::test]
    async fn healthy_store_is_ok() {
        let state = AppState::with_store(
            Arc::new(StaticAdminList::default()),
            Duration::from_secs(1),
            Arc::new(MemoryStore::in_memory()),
        );

        let health = health_status(&state).await;

        assert_eq!(health.status, HealthStatus::Ok);
        assert!(health.storage_reachable);
    }
}
