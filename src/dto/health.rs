use serde::Serialize;
use utoipa::ToSchema;

/// Overall backend health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Storage answers and requests are served.
    Ok,
    /// Running without a usable store; mutating requests are refused.
    Degraded,
}

/// Body of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Whether a store is installed and answered the last probe.
    pub storage_reachable: bool,
}

impl HealthResponse {
    /// Combine the probe result with the degraded flag.
    pub fn new(storage_reachable: bool, degraded: bool) -> Self {
        let status = if storage_reachable && !degraded {
            HealthStatus::Ok
        } else {
            HealthStatus::Degraded
        };
        Self {
            status,
            storage_reachable,
        }
    }
}
