use serde::Serialize;
use utoipa::ToSchema;

/// Outcome of pinging the buzzer lock store during a health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StorePing {
    /// The store answered the ping.
    Reachable,
    /// A store is installed but the ping failed.
    Unreachable,
    /// No store is installed (degraded mode, or still reconnecting).
    NotInstalled,
}

/// Health report returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status ("ok" or "degraded").
    pub status: String,
    /// Whether buzzer operations are currently refused.
    pub degraded: bool,
    /// Result of the buzzer store ping taken for this report.
    pub buzzer_store: StorePing,
}

impl HealthResponse {
    /// Build a report from the degraded flag and the store ping outcome.
    pub fn report(degraded: bool, buzzer_store: StorePing) -> Self {
        let status = if degraded { "degraded" } else { "ok" };
        Self {
            status: status.to_string(),
            degraded,
            buzzer_store,
        }
    }
}
