use tracing::warn;

use crate::{
    dto::health::{HealthResponse, StorePing},
    state::SharedState,
};

/// Assemble the health report for the backend.
///
/// The scoreboard half keeps working without the buzzer store, so the
/// report stays at HTTP 200 either way; the `degraded` flag and the ping
/// outcome tell clients which half is limping.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let ping = match state.buzzer_store().await {
        Some(store) => match store.health_check().await {
            Ok(()) => StorePing::Reachable,
            Err(err) => {
                warn!(error = %err, "buzzer store health check failed");
                StorePing::Unreachable
            }
        },
        None => {
            warn!("buzzer store unavailable (degraded mode)");
            StorePing::NotInstalled
        }
    };

    HealthResponse::report(state.is_degraded().await, ping)
}
