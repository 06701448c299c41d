use axum::Router;

use crate::state::SharedState;

pub mod admin;
pub mod buzzer;
pub mod docs;
pub mod health;
pub mod public;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(public::router())
        .merge(buzzer::router())
        .merge(sse::router())
        .merge(admin::router(state.clone()))
        .merge(docs::router())
        .with_state(state)
}
