use axum::{Json, Router, extract::State, routing::post};
use axum_valid::Valid;

use crate::{
    dto::buzzer::{ClaimRequest, ClaimResponse, CountdownRequest},
    error::AppError,
    services::buzzer_service,
    state::{SharedState, buzzer::BuzzerState},
};

/// Buzzer lock endpoints. Claiming is open to players; the countdown and
/// forced reopen live under `/admin` and are guarded by that tree's token
/// middleware.
pub fn router() -> Router<SharedState> {
    Router::new().route("/buzzer/claim", post(claim_buzzer))
}

/// Attempt to claim the open buzzer lock. Losing the race is a normal
/// outcome (`won == false`), not an error.
#[utoipa::path(
    post,
    path = "/buzzer/claim",
    tag = "buzzer",
    request_body = ClaimRequest,
    responses(
        (status = 200, description = "Claim outcome with the observed lock state", body = ClaimResponse),
        (status = 503, description = "Buzzer store unavailable (degraded mode)")
    )
)]
pub async fn claim_buzzer(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ClaimRequest>>,
) -> Result<Json<ClaimResponse>, AppError> {
    let outcome = buzzer_service::claim(&state, payload.name.trim()).await?;
    Ok(Json(outcome))
}

/// Start a timed re-open of the buzzer lock.
#[utoipa::path(
    post,
    path = "/admin/buzzer/countdown",
    tag = "buzzer",
    params(("X-Moderator-Token" = String, Header, description = "Moderator token issued by the /sse/moderator stream")),
    request_body = CountdownRequest,
    responses(
        (status = 200, description = "Countdown committed", body = BuzzerState),
        (status = 503, description = "Buzzer store unavailable (degraded mode)")
    )
)]
pub async fn start_countdown(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CountdownRequest>>,
) -> Result<Json<BuzzerState>, AppError> {
    let committed = buzzer_service::start_countdown(&state, payload.seconds).await?;
    Ok(Json(committed))
}

/// Force the buzzer lock open immediately, discarding any winner or
/// running countdown.
#[utoipa::path(
    post,
    path = "/admin/buzzer/open",
    tag = "buzzer",
    params(("X-Moderator-Token" = String, Header, description = "Moderator token issued by the /sse/moderator stream")),
    responses(
        (status = 200, description = "Lock reopened", body = BuzzerState),
        (status = 503, description = "Buzzer store unavailable (degraded mode)")
    )
)]
pub async fn reopen_buzzer(
    State(state): State<SharedState>,
) -> Result<Json<BuzzerState>, AppError> {
    let reopened = buzzer_service::reopen(&state).await?;
    Ok(Json(reopened))
}
