use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::board::PublicBoardView, services::board_service, state::SharedState,
    state::buzzer::BuzzerState,
};

/// Read-only projections for the projector and player screens.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/board", get(public_board))
        .route("/buzzer", get(public_buzzer))
}

/// Current public scoreboard: teams, scores and the active question with
/// its text hidden until revealed. Answers never appear here.
#[utoipa::path(
    get,
    path = "/board",
    tag = "public",
    responses((status = 200, description = "Public scoreboard projection", body = PublicBoardView))
)]
pub async fn public_board(State(state): State<SharedState>) -> Json<PublicBoardView> {
    Json(board_service::public_view(&state).await)
}

/// Last observed buzzer lock state. Live updates flow over `/sse/public`;
/// this endpoint exists for initial render and polling fallbacks.
#[utoipa::path(
    get,
    path = "/buzzer",
    tag = "public",
    responses((status = 200, description = "Current buzzer lock state", body = BuzzerState))
)]
pub async fn public_buzzer(State(state): State<SharedState>) -> Json<BuzzerState> {
    Json(state.last_buzzer_state())
}
