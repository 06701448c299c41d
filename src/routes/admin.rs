use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::{
        board::{BoardView, RenameTeamRequest, ScoreRequest, UndoResponse},
        questions::ImportReport,
    },
    error::AppError,
    routes::buzzer::{reopen_buzzer, start_countdown},
    services::{board_service, question_service},
    state::{SharedState, board::Question},
};

const MODERATOR_TOKEN_HEADER: &str = "x-moderator-token";

/// Moderator-only endpoints driving the board and the buzzer lock.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/board", get(moderator_board))
        .route("/admin/board/advance", post(advance_board))
        .route("/admin/board/retreat", post(retreat_board))
        .route("/admin/board/reveal", post(toggle_reveal))
        .route("/admin/score", post(score_question))
        .route("/admin/undo", post(undo_action))
        .route("/admin/teams", post(add_team))
        .route("/admin/teams/last", delete(remove_last_team))
        .route("/admin/teams/{index}/name", put(rename_team))
        .route("/admin/scores/reset", post(reset_scores))
        .route("/admin/reset", post(reset_session))
        .route(
            "/admin/questions",
            get(export_questions).put(import_questions),
        )
        .route("/admin/buzzer/countdown", post(start_countdown))
        .route("/admin/buzzer/open", post(reopen_buzzer))
        .route_layer(middleware::from_fn_with_state(
            state,
            require_moderator_token,
        ))
}

/// Full board projection including the active question's answer and the
/// undo depth.
#[utoipa::path(
    get,
    path = "/admin/board",
    tag = "admin",
    params(("X-Moderator-Token" = String, Header, description = "Moderator token issued by the /sse/moderator stream")),
    responses((status = 200, description = "Moderator board projection", body = BoardView))
)]
pub async fn moderator_board(State(state): State<SharedState>) -> Json<BoardView> {
    Json(board_service::moderator_view(&state).await)
}

/// Apply a verdict for the active question.
#[utoipa::path(
    post,
    path = "/admin/score",
    tag = "admin",
    params(("X-Moderator-Token" = String, Header, description = "Moderator token issued by the /sse/moderator stream")),
    request_body = ScoreRequest,
    responses(
        (status = 200, description = "Updated board", body = BoardView),
        (status = 404, description = "Team index out of range")
    )
)]
pub async fn score_question(
    State(state): State<SharedState>,
    Json(payload): Json<ScoreRequest>,
) -> Result<Json<BoardView>, AppError> {
    Ok(Json(board_service::score(&state, payload).await?))
}

/// Undo the most recent recorded action.
#[utoipa::path(
    post,
    path = "/admin/undo",
    tag = "admin",
    params(("X-Moderator-Token" = String, Header, description = "Moderator token issued by the /sse/moderator stream")),
    responses((status = 200, description = "Undo outcome and updated board", body = UndoResponse))
)]
pub async fn undo_action(State(state): State<SharedState>) -> Result<Json<UndoResponse>, AppError> {
    Ok(Json(board_service::undo(&state).await?))
}

/// Step the presentation forward (reveal, then next question).
#[utoipa::path(
    post,
    path = "/admin/board/advance",
    tag = "admin",
    params(("X-Moderator-Token" = String, Header, description = "Moderator token issued by the /sse/moderator stream")),
    responses((status = 200, description = "Updated board", body = BoardView))
)]
pub async fn advance_board(State(state): State<SharedState>) -> Result<Json<BoardView>, AppError> {
    Ok(Json(board_service::advance(&state).await?))
}

/// Step the presentation backward (hide, then previous question).
#[utoipa::path(
    post,
    path = "/admin/board/retreat",
    tag = "admin",
    params(("X-Moderator-Token" = String, Header, description = "Moderator token issued by the /sse/moderator stream")),
    responses((status = 200, description = "Updated board", body = BoardView))
)]
pub async fn retreat_board(State(state): State<SharedState>) -> Result<Json<BoardView>, AppError> {
    Ok(Json(board_service::retreat(&state).await?))
}

/// Flip the reveal stage of the active question without moving the index.
#[utoipa::path(
    post,
    path = "/admin/board/reveal",
    tag = "admin",
    params(("X-Moderator-Token" = String, Header, description = "Moderator token issued by the /sse/moderator stream")),
    responses((status = 200, description = "Updated board", body = BoardView))
)]
pub async fn toggle_reveal(State(state): State<SharedState>) -> Result<Json<BoardView>, AppError> {
    Ok(Json(board_service::toggle_reveal(&state).await?))
}

/// Append a new auto-named team.
#[utoipa::path(
    post,
    path = "/admin/teams",
    tag = "admin",
    params(("X-Moderator-Token" = String, Header, description = "Moderator token issued by the /sse/moderator stream")),
    responses((status = 200, description = "Updated board", body = BoardView))
)]
pub async fn add_team(State(state): State<SharedState>) -> Result<Json<BoardView>, AppError> {
    Ok(Json(board_service::add_team(&state).await?))
}

/// Remove the last team in the roster.
#[utoipa::path(
    delete,
    path = "/admin/teams/last",
    tag = "admin",
    params(("X-Moderator-Token" = String, Header, description = "Moderator token issued by the /sse/moderator stream")),
    responses(
        (status = 200, description = "Updated board", body = BoardView),
        (status = 409, description = "Only one team left")
    )
)]
pub async fn remove_last_team(
    State(state): State<SharedState>,
) -> Result<Json<BoardView>, AppError> {
    Ok(Json(board_service::remove_last_team(&state).await?))
}

/// Rename the team at the given position.
#[utoipa::path(
    put,
    path = "/admin/teams/{index}/name",
    tag = "admin",
    params(
        ("X-Moderator-Token" = String, Header, description = "Moderator token issued by the /sse/moderator stream"),
        ("index" = usize, Path, description = "Positional index of the team")
    ),
    request_body = RenameTeamRequest,
    responses(
        (status = 200, description = "Updated board", body = BoardView),
        (status = 404, description = "Team index out of range")
    )
)]
pub async fn rename_team(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
    Valid(Json(payload)): Valid<Json<RenameTeamRequest>>,
) -> Result<Json<BoardView>, AppError> {
    Ok(Json(
        board_service::rename_team(&state, index, &payload.name).await?,
    ))
}

/// Zero every score, keeping teams and the undo trail.
#[utoipa::path(
    post,
    path = "/admin/scores/reset",
    tag = "admin",
    params(("X-Moderator-Token" = String, Header, description = "Moderator token issued by the /sse/moderator stream")),
    responses((status = 200, description = "Updated board", body = BoardView))
)]
pub async fn reset_scores(State(state): State<SharedState>) -> Result<Json<BoardView>, AppError> {
    Ok(Json(board_service::reset_scores(&state).await?))
}

/// Replace the whole session with the default document.
#[utoipa::path(
    post,
    path = "/admin/reset",
    tag = "admin",
    params(("X-Moderator-Token" = String, Header, description = "Moderator token issued by the /sse/moderator stream")),
    responses((status = 200, description = "Fresh board", body = BoardView))
)]
pub async fn reset_session(State(state): State<SharedState>) -> Result<Json<BoardView>, AppError> {
    Ok(Json(board_service::reset_session(&state).await?))
}

/// Export the current question bank as pretty-printed JSON, suitable for
/// saving to a file and re-importing later.
#[utoipa::path(
    get,
    path = "/admin/questions",
    tag = "admin",
    params(("X-Moderator-Token" = String, Header, description = "Moderator token issued by the /sse/moderator stream")),
    responses((status = 200, description = "Question bank in presentation order", body = [Question]))
)]
pub async fn export_questions(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    let bank = question_service::export(&state).await;
    let body = serde_json::to_string_pretty(&bank)
        .map_err(|err| AppError::Internal(format!("encoding question bank: {err}")))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

/// Replace the whole question bank with the submitted array.
#[utoipa::path(
    put,
    path = "/admin/questions",
    tag = "admin",
    params(("X-Moderator-Token" = String, Header, description = "Moderator token issued by the /sse/moderator stream")),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Import acknowledgement", body = ImportReport),
        (status = 400, description = "Payload is not an array of questions")
    )
)]
pub async fn import_questions(
    State(state): State<SharedState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<ImportReport>, AppError> {
    Ok(Json(question_service::import(&state, payload).await?))
}

async fn require_moderator_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(MODERATOR_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing moderator token header `X-Moderator-Token`".into())
        })?;

    let expected = {
        let guard = state.moderator_token().lock().await;
        guard.clone()
    };

    match expected {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid moderator token".into())),
        None => Err(AppError::Unauthorized(
            "moderator SSE stream not initialised yet".into(),
        )),
    }
}
