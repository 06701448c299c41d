use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/public",
    tag = "sse",
    responses((status = 200, description = "Public SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream realtime public events to connected frontends.
pub async fn public_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    info!("New public SSE connection");
    sse_service::connect_public(&state).await
}

#[utoipa::path(
    get,
    path = "/sse/moderator",
    tag = "sse",
    responses(
        (status = 200, description = "Moderator SSE stream", content_type = "text/event-stream", body = String),
        (status = 401, description = "Another moderator stream is already active")
    )
)]
/// Stream moderator-only events, issuing the coordination token.
pub async fn moderator_stream(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let stream = sse_service::connect_moderator(&state).await?;
    info!("New moderator SSE connection");
    Ok(stream)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/public", get(public_stream))
        .route("/sse/moderator", get(moderator_stream))
}
