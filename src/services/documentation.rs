use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Board Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::public::public_board,
        crate::routes::public::public_buzzer,
        crate::routes::buzzer::claim_buzzer,
        crate::routes::buzzer::start_countdown,
        crate::routes::buzzer::reopen_buzzer,
        crate::routes::admin::moderator_board,
        crate::routes::admin::score_question,
        crate::routes::admin::undo_action,
        crate::routes::admin::advance_board,
        crate::routes::admin::retreat_board,
        crate::routes::admin::toggle_reveal,
        crate::routes::admin::add_team,
        crate::routes::admin::remove_last_team,
        crate::routes::admin::rename_team,
        crate::routes::admin::reset_scores,
        crate::routes::admin::reset_session,
        crate::routes::admin::export_questions,
        crate::routes::admin::import_questions,
        crate::routes::sse::public_stream,
        crate::routes::sse::moderator_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::StorePing,
            crate::dto::board::BoardView,
            crate::dto::board::PublicBoardView,
            crate::dto::board::TeamView,
            crate::dto::board::ScoreRequest,
            crate::dto::board::Verdict,
            crate::dto::board::RenameTeamRequest,
            crate::dto::board::UndoResponse,
            crate::dto::buzzer::ClaimRequest,
            crate::dto::buzzer::ClaimResponse,
            crate::dto::buzzer::CountdownRequest,
            crate::dto::questions::ImportReport,
            crate::dto::sse::Handshake,
            crate::dto::sse::SlotChangedEvent,
            crate::dto::sse::SystemStatus,
            crate::state::board::Question,
            crate::state::buzzer::BuzzerState,
            crate::state::buzzer::BuzzerPhase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Read-only scoreboard projections"),
        (name = "buzzer", description = "Shared buzzer lock operations"),
        (name = "admin", description = "Moderator board management"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
