/// Scoreboard mutations and projections.
pub mod board_service;
/// Buzzer lock orchestration and the reconciliation watchdog.
pub mod buzzer_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Question bank import/export.
pub mod question_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Buzzer store connection supervisor.
pub mod storage_supervisor;
