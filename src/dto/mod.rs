/// Board views and moderator command payloads.
pub mod board;
/// Buzzer claim and countdown payloads.
pub mod buzzer;
/// Health check payloads.
pub mod health;
/// Question bank import/export payloads.
pub mod questions;
/// Server-sent event payloads.
pub mod sse;
/// Validation helpers shared by request payloads.
pub mod validation;
