//! Payloads carried on the SSE streams.

use serde::Serialize;
use utoipa::ToSchema;

/// Dispatched payload carried across SSE channels.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    /// Optional SSE event name.
    pub event: Option<String>,
    /// Serialized data field.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

/// Initial metadata sent to an SSE client when it connects.
#[derive(Debug, Serialize, ToSchema)]
pub struct Handshake {
    /// Identifier of the SSE stream (`public` or `moderator`).
    pub stream: String,
    /// Whether the backend is running without a buzzer store connection.
    pub degraded: bool,
    /// Optional coordination token returned when the stream is privileged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Broadcast whenever a local persistence slot is saved. The payload is only
/// the slot name; subscribers reload from the store and re-derive their view.
#[derive(Debug, Serialize, ToSchema)]
pub struct SlotChangedEvent {
    /// Name of the slot that changed.
    pub slot: String,
}

/// Broadcast when the backend enters or leaves degraded mode.
#[derive(Debug, Serialize, ToSchema)]
pub struct SystemStatus {
    /// True while no buzzer store is installed.
    pub degraded: bool,
}
