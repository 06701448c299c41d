use serde::Serialize;
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing::warn;

use crate::{
    dto::sse::{ServerEvent, SlotChangedEvent, SystemStatus},
    state::{SharedState, buzzer::BuzzerState},
};

const EVENT_SLOT_CHANGED: &str = "slot_changed";
const EVENT_BUZZER: &str = "buzzer";
const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Tell every surface that a persistence slot was rewritten. The payload
/// carries only the slot name; clients reload and re-derive their view.
pub fn broadcast_slot_changed(state: &SharedState, slot: &str) {
    let payload = SlotChangedEvent {
        slot: slot.to_string(),
    };
    send_public_event(state, EVENT_SLOT_CHANGED, &payload);
    send_moderator_event(state, EVENT_SLOT_CHANGED, &payload);
}

/// Push a freshly observed buzzer state to every surface.
pub fn broadcast_buzzer(state: &SharedState, buzzer: &BuzzerState) {
    send_public_event(state, EVENT_BUZZER, buzzer);
    send_moderator_event(state, EVENT_BUZZER, buzzer);
}

/// Announce a degraded-mode transition.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    send_public_event(state, EVENT_SYSTEM_STATUS, &payload);
    send_moderator_event(state, EVENT_SYSTEM_STATUS, &payload);
}

/// Bridge the internal channels onto the SSE hubs: slot-change broadcasts
/// from the board store, the buzzer watch, and the degraded flag.
pub fn spawn_forwarder(state: SharedState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut slots = state.board().subscribe();
        let mut buzzer = state.observe_buzzer();
        let mut degraded = state.degraded_watcher();

        loop {
            tokio::select! {
                changed = slots.recv() => match changed {
                    Ok(change) => broadcast_slot_changed(&state, change.slot),
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(_)) => continue,
                },
                result = buzzer.changed() => {
                    if result.is_err() {
                        break;
                    }
                    let snapshot = buzzer.borrow_and_update().clone();
                    broadcast_buzzer(&state, &snapshot);
                }
                result = degraded.changed() => {
                    if result.is_err() {
                        break;
                    }
                    let flag = *degraded.borrow_and_update();
                    broadcast_system_status(&state, flag);
                }
            }
        }
    })
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}

fn send_moderator_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.moderator_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize moderator SSE payload"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::slots::MemorySlotStore,
        state::{AppState, board::ScoreboardDocument},
    };

    #[tokio::test]
    async fn board_saves_surface_as_slot_changed_events() {
        let state = AppState::new(AppConfig::default(), Arc::new(MemorySlotStore::default()));
        let mut public = state.public_sse().subscribe();
        let forwarder = spawn_forwarder(state.clone());
        // let the forwarder task register its subscriptions
        tokio::task::yield_now().await;

        state.board().save_board(&ScoreboardDocument::default()).unwrap();

        let event = public.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("slot_changed"));
        assert!(event.data.contains("scoreboard_state_v2"));

        forwarder.abort();
    }

    #[tokio::test]
    async fn buzzer_updates_surface_on_both_hubs() {
        let state = AppState::new(AppConfig::default(), Arc::new(MemorySlotStore::default()));
        let mut public = state.public_sse().subscribe();
        let mut moderator = state.moderator_sse().subscribe();
        let forwarder = spawn_forwarder(state.clone());
        tokio::task::yield_now().await;

        state.publish_buzzer(BuzzerState::locked("Team A"));

        let event = public.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("buzzer"));
        assert!(event.data.contains("Team A"));
        assert!(moderator.recv().await.unwrap().data.contains("Team A"));

        forwarder.abort();
    }
}
