//! Shared buzzer lock state and its pure phase transitions.
//!
//! The lock lives in a single remote document per room; this module only
//! computes transitions. Committing them atomically is the job of the
//! [`BuzzerStore`](crate::dao::buzzer_store::BuzzerStore) backends, and the
//! orchestration lives in
//! [`buzzer_service`](crate::services::buzzer_service).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Phase of the buzzer lock. Cycles `Open -> Locked -> Countdown -> Open`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BuzzerPhase {
    /// Any client may attempt to claim the lock.
    #[default]
    Open,
    /// Exactly one client holds the lock; claims are rejected.
    Locked,
    /// Timed re-open in progress; claims are rejected until the deadline.
    Countdown,
}

/// The remotely shared lock document. An absent document is equivalent to
/// the default (`open`, no winner, no deadline).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuzzerState {
    /// Current lock phase.
    pub phase: BuzzerPhase,
    /// Name of the claimant while `Locked`.
    pub winner: Option<String>,
    /// Millisecond deadline of the running countdown, while `Countdown`.
    pub unlock_at: Option<i64>,
}

impl BuzzerState {
    /// The open state every cycle returns to.
    pub fn open() -> Self {
        Self::default()
    }

    /// The state committed by a winning claim.
    pub fn locked(winner: impl Into<String>) -> Self {
        Self {
            phase: BuzzerPhase::Locked,
            winner: Some(winner.into()),
            unlock_at: None,
        }
    }

    /// The state written when the moderator starts a timed re-open.
    pub fn countdown(unlock_at: i64) -> Self {
        Self {
            phase: BuzzerPhase::Countdown,
            winner: None,
            unlock_at: Some(unlock_at),
        }
    }
}

/// Next state for a claim attempt, or `None` when the lock is not open and
/// the claim must be rejected without touching the document.
pub fn claim_transition(current: &BuzzerState, name: &str) -> Option<BuzzerState> {
    match current.phase {
        BuzzerPhase::Open => Some(BuzzerState::locked(name)),
        BuzzerPhase::Locked | BuzzerPhase::Countdown => None,
    }
}

/// Watchdog transition: re-open the lock once a countdown deadline has
/// passed. `None` means nothing to do, which keeps concurrent reconcilers
/// idempotent (after the first one commits, the phase guard fails for the
/// rest).
pub fn reconcile_transition(current: &BuzzerState, now_ms: i64) -> Option<BuzzerState> {
    if current.phase != BuzzerPhase::Countdown {
        return None;
    }
    let unlock_at = current.unlock_at?;
    if now_ms >= unlock_at {
        Some(BuzzerState::open())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_only_succeeds_while_open() {
        let next = claim_transition(&BuzzerState::open(), "Team A").unwrap();
        assert_eq!(next.phase, BuzzerPhase::Locked);
        assert_eq!(next.winner.as_deref(), Some("Team A"));
        assert_eq!(next.unlock_at, None);

        assert!(claim_transition(&BuzzerState::locked("Team A"), "Team B").is_none());
        assert!(claim_transition(&BuzzerState::countdown(99), "Team B").is_none());
    }

    #[test]
    fn reconcile_is_a_noop_before_the_deadline() {
        let state = BuzzerState::countdown(1_000);
        assert_eq!(reconcile_transition(&state, 999), None);
        assert_eq!(
            reconcile_transition(&state, 1_000),
            Some(BuzzerState::open())
        );
        assert_eq!(
            reconcile_transition(&state, 5_000),
            Some(BuzzerState::open())
        );
    }

    #[test]
    fn reconcile_ignores_other_phases_and_missing_deadlines() {
        assert_eq!(reconcile_transition(&BuzzerState::open(), 1_000), None);
        assert_eq!(
            reconcile_transition(&BuzzerState::locked("Team A"), 1_000),
            None
        );

        let stuck = BuzzerState {
            phase: BuzzerPhase::Countdown,
            winner: None,
            unlock_at: None,
        };
        assert_eq!(reconcile_transition(&stuck, 1_000), None);
    }

    #[test]
    fn wire_format_matches_the_shared_document() {
        let json = serde_json::to_value(BuzzerState::countdown(1234)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"phase": "countdown", "winner": null, "unlockAt": 1234})
        );

        let absent: BuzzerState = serde_json::from_value(serde_json::json!({
            "phase": "open", "winner": null, "unlockAt": null
        }))
        .unwrap();
        assert_eq!(absent, BuzzerState::open());
    }
}
