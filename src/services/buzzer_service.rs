//! Buzzer lock orchestration on top of the conditional-write store.
//!
//! A claim is a single fetch + compare-and-swap; a lost race is reported as
//! a rejection, never retried, so at most one claim wins per open window.
//! The watchdog task re-reads the document on a fixed tick and commits the
//! countdown re-open once its deadline passes, which also heals windows
//! where the moderator process died mid-countdown.

use std::{sync::Arc, time::Duration};

use time::OffsetDateTime;
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{info, warn};

use crate::{
    dao::buzzer_store::{BuzzerStore, CasOutcome},
    dto::buzzer::ClaimResponse,
    error::ServiceError,
    state::{
        SharedState,
        buzzer::{BuzzerState, claim_transition, reconcile_transition},
    },
};

/// Attempts a moderator countdown write makes before giving up. Each retry
/// re-reads the document, so contention only delays the commit.
const COUNTDOWN_CAS_ATTEMPTS: usize = 8;

/// Milliseconds since the Unix epoch, the unit the shared document uses for
/// countdown deadlines.
pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

async fn require_store(state: &SharedState) -> Result<Arc<dyn BuzzerStore>, ServiceError> {
    state.buzzer_store().await.ok_or(ServiceError::Degraded)
}

/// Attempt to claim the open lock for `name`.
///
/// The claim commits only if the document is still at the fetched revision
/// and still open; any other outcome is a rejection carrying the state
/// observed at rejection time.
pub async fn claim(state: &SharedState, name: &str) -> Result<ClaimResponse, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "claim name must not be blank".into(),
        ));
    }

    let store = require_store(state).await?;
    let snapshot = store.fetch().await?;

    let Some(next) = claim_transition(&snapshot.state, name) else {
        state.publish_buzzer(snapshot.state.clone());
        return Ok(ClaimResponse {
            won: false,
            state: snapshot.state,
        });
    };

    match store.compare_and_swap(snapshot.revision, next.clone()).await? {
        CasOutcome::Committed => {
            info!(winner = name, "buzzer claim committed");
            state.publish_buzzer(next.clone());
            Ok(ClaimResponse {
                won: true,
                state: next,
            })
        }
        CasOutcome::Conflict => {
            let observed = store.fetch().await?;
            state.publish_buzzer(observed.state.clone());
            Ok(ClaimResponse {
                won: false,
                state: observed.state,
            })
        }
    }
}

/// Start a timed re-open, replacing whatever state the document is in.
///
/// The write is unconditional in intent but still goes through the CAS
/// primitive: on a conflict the document is re-read and the write retried
/// with the fresh revision, bounded by [`COUNTDOWN_CAS_ATTEMPTS`].
pub async fn start_countdown(
    state: &SharedState,
    seconds: Option<u64>,
) -> Result<BuzzerState, ServiceError> {
    let store = require_store(state).await?;
    let seconds = seconds.unwrap_or(state.config().countdown_seconds);

    for _ in 0..COUNTDOWN_CAS_ATTEMPTS {
        let snapshot = store.fetch().await?;
        let next = BuzzerState::countdown(now_ms() + (seconds as i64) * 1_000);
        match store.compare_and_swap(snapshot.revision, next.clone()).await? {
            CasOutcome::Committed => {
                info!(seconds, "buzzer countdown started");
                state.publish_buzzer(next.clone());
                return Ok(next);
            }
            CasOutcome::Conflict => continue,
        }
    }

    Err(ServiceError::InvalidState(
        "countdown write kept losing to concurrent updates".into(),
    ))
}

/// Force the lock back to the open state immediately, bypassing any winner
/// or running countdown. Same bounded retry scheme as the countdown.
pub async fn reopen(state: &SharedState) -> Result<BuzzerState, ServiceError> {
    let store = require_store(state).await?;

    for _ in 0..COUNTDOWN_CAS_ATTEMPTS {
        let snapshot = store.fetch().await?;
        let next = BuzzerState::open();
        match store.compare_and_swap(snapshot.revision, next.clone()).await? {
            CasOutcome::Committed => {
                info!("buzzer reopened");
                state.publish_buzzer(next.clone());
                return Ok(next);
            }
            CasOutcome::Conflict => continue,
        }
    }

    Err(ServiceError::InvalidState(
        "reopen write kept losing to concurrent updates".into(),
    ))
}

/// One watchdog pass: refresh the local view of the document and commit the
/// countdown re-open when its deadline has passed. A CAS conflict means
/// another reconciler or writer got there first; the next tick observes the
/// result.
pub async fn reconcile(state: &SharedState) -> Result<(), ServiceError> {
    let store = require_store(state).await?;
    let snapshot = store.fetch().await?;

    match reconcile_transition(&snapshot.state, now_ms()) {
        Some(next) => {
            if store.compare_and_swap(snapshot.revision, next.clone()).await?
                == CasOutcome::Committed
            {
                info!("buzzer countdown elapsed; reopened");
                state.publish_buzzer(next);
            }
        }
        None => state.publish_buzzer(snapshot.state),
    }

    Ok(())
}

/// Handle to the running watchdog task.
pub struct WatchdogHandle {
    task: JoinHandle<()>,
}

impl WatchdogHandle {
    /// Cancel the watchdog. In-flight reconciles are abandoned; the shared
    /// document stays consistent because every write is conditional.
    pub fn stop(self) {
        self.task.abort();
    }
}

/// Spawn the reconciliation watchdog polling the store every `tick`.
pub fn spawn_watchdog(state: SharedState, tick: Duration) -> WatchdogHandle {
    let task = tokio::spawn(async move {
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match reconcile(&state).await {
                Ok(()) => {}
                // degraded mode: the supervisor is reconnecting, stay quiet
                Err(ServiceError::Degraded) => {}
                Err(err) => warn!(error = %err, "buzzer reconcile tick failed"),
            }
        }
    });
    WatchdogHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            buzzer_store::memory::MemoryBuzzerStore,
            slots::MemorySlotStore,
        },
        state::{AppState, buzzer::BuzzerPhase},
    };

    async fn connected_state() -> (SharedState, Arc<MemoryBuzzerStore>) {
        let state = AppState::new(AppConfig::default(), Arc::new(MemorySlotStore::default()));
        let store = Arc::new(MemoryBuzzerStore::new());
        state.install_buzzer_store(store.clone()).await;
        (state, store)
    }

    #[tokio::test]
    async fn at_most_one_racing_claim_wins() {
        let (state, _store) = connected_state().await;

        let mut handles = Vec::new();
        for index in 0..16 {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                claim(&state, &format!("Team {index}")).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().won {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(state.last_buzzer_state().phase, BuzzerPhase::Locked);
    }

    #[tokio::test]
    async fn rejected_claim_reports_the_holder() {
        let (state, _store) = connected_state().await;

        let first = claim(&state, "Team A").await.unwrap();
        assert!(first.won);

        let second = claim(&state, "Team B").await.unwrap();
        assert!(!second.won);
        assert_eq!(second.state.winner.as_deref(), Some("Team A"));
    }

    #[tokio::test]
    async fn blank_claim_names_are_rejected() {
        let (state, store) = connected_state().await;

        for name in ["", "   ", "\t\n"] {
            assert!(matches!(
                claim(&state, name).await,
                Err(ServiceError::InvalidInput(_))
            ));
        }

        let snapshot = store.fetch().await.unwrap();
        assert!(snapshot.state.winner.is_none());
    }

    #[tokio::test]
    async fn claims_are_rejected_during_a_countdown() {
        let (state, _store) = connected_state().await;

        start_countdown(&state, Some(60)).await.unwrap();
        let attempt = claim(&state, "Team A").await.unwrap();
        assert!(!attempt.won);
        assert_eq!(attempt.state.phase, BuzzerPhase::Countdown);
    }

    #[tokio::test]
    async fn reconcile_reopens_once_the_deadline_passes() {
        let (state, store) = connected_state().await;

        // plant a countdown whose deadline is already in the past
        let snapshot = store.fetch().await.unwrap();
        store
            .compare_and_swap(snapshot.revision, BuzzerState::countdown(now_ms() - 1))
            .await
            .unwrap();

        reconcile(&state).await.unwrap();
        assert_eq!(state.last_buzzer_state(), BuzzerState::open());

        // a second pass is a no-op
        reconcile(&state).await.unwrap();
        assert_eq!(state.last_buzzer_state(), BuzzerState::open());

        let next = claim(&state, "Team A").await.unwrap();
        assert!(next.won);
    }

    #[tokio::test]
    async fn reconcile_leaves_running_countdowns_alone() {
        let (state, _store) = connected_state().await;

        let planted = start_countdown(&state, Some(3600)).await.unwrap();
        reconcile(&state).await.unwrap();
        assert_eq!(state.last_buzzer_state(), planted);
    }

    #[tokio::test]
    async fn operations_fail_fast_in_degraded_mode() {
        let state = AppState::new(AppConfig::default(), Arc::new(MemorySlotStore::default()));

        assert!(matches!(
            claim(&state, "Team A").await,
            Err(ServiceError::Degraded)
        ));
        assert!(matches!(
            start_countdown(&state, None).await,
            Err(ServiceError::Degraded)
        ));
        assert!(matches!(reconcile(&state).await, Err(ServiceError::Degraded)));
    }

    #[tokio::test]
    async fn scenario_first_buzz_wins_then_scoring_and_undo() {
        use crate::{
            dto::board::{ScoreRequest, Verdict},
            services::board_service,
        };

        let (state, _store) = connected_state().await;

        let first = claim(&state, "Team A").await.unwrap();
        assert!(first.won);
        assert_eq!(first.state.phase, BuzzerPhase::Locked);
        assert_eq!(first.state.winner.as_deref(), Some("Team A"));

        let second = claim(&state, "Team B").await.unwrap();
        assert!(!second.won);
        assert_eq!(second.state, first.state);

        let view = board_service::score(
            &state,
            ScoreRequest {
                team_index: 0,
                verdict: Verdict::Correct,
            },
        )
        .await
        .unwrap();
        let scores: Vec<i64> = view.teams.iter().map(|team| team.score).collect();
        assert_eq!(scores, vec![4, 0, 0, 0]);

        let undone = board_service::undo(&state).await.unwrap();
        assert!(undone.undone);
        assert!(undone.board.teams.iter().all(|team| team.score == 0));
    }

    #[tokio::test]
    async fn full_round_claim_countdown_reopen_claim() {
        let (state, store) = connected_state().await;

        assert!(claim(&state, "Team A").await.unwrap().won);
        assert!(!claim(&state, "Team B").await.unwrap().won);

        let countdown = start_countdown(&state, Some(1)).await.unwrap();
        assert_eq!(countdown.phase, BuzzerPhase::Countdown);
        assert!(countdown.unlock_at.unwrap() > now_ms());

        // simulate the deadline passing instead of sleeping
        let snapshot = store.fetch().await.unwrap();
        store
            .compare_and_swap(snapshot.revision, BuzzerState::countdown(now_ms()))
            .await
            .unwrap();
        reconcile(&state).await.unwrap();

        let second_round = claim(&state, "Team B").await.unwrap();
        assert!(second_round.won);
        assert_eq!(second_round.state.winner.as_deref(), Some("Team B"));
    }
}
