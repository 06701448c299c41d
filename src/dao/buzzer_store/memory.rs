//! In-process buzzer store: a versioned cell behind a mutex.
//!
//! Used by the test suite to exercise the CAS contract without a network,
//! and usable as a single-host backend when no remote store is configured.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use crate::{
    dao::{
        buzzer_store::{BuzzerSnapshot, BuzzerStore, CasOutcome, Revision},
        storage::StorageResult,
    },
    state::buzzer::BuzzerState,
};

#[derive(Debug, Default)]
struct Cell {
    version: u64,
    state: Option<BuzzerState>,
}

/// Shared in-memory document with counter-based revisions.
#[derive(Clone, Default)]
pub struct MemoryBuzzerStore {
    cell: Arc<Mutex<Cell>>,
}

impl MemoryBuzzerStore {
    /// Fresh store with no document.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BuzzerStore for MemoryBuzzerStore {
    fn fetch(&self) -> BoxFuture<'static, StorageResult<BuzzerSnapshot>> {
        let cell = self.cell.clone();
        Box::pin(async move {
            let cell = cell.lock().expect("buzzer cell poisoned");
            Ok(match &cell.state {
                Some(state) => BuzzerSnapshot {
                    state: state.clone(),
                    revision: Some(cell.version.to_string()),
                },
                None => BuzzerSnapshot::absent(),
            })
        })
    }

    fn compare_and_swap(
        &self,
        expected: Option<Revision>,
        next: BuzzerState,
    ) -> BoxFuture<'static, StorageResult<CasOutcome>> {
        let cell = self.cell.clone();
        Box::pin(async move {
            let mut cell = cell.lock().expect("buzzer cell poisoned");
            let current = cell.state.as_ref().map(|_| cell.version.to_string());
            if current != expected {
                return Ok(CasOutcome::Conflict);
            }
            cell.version += 1;
            cell.state = Some(next);
            Ok(CasOutcome::Committed)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::buzzer::BuzzerPhase;

    #[tokio::test]
    async fn absent_document_normalizes_to_open() {
        let store = MemoryBuzzerStore::new();
        let snapshot = store.fetch().await.unwrap();
        assert_eq!(snapshot, BuzzerSnapshot::absent());
        assert_eq!(snapshot.state.phase, BuzzerPhase::Open);
    }

    #[tokio::test]
    async fn create_commits_once_and_conflicts_after() {
        let store = MemoryBuzzerStore::new();
        assert_eq!(
            store
                .compare_and_swap(None, BuzzerState::open())
                .await
                .unwrap(),
            CasOutcome::Committed
        );
        assert_eq!(
            store
                .compare_and_swap(None, BuzzerState::open())
                .await
                .unwrap(),
            CasOutcome::Conflict
        );
    }

    #[tokio::test]
    async fn stale_revision_is_rejected() {
        let store = MemoryBuzzerStore::new();
        store
            .compare_and_swap(None, BuzzerState::open())
            .await
            .unwrap();

        let stale = store.fetch().await.unwrap().revision;
        assert_eq!(
            store
                .compare_and_swap(stale.clone(), BuzzerState::locked("Team A"))
                .await
                .unwrap(),
            CasOutcome::Committed
        );
        // Same revision again: someone else already advanced the document.
        assert_eq!(
            store
                .compare_and_swap(stale, BuzzerState::locked("Team B"))
                .await
                .unwrap(),
            CasOutcome::Conflict
        );

        let snapshot = store.fetch().await.unwrap();
        assert_eq!(snapshot.state.winner.as_deref(), Some("Team A"));
    }
}
