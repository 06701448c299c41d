//! Remote storage of the shared buzzer lock document.
//!
//! The contract every backend must honor is "commit iff the revision is
//! still current": [`BuzzerStore::compare_and_swap`] is the only mutation
//! primitive, and it is what guarantees at most one successful claim per
//! open window regardless of how many clients race.

#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;

use futures::future::BoxFuture;

use crate::{dao::storage::StorageResult, state::buzzer::BuzzerState};

/// Opaque revision token identifying one committed version of the document.
pub type Revision = String;

/// A read of the remote document. An absent document normalizes to the open
/// state with no revision; passing that `None` back into a CAS means
/// "create, failing if someone created it first".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuzzerSnapshot {
    /// Normalized lock state (open when the document does not exist).
    pub state: BuzzerState,
    /// Revision the state was read at; `None` for an absent document.
    pub revision: Option<Revision>,
}

impl BuzzerSnapshot {
    /// Snapshot of a room whose document has never been written.
    pub fn absent() -> Self {
        Self {
            state: BuzzerState::open(),
            revision: None,
        }
    }
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The write committed; the caller's state is now current.
    Committed,
    /// Another writer got there first; nothing was written.
    Conflict,
}

/// Abstraction over the remote document store holding the buzzer lock.
pub trait BuzzerStore: Send + Sync {
    /// Read the current document, normalizing absence.
    fn fetch(&self) -> BoxFuture<'static, StorageResult<BuzzerSnapshot>>;
    /// Write `next` iff the document is still at `expected` (`None` =
    /// document must not exist yet).
    fn compare_and_swap(
        &self,
        expected: Option<Revision>,
        next: BuzzerState,
    ) -> BoxFuture<'static, StorageResult<CasOutcome>>;
    /// Cheap connectivity probe used by the supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish whatever the backend needs after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Create the open document when the room has never been used. A conflict
/// means another client created it concurrently, which is just as good.
pub async fn ensure_state_exists(store: &dyn BuzzerStore) -> StorageResult<()> {
    let snapshot = store.fetch().await?;
    if snapshot.revision.is_none() {
        let _ = store.compare_and_swap(None, BuzzerState::open()).await?;
    }
    Ok(())
}
