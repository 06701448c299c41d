//! Local named-slot persistence.
//!
//! A slot is a schema-versioned name mapped to one JSON blob. Slot names are
//! bumped whenever the persisted shape changes, so two schema revisions never
//! cross-contaminate: a document written under an old name is simply absent
//! for the new schema, and the total loaders substitute defaults.

use std::{
    collections::HashMap,
    fs, io,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use tokio::sync::broadcast;
use tracing::warn;

use crate::{
    dao::storage::{StorageError, StorageResult},
    state::board::{Question, ScoreboardDocument},
};

/// Slot holding the scoreboard session document.
pub const SCOREBOARD_SLOT: &str = "scoreboard_state_v2";
/// Slot holding the question bank, versioned independently.
pub const QUESTION_BANK_SLOT: &str = "question_bank_v1";

/// Byte-blob key-value substrate the typed store sits on.
pub trait SlotStore: Send + Sync {
    /// Read a slot's raw bytes; `None` when the slot has never been written.
    fn read(&self, slot: &str) -> StorageResult<Option<Vec<u8>>>;
    /// Replace a slot's content atomically.
    fn write(&self, slot: &str, bytes: &[u8]) -> StorageResult<()>;
}

/// One JSON file per slot under a data directory. Writes go through a
/// temporary file plus rename so a crash never leaves a half-written slot.
pub struct FileSlotStore {
    dir: PathBuf,
}

impl FileSlotStore {
    /// Open (and create if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| {
            StorageError::unavailable(format!("creating data directory {}", dir.display()), source)
        })?;
        Ok(Self { dir })
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{slot}.json"))
    }
}

impl SlotStore for FileSlotStore {
    fn read(&self, slot: &str) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(self.slot_path(slot)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::unavailable(
                format!("reading slot `{slot}`"),
                err,
            )),
        }
    }

    fn write(&self, slot: &str, bytes: &[u8]) -> StorageResult<()> {
        let path = self.slot_path(slot);
        let tmp = self.dir.join(format!("{slot}.json.tmp"));
        let result: io::Result<()> = (|| {
            fs::write(&tmp, bytes)?;
            fs::rename(&tmp, &path)
        })();
        result.map_err(|err| StorageError::unavailable(format!("writing slot `{slot}`"), err))
    }
}

/// In-memory substrate used by tests and throwaway sessions.
#[derive(Default)]
pub struct MemorySlotStore {
    slots: Mutex<HashMap<String, Vec<u8>>>,
}

impl SlotStore for MemorySlotStore {
    fn read(&self, slot: &str) -> StorageResult<Option<Vec<u8>>> {
        let slots = self.slots.lock().expect("slot map poisoned");
        Ok(slots.get(slot).cloned())
    }

    fn write(&self, slot: &str, bytes: &[u8]) -> StorageResult<()> {
        let mut slots = self.slots.lock().expect("slot map poisoned");
        slots.insert(slot.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Notification payload broadcast on every save: only the slot name, never a
/// diff. Subscribers must reload and re-derive their view from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotChanged {
    /// Name of the slot that was written.
    pub slot: &'static str,
}

/// Typed facade over the slot substrate owning the scoreboard document and
/// the question bank, plus the change broadcast every surface subscribes to.
pub struct BoardStore {
    slots: Arc<dyn SlotStore>,
    changes: broadcast::Sender<SlotChanged>,
}

impl BoardStore {
    /// Wrap a slot substrate with its change broadcast channel. The channel
    /// only carries slot names, so a small fixed capacity is plenty.
    pub fn new(slots: Arc<dyn SlotStore>) -> Self {
        let (changes, _receiver) = broadcast::channel(16);
        Self { slots, changes }
    }

    /// Load the question bank. Total: any failure yields an empty bank.
    pub fn load_questions(&self) -> Vec<Question> {
        let raw = match self.slots.read(QUESTION_BANK_SLOT) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "reading question bank failed; treating as empty");
                None
            }
        };
        raw.and_then(|bytes| match serde_json::from_slice(&bytes) {
            Ok(bank) => Some(bank),
            Err(err) => {
                warn!(error = %err, "question bank slot is corrupt; treating as empty");
                None
            }
        })
        .unwrap_or_default()
    }

    /// Load the scoreboard document. Total: corruption or absence yields the
    /// default document, and the question index is clamped against the bank.
    pub fn load_board(&self) -> ScoreboardDocument {
        let question_count = self.load_questions().len();
        let raw = match self.slots.read(SCOREBOARD_SLOT) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "reading scoreboard slot failed; using default document");
                None
            }
        };
        ScoreboardDocument::from_persisted(raw.as_deref(), question_count)
    }

    /// Persist the document as one atomic blob and notify subscribers.
    pub fn save_board(&self, doc: &ScoreboardDocument) -> StorageResult<()> {
        let bytes = serde_json::to_vec(doc).map_err(|err| {
            StorageError::unavailable("encoding scoreboard document", err)
        })?;
        self.slots.write(SCOREBOARD_SLOT, &bytes)?;
        let _ = self.changes.send(SlotChanged {
            slot: SCOREBOARD_SLOT,
        });
        Ok(())
    }

    /// Replace the whole question bank atomically and notify subscribers.
    pub fn save_questions(&self, bank: &[Question]) -> StorageResult<()> {
        let bytes = serde_json::to_vec(bank)
            .map_err(|err| StorageError::unavailable("encoding question bank", err))?;
        self.slots.write(QUESTION_BANK_SLOT, &bytes)?;
        let _ = self.changes.send(SlotChanged {
            slot: QUESTION_BANK_SLOT,
        });
        Ok(())
    }

    /// Subscribe to save notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SlotChanged> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::state::board::RevealStage;

    fn temp_store() -> (FileSlotStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("quiz-board-test-{}", Uuid::new_v4()));
        (FileSlotStore::open(&dir).unwrap(), dir)
    }

    #[test]
    fn file_store_round_trips_and_reports_absence() {
        let (store, dir) = temp_store();
        assert_eq!(store.read("missing").unwrap(), None);

        store.write("a_slot", b"{\"x\":1}").unwrap();
        assert_eq!(store.read("a_slot").unwrap().as_deref(), Some(&b"{\"x\":1}"[..]));

        store.write("a_slot", b"{}").unwrap();
        assert_eq!(store.read("a_slot").unwrap().as_deref(), Some(&b"{}"[..]));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn board_load_recovers_from_corrupt_slots() {
        let slots = Arc::new(MemorySlotStore::default());
        slots.write(SCOREBOARD_SLOT, b"garbage").unwrap();
        slots.write(QUESTION_BANK_SLOT, b"{\"oops\": true}").unwrap();

        let store = BoardStore::new(slots);
        assert!(store.load_questions().is_empty());

        let doc = store.load_board();
        assert_eq!(doc, ScoreboardDocument::default());
    }

    #[test]
    fn board_save_and_reload_preserves_the_document() {
        let store = BoardStore::new(Arc::new(MemorySlotStore::default()));
        store
            .save_questions(&[Question::default(), Question::default()])
            .unwrap();

        let mut doc = ScoreboardDocument::default();
        doc.apply_score_deltas(vec![0, 1, 1, 1]);
        doc.advance(2);
        store.save_board(&doc).unwrap();

        let reloaded = store.load_board();
        assert_eq!(reloaded, doc);
        assert_eq!(reloaded.reveal_stage, RevealStage::Revealed);
    }

    #[tokio::test]
    async fn saves_notify_subscribers_with_the_slot_name() {
        let store = BoardStore::new(Arc::new(MemorySlotStore::default()));
        let mut changes = store.subscribe();

        store.save_board(&ScoreboardDocument::default()).unwrap();
        store.save_questions(&[]).unwrap();

        assert_eq!(
            changes.recv().await.unwrap(),
            SlotChanged {
                slot: SCOREBOARD_SLOT
            }
        );
        assert_eq!(
            changes.recv().await.unwrap(),
            SlotChanged {
                slot: QUESTION_BANK_SLOT
            }
        );
    }
}
