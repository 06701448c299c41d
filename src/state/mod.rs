pub mod board;
pub mod buzzer;
mod sse;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{
        buzzer_store::BuzzerStore,
        slots::{BoardStore, SlotStore},
    },
    state::buzzer::BuzzerState,
};

pub use self::sse::SseHub;
use self::sse::SseState;

/// Cheaply cloneable handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state: the local board store, the optionally
/// installed remote buzzer store, and the broadcast channels every surface
/// observes.
pub struct AppState {
    config: AppConfig,
    board: BoardStore,
    board_gate: Mutex<()>,
    buzzer_store: RwLock<Option<Arc<dyn BuzzerStore>>>,
    buzzer_watch: watch::Sender<BuzzerState>,
    degraded: watch::Sender<bool>,
    sse: SseState,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a buzzer store is installed.
    pub fn new(config: AppConfig, slots: Arc<dyn SlotStore>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let (buzzer_tx, _rx) = watch::channel(BuzzerState::open());
        Arc::new(Self {
            config,
            board: BoardStore::new(slots),
            board_gate: Mutex::new(()),
            buzzer_store: RwLock::new(None),
            buzzer_watch: buzzer_tx,
            degraded: degraded_tx,
            sse: SseState::new(16, 16),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Typed store owning the persisted document and question bank.
    pub fn board(&self) -> &BoardStore {
        &self.board
    }

    /// Gate serializing load-mutate-save cycles on the board document within
    /// this process. Cross-process writers stay last-write-wins by design.
    pub fn board_gate(&self) -> &Mutex<()> {
        &self.board_gate
    }

    /// Obtain a handle to the current buzzer store, if one is installed.
    pub async fn buzzer_store(&self) -> Option<Arc<dyn BuzzerStore>> {
        let guard = self.buzzer_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a remote buzzer store and leave degraded mode.
    pub async fn install_buzzer_store(&self, store: Arc<dyn BuzzerStore>) {
        {
            let mut guard = self.buzzer_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current buzzer store and enter degraded mode.
    pub async fn clear_buzzer_store(&self) {
        {
            let mut guard = self.buzzer_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.buzzer_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub(crate) fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current != value {
                *current = value;
                true
            } else {
                false
            }
        });
    }

    /// Publish a freshly observed buzzer state, waking observers only when
    /// it actually changed.
    pub fn publish_buzzer(&self, state: BuzzerState) {
        self.buzzer_watch.send_if_modified(|current| {
            if *current != state {
                *current = state;
                true
            } else {
                false
            }
        });
    }

    /// Live subscription to the normalized buzzer state.
    pub fn observe_buzzer(&self) -> watch::Receiver<BuzzerState> {
        self.buzzer_watch.subscribe()
    }

    /// Last observed buzzer state without subscribing.
    pub fn last_buzzer_state(&self) -> BuzzerState {
        self.buzzer_watch.borrow().clone()
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        self.sse.public()
    }

    /// Broadcast hub used for the moderator SSE stream.
    pub fn moderator_sse(&self) -> &SseHub {
        self.sse.moderator().hub()
    }

    /// Token guard that ensures a single moderator SSE subscriber at a time.
    pub fn moderator_token(&self) -> &Mutex<Option<String>> {
        self.sse.moderator().token()
    }
}
