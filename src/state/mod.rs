pub mod interaction;
pub mod queue;
mod sse;
pub mod state_machine;
pub mod transitions;

use std::{sync::Arc, time::Duration};

use tokio::sync::{RwLock, watch};

use crate::{
    auth::AdminAuthority,
    dao::store::BuzzerStore,
    error::ServiceError,
};

pub use self::sse::SseHub;
pub use self::transitions::{RoundPermit, TransitionGate};
use self::{interaction::InteractionState, queue::QueueStore};

pub type SharedState = Arc<AppState>;

/// Capacity of the notification broadcast channel.
pub const NOTIFICATION_CAPACITY: usize = 64;

/// Central application state: storage handle, round queues and pending intents.
pub struct AppState {
    store: RwLock<Option<Arc<dyn BuzzerStore>>>,
    degraded: watch::Sender<bool>,
    queues: QueueStore,
    interactions: InteractionState,
    admins: Arc<dyn AdminAuthority>,
    notifications: SseHub,
    transition_gate: RwLock<()>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a store is installed.
    pub fn new(admins: Arc<dyn AdminAuthority>, registration_ttl: Duration) -> SharedState {
        Self::build(admins, registration_ttl, None)
    }

    /// Construct a state that is immediately backed by `store`.
    pub fn with_store(
        admins: Arc<dyn AdminAuthority>,
        registration_ttl: Duration,
        store: Arc<dyn BuzzerStore>,
    ) -> SharedState {
        Self::build(admins, registration_ttl, Some(store))
    }

    fn build(
        admins: Arc<dyn AdminAuthority>,
        registration_ttl: Duration,
        store: Option<Arc<dyn BuzzerStore>>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(store.is_none());
        Arc::new(Self {
            store: RwLock::new(store),
            degraded: degraded_tx,
            queues: QueueStore::new(),
            interactions: InteractionState::new(registration_ttl),
            admins,
            notifications: SseHub::new(NOTIFICATION_CAPACITY),
            transition_gate: RwLock::new(()),
        })
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn BuzzerStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] while running without a healthy one.
    pub async fn require_store(&self) -> Result<Arc<dyn BuzzerStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a store implementation and leave degraded mode.
    pub async fn set_store(&self, store: Arc<dyn BuzzerStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update the degraded flag, notifying watchers only when it changes.
    pub fn update_degraded(&self, value: bool) -> bool {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Round queues of every game.
    pub fn queues(&self) -> &QueueStore {
        &self.queues
    }

    /// Pending per-player intents.
    pub fn interactions(&self) -> &InteractionState {
        &self.interactions
    }

    /// Admin allow-list.
    pub fn admins(&self) -> &dyn AdminAuthority {
        self.admins.as_ref()
    }

    /// Broadcast hub used by the notification stream.
    pub fn notifications(&self) -> &SseHub {
        &self.notifications
    }

    /// Wait for exclusive right to run a game transition.
    pub async fn lock_transitions(&self) -> TransitionGate<'_> {
        TransitionGate::new(self.transition_gate.write().await)
    }

    /// Keep transitions out while a press is recorded.
    pub async fn enter_round(&self) -> RoundPermit<'_> {
        RoundPermit::new(self.transition_gate.read().await)
    }
}
