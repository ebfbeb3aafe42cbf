use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use indexmap::IndexSet;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::dao::models::{GameId, TeamId};

/// Raised when a team buzzes while no question is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no question is open for buzzing")]
pub struct QueueClosed;

/// Result of an enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enqueued {
    /// 1-based position of the team in the queue.
    pub position: usize,
    /// `false` when the team was already queued and nothing changed.
    pub newly_added: bool,
}

#[derive(Debug, Default)]
struct RoundQueue {
    open: bool,
    /// Game version the question was opened at.
    epoch: u64,
    teams: IndexSet<TeamId>,
}

/// Buzz-in order of every game, one lock per game.
///
/// Operations on the same game are serialised by a FIFO-fair [`Mutex`], so the
/// queue order is the order in which presses acquired the lock. No operation
/// awaits anything else while holding it.
#[derive(Debug, Default)]
pub struct QueueStore {
    queues: DashMap<GameId, Arc<Mutex<RoundQueue>>>,
}

impl QueueStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, game_id: GameId) -> Arc<Mutex<RoundQueue>> {
        Arc::clone(self.queues.entry(game_id).or_default().value())
    }

    fn existing(&self, game_id: GameId) -> Option<Arc<Mutex<RoundQueue>>> {
        self.queues
            .get(&game_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Append `team_id` unless already present. Pressing twice keeps the first position.
    ///
    /// `epoch` is the game version the caller saw; a queue opened for another
    /// question rejects the press.
    pub async fn enqueue(
        &self,
        game_id: GameId,
        epoch: u64,
        team_id: TeamId,
    ) -> Result<Enqueued, QueueClosed> {
        let slot = self.existing(game_id).ok_or(QueueClosed)?;
        let mut queue = slot.lock().await;
        if !queue.open || queue.epoch != epoch {
            return Err(QueueClosed);
        }
        let (index, newly_added) = queue.teams.insert_full(team_id);
        Ok(Enqueued {
            position: index + 1,
            newly_added,
        })
    }

    /// Pop the head of the queue and return it with what remains.
    pub async fn dequeue_front(&self, game_id: GameId) -> (Option<TeamId>, Vec<TeamId>) {
        let Some(slot) = self.existing(game_id) else {
            return (None, Vec::new());
        };
        let mut queue = slot.lock().await;
        let removed = queue.teams.shift_remove_index(0);
        (removed, queue.teams.iter().copied().collect())
    }

    /// Put a popped team back at the head.
    pub async fn requeue_front(&self, game_id: GameId, team_id: TeamId) {
        let slot = self.slot(game_id);
        let mut queue = slot.lock().await;
        queue.teams.shift_insert(0, team_id);
    }

    /// Current order, head first.
    pub async fn snapshot(&self, game_id: GameId) -> Vec<TeamId> {
        match self.existing(game_id) {
            Some(slot) => slot.lock().await.teams.iter().copied().collect(),
            None => Vec::new(),
        }
    }

    /// Whether presses are currently accepted.
    pub async fn is_open(&self, game_id: GameId) -> bool {
        match self.existing(game_id) {
            Some(slot) => slot.lock().await.open,
            None => false,
        }
    }

    /// Open an empty queue for a game this process has never tracked, e.g. a question
    /// left open before a restart. Returns `true` when a queue was created.
    ///
    /// Callers must hold a [`RoundPermit`](super::transitions::RoundPermit) and have
    /// seen the game in the question phase at `epoch`.
    pub fn open_if_untracked(&self, game_id: GameId, epoch: u64) -> bool {
        match self.queues.entry(game_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Mutex::new(RoundQueue {
                    open: true,
                    epoch,
                    teams: IndexSet::new(),
                })));
                true
            }
        }
    }

    /// Stop or resume accepting presses without touching the order. Returns the previous flag.
    pub async fn set_accepting(&self, game_id: GameId, accepting: bool) -> bool {
        let slot = self.slot(game_id);
        let mut queue = slot.lock().await;
        std::mem::replace(&mut queue.open, accepting)
    }

    /// Clear the queue and stop accepting presses.
    pub async fn reset(&self, game_id: GameId) {
        let slot = self.slot(game_id);
        let mut queue = slot.lock().await;
        queue.teams.clear();
        queue.open = false;
    }

    /// Clear the queue and start accepting presses for the question opened at `epoch`.
    pub async fn open(&self, game_id: GameId, epoch: u64) {
        let slot = self.slot(game_id);
        let mut queue = slot.lock().await;
        queue.teams.clear();
        queue.open = true;
        queue.epoch = epoch;
    }

    /// Drop the queue of a finished game unless an operation still holds it.
    pub fn evict(&self, game_id: GameId) -> bool {
        self.queues
            .remove_if(&game_id, |_, slot| Arc::strong_count(slot) == 1)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    const EPOCH: u64 = 1;

    async fn open_store() -> (QueueStore, GameId) {
        let store = QueueStore::new();
        let game = Uuid::new_v4();
        store.open(game, EPOCH).await;
        (store, game)
    }

    #[tokio::test]
    async fn distinct_teams_keep_call_order() {
        let (store, game) = open_store().await;
        let teams: Vec<TeamId> = (0..4).map(|_| Uuid::new_v4()).collect();

        for (index, team) in teams.iter().enumerate() {
            let enqueued = store.enqueue(game, EPOCH, *team).await.unwrap();
            assert_eq!(enqueued.position, index + 1);
            assert!(enqueued.newly_added);
        }

        assert_eq!(store.snapshot(game).await, teams);
    }

    #[tokio::test]
    async fn pressing_twice_keeps_position() {
        let (store, game) = open_store().await;
        let (alpha, beta) = (Uuid::new_v4(), Uuid::new_v4());
        store.enqueue(game, EPOCH, alpha).await.unwrap();
        store.enqueue(game, EPOCH, beta).await.unwrap();

        let again = store.enqueue(game, EPOCH, alpha).await.unwrap();
        assert_eq!(
            again,
            Enqueued {
                position: 1,
                newly_added: false
            }
        );
        assert_eq!(store.snapshot(game).await, vec![alpha, beta]);
    }

    #[tokio::test]
    async fn closed_queue_rejects_presses() {
        let store = QueueStore::new();
        let game = Uuid::new_v4();
        assert_eq!(store.enqueue(game, EPOCH, Uuid::new_v4()).await, Err(QueueClosed));

        store.open(game, EPOCH).await;
        store.enqueue(game, EPOCH, Uuid::new_v4()).await.unwrap();
        store.reset(game).await;

        assert!(store.snapshot(game).await.is_empty());
        assert!(!store.is_open(game).await);
        assert_eq!(store.enqueue(game, EPOCH, Uuid::new_v4()).await, Err(QueueClosed));
    }

    #[tokio::test]
    async fn dequeue_on_empty_queue_is_a_no_op() {
        let (store, game) = open_store().await;
        assert_eq!(store.dequeue_front(game).await, (None, vec![]));
        assert!(store.snapshot(game).await.is_empty());
        assert_eq!(store.dequeue_front(Uuid::new_v4()).await, (None, vec![]));
    }

    #[tokio::test]
    async fn requeue_restores_head() {
        let (store, game) = open_store().await;
        let (alpha, beta) = (Uuid::new_v4(), Uuid::new_v4());
        store.enqueue(game, EPOCH, alpha).await.unwrap();
        store.enqueue(game, EPOCH, beta).await.unwrap();

        let (removed, remaining) = store.dequeue_front(game).await;
        assert_eq!(removed, Some(alpha));
        assert_eq!(remaining, vec![beta]);

        store.requeue_front(game, alpha).await;
        assert_eq!(store.snapshot(game).await, vec![alpha, beta]);
    }

    #[tokio::test]
    async fn reopening_always_starts_empty() {
        let (store, game) = open_store().await;
        store.enqueue(game, EPOCH, Uuid::new_v4()).await.unwrap();
        store.open(game, EPOCH).await;
        assert!(store.snapshot(game).await.is_empty());
        assert!(store.is_open(game).await);
    }

    #[tokio::test]
    async fn concurrent_presses_get_unique_positions() {
        let (store, game) = open_store().await;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.enqueue(game, EPOCH, Uuid::new_v4()).await.unwrap()
                })
            })
            .collect();

        let mut positions = Vec::new();
        for handle in handles {
            positions.push(handle.await.unwrap().position);
        }
        positions.sort_unstable();

        assert_eq!(positions, (1..=64).collect::<Vec<_>>());
        assert_eq!(store.snapshot(game).await.len(), 64);
    }

    #[tokio::test]
    async fn untracked_game_can_be_adopted_once() {
        let store = QueueStore::new();
        let game = Uuid::new_v4();
        assert!(store.open_if_untracked(game, EPOCH));
        store.enqueue(game, EPOCH, Uuid::new_v4()).await.unwrap();

        store.reset(game).await;
        assert!(!store.open_if_untracked(game, EPOCH));
        assert!(!store.is_open(game).await);
    }

    #[tokio::test]
    async fn presses_from_another_question_are_rejected() {
        let (store, game) = open_store().await;
        let team = Uuid::new_v4();

        assert_eq!(store.enqueue(game, EPOCH + 2, team).await, Err(QueueClosed));
        store.open(game, EPOCH + 2).await;
        assert_eq!(store.enqueue(game, EPOCH, team).await, Err(QueueClosed));
        assert_eq!(store.enqueue(game, EPOCH + 2, team).await.unwrap().position, 1);
    }

    #[tokio::test]
    async fn evicted_game_stays_closed() {
        let (store, game) = open_store().await;
        store.reset(game).await;
        assert!(store.evict(game));

        assert_eq!(store.enqueue(game, EPOCH, Uuid::new_v4()).await, Err(QueueClosed));
        assert!(!store.evict(game));
    }

    #[tokio::test]
    async fn evict_drops_idle_queue() {
        let (store, game) = open_store().await;
        assert!(store.evict(game));
        assert!(!store.evict(game));
        assert!(store.snapshot(game).await.is_empty());
    }
}
