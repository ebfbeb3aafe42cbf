//! Store wrapper used to pause or fail storage calls from integration tests.

use std::{
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::future::BoxFuture;
use quiz_buzzer_back::dao::{
    models::{
        ExternalId, GameEntity, GameId, PlayerEntity, PlayerMeta, ScoreEntry, TeamEntity, TeamId,
    },
    storage::{StorageError, StorageResult},
    store::{BuzzerStore, ChangeSet, CommitOutcome, GameCreation, MemoryStore, Registration},
};
use tokio::sync::Notify;

/// Handshake for a paused `team_of` call.
#[derive(Clone, Default)]
pub struct Pause {
    /// Signalled once the call has started waiting.
    pub entered: Arc<Notify>,
    /// Signal to let the call continue.
    pub release: Arc<Notify>,
}

/// In-memory store that can hold the next `team_of` lookup or refuse commits.
pub struct ScriptedStore {
    inner: MemoryStore,
    refuse_commits: AtomicBool,
    pause_team_of: Mutex<Option<Pause>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::in_memory(),
            refuse_commits: AtomicBool::new(false),
            pause_team_of: Mutex::new(None),
        }
    }

    /// Park the next `team_of` call until [`Pause::release`] is notified.
    pub fn pause_next_team_of(&self) -> Pause {
        let pause = Pause::default();
        *self.pause_team_of.lock().unwrap() = Some(pause.clone());
        pause
    }

    /// Make every commit fail as if the disk went away.
    pub fn refuse_commits(&self, refuse: bool) {
        self.refuse_commits.store(refuse, Ordering::SeqCst);
    }
}

impl BuzzerStore for ScriptedStore {
    fn upsert_player(
        &self,
        external_id: ExternalId,
        meta: PlayerMeta,
    ) -> BoxFuture<'static, StorageResult<PlayerEntity>> {
        BuzzerStore::upsert_player(&self.inner, external_id, meta)
    }

    fn find_player(
        &self,
        external_id: ExternalId,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        BuzzerStore::find_player(&self.inner, external_id)
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        BuzzerStore::list_players(&self.inner)
    }

    fn players_without_team(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        BuzzerStore::players_without_team(&self.inner)
    }

    fn team_of(
        &self,
        external_id: ExternalId,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let pause = self.pause_team_of.lock().unwrap().take();
        let lookup = BuzzerStore::team_of(&self.inner, external_id);
        Box::pin(async move {
            if let Some(pause) = pause {
                pause.entered.notify_one();
                pause.release.notified().await;
            }
            lookup.await
        })
    }

    fn register_team(
        &self,
        external_id: ExternalId,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Registration>> {
        BuzzerStore::register_team(&self.inner, external_id, name)
    }

    fn members_of(&self, team_id: TeamId) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        BuzzerStore::members_of(&self.inner, team_id)
    }

    fn find_team(&self, team_id: TeamId) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        BuzzerStore::find_team(&self.inner, team_id)
    }

    fn teams_by_ids(
        &self,
        team_ids: Vec<TeamId>,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        BuzzerStore::teams_by_ids(&self.inner, team_ids)
    }

    fn active_game(&self) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        BuzzerStore::active_game(&self.inner)
    }

    fn find_game(&self, game_id: GameId) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        BuzzerStore::find_game(&self.inner, game_id)
    }

    fn create_game(&self, owner_id: ExternalId) -> BoxFuture<'static, StorageResult<GameCreation>> {
        BuzzerStore::create_game(&self.inner, owner_id)
    }

    fn reassign_owner(
        &self,
        game_id: GameId,
        owner_id: ExternalId,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        BuzzerStore::reassign_owner(&self.inner, game_id, owner_id)
    }

    fn commit(&self, changes: ChangeSet) -> BoxFuture<'static, StorageResult<CommitOutcome>> {
        if self.refuse_commits.load(Ordering::SeqCst) {
            return Box::pin(async {
                Err(StorageError::unavailable(
                    "commit refused",
                    io::Error::other("disk full"),
                ))
            });
        }
        BuzzerStore::commit(&self.inner, changes)
    }

    fn ensure_participants(
        &self,
        game_id: GameId,
        team_ids: Vec<TeamId>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        BuzzerStore::ensure_participants(&self.inner, game_id, team_ids)
    }

    fn award(
        &self,
        game_id: GameId,
        team_id: TeamId,
        points: u32,
    ) -> BoxFuture<'static, StorageResult<u32>> {
        BuzzerStore::award(&self.inner, game_id, team_id, points)
    }

    fn scores(&self, game_id: GameId) -> BoxFuture<'static, StorageResult<Vec<ScoreEntry>>> {
        BuzzerStore::scores(&self.inner, game_id)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        BuzzerStore::health_check(&self.inner)
    }
}
