use std::{sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    Award, BuzzerStore, ChangeSet, CommitOutcome, GameCreation, Registration,
    snapshot::{SnapshotError, SnapshotFile},
};
use crate::{
    dao::{
        models::{
            ExternalId, GameEntity, GameId, MembershipEntity, ParticipantEntity, PlayerEntity,
            PlayerMeta, ScoreEntry, TeamEntity, TeamId,
        },
        storage::StorageResult,
    },
    state::state_machine::GameStatus,
};

/// Every record kept by the store. Cloned to stage a mutation, swapped in on success.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tables {
    players: IndexMap<ExternalId, PlayerEntity>,
    teams: IndexMap<TeamId, TeamEntity>,
    memberships: IndexMap<ExternalId, MembershipEntity>,
    games: IndexMap<GameId, GameEntity>,
    participants: Vec<ParticipantEntity>,
}

impl Tables {
    fn team_of(&self, external_id: ExternalId) -> Option<&TeamEntity> {
        self.memberships
            .get(&external_id)
            .and_then(|membership| self.teams.get(&membership.team_id))
    }

    fn team_by_name(&self, name: &str) -> Option<&TeamEntity> {
        let needle = name.to_lowercase();
        self.teams
            .values()
            .find(|team| team.name.to_lowercase() == needle)
    }

    fn active_game(&self) -> Option<&GameEntity> {
        self.games
            .values()
            .filter(|game| game.status != GameStatus::Finished)
            .max_by_key(|game| game.created_at)
    }

    fn has_participant(&self, game_id: GameId, team_id: TeamId) -> bool {
        self.participants
            .iter()
            .any(|p| p.game_id == game_id && p.team_id == team_id)
    }

    /// Returns `true` when a row had to be created.
    fn ensure_participant(&mut self, game_id: GameId, team_id: TeamId) -> bool {
        if self.has_participant(game_id, team_id) {
            return false;
        }
        self.participants.push(ParticipantEntity {
            game_id,
            team_id,
            score: 0,
        });
        true
    }

    fn add_points(&mut self, game_id: GameId, award: Award) -> u32 {
        self.ensure_participant(game_id, award.team_id);
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.game_id == game_id && p.team_id == award.team_id);
        match participant {
            Some(participant) => {
                participant.score = participant.score.saturating_add(award.points);
                participant.score
            }
            None => 0,
        }
    }

    fn scores(&self, game_id: GameId) -> Vec<ScoreEntry> {
        let mut rows: Vec<ScoreEntry> = self
            .participants
            .iter()
            .filter(|p| p.game_id == game_id)
            .filter_map(|p| {
                self.teams.get(&p.team_id).map(|team| ScoreEntry {
                    team_id: team.id,
                    team_name: team.name.clone(),
                    score: p.score,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.team_name.cmp(&b.team_name))
        });
        rows
    }

    fn members_of(&self, team_id: TeamId) -> Vec<PlayerEntity> {
        self.memberships
            .values()
            .filter(|membership| membership.team_id == team_id)
            .filter_map(|membership| self.players.get(&membership.player_id).cloned())
            .collect()
    }
}

/// Store keeping every table in memory, optionally mirrored to a JSON snapshot.
///
/// With a snapshot, mutations run against a staged copy of the tables that replaces
/// the live tables only once the file has been written, so a failed write leaves
/// both memory and disk untouched. Without one nothing can fail after a mutation
/// starts, and the live tables are changed in place.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    tables: RwLock<Tables>,
    snapshot: Option<SnapshotFile>,
}

impl MemoryStore {
    /// Volatile store, used by tests and when no data path is configured.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                tables: RwLock::new(Tables::default()),
                snapshot: None,
            }),
        }
    }

    /// Load the snapshot (or start empty) and persist every later mutation to it.
    pub async fn open(snapshot: SnapshotFile) -> Result<Self, SnapshotError> {
        let tables: Tables = snapshot.load().await?;
        info!(
            path = %snapshot.path().display(),
            players = tables.players.len(),
            teams = tables.teams.len(),
            games = tables.games.len(),
            "loaded store snapshot"
        );
        Ok(Self {
            inner: Arc::new(MemoryInner {
                tables: RwLock::new(tables),
                snapshot: Some(snapshot),
            }),
        })
    }

    async fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let guard = self.inner.tables.read().await;
        f(&guard)
    }

    /// Run `f` on the tables, staged when a snapshot has to be written first. The
    /// closure reports whether it changed anything.
    ///
    /// `f` must check everything it needs before touching the tables.
    async fn mutate<T>(&self, f: impl FnOnce(&mut Tables) -> (T, bool)) -> StorageResult<T> {
        let mut guard = self.inner.tables.write().await;
        let Some(snapshot) = &self.inner.snapshot else {
            return Ok(f(&mut *guard).0);
        };
        let mut staged = guard.clone();
        let (value, changed) = f(&mut staged);
        if changed {
            snapshot.save(&staged).await?;
            *guard = staged;
        }
        Ok(value)
    }

    async fn upsert_player(
        &self,
        external_id: ExternalId,
        meta: PlayerMeta,
    ) -> StorageResult<PlayerEntity> {
        self.mutate(move |tables| match tables.players.get_mut(&external_id) {
            Some(player) => {
                let changed = player.refresh(&meta);
                (player.clone(), changed)
            }
            None => {
                let player = PlayerEntity {
                    external_id,
                    username: meta.username,
                    full_name: meta.full_name,
                    created_at: SystemTime::now(),
                };
                tables.players.insert(external_id, player.clone());
                debug!(external_id, "player created");
                (player, true)
            }
        })
        .await
    }

    async fn register_team(
        &self,
        external_id: ExternalId,
        name: String,
    ) -> StorageResult<Registration> {
        self.mutate(move |tables| {
            if let Some(team) = tables.team_of(external_id) {
                return (Registration::AlreadyOnTeam(team.clone()), false);
            }
            if let Some(team) = tables.team_by_name(&name) {
                return (Registration::DuplicateName(team.clone()), false);
            }

            let now = SystemTime::now();
            tables
                .players
                .entry(external_id)
                .or_insert_with(|| PlayerEntity {
                    external_id,
                    username: None,
                    full_name: None,
                    created_at: now,
                });
            let team = TeamEntity {
                id: Uuid::new_v4(),
                name,
                created_at: now,
            };
            tables.teams.insert(team.id, team.clone());
            tables.memberships.insert(
                external_id,
                MembershipEntity {
                    player_id: external_id,
                    team_id: team.id,
                    joined_at: now,
                },
            );
            (Registration::Created(team), true)
        })
        .await
    }

    async fn create_game(&self, owner_id: ExternalId) -> StorageResult<GameCreation> {
        self.mutate(move |tables| {
            if let Some(active) = tables.active_game() {
                return (GameCreation::ActiveExists(active.clone()), false);
            }
            let game = GameEntity {
                id: Uuid::new_v4(),
                owner_id,
                status: GameStatus::Idle,
                version: 0,
                created_at: SystemTime::now(),
                finished_at: None,
            };
            tables.games.insert(game.id, game.clone());
            (GameCreation::Created(game), true)
        })
        .await
    }

    async fn reassign_owner(
        &self,
        game_id: GameId,
        owner_id: ExternalId,
    ) -> StorageResult<Option<GameEntity>> {
        self.mutate(move |tables| match tables.games.get_mut(&game_id) {
            Some(game) if game.owner_id == owner_id => (Some(game.clone()), false),
            Some(game) => {
                game.owner_id = owner_id;
                (Some(game.clone()), true)
            }
            None => (None, false),
        })
        .await
    }

    async fn commit(&self, changes: ChangeSet) -> StorageResult<CommitOutcome> {
        self.mutate(move |tables| {
            let game_id = changes.game.id;
            let Some(stored) = tables.games.get(&game_id) else {
                return (CommitOutcome::MissingGame, false);
            };
            if stored.version != changes.expected_version {
                return (
                    CommitOutcome::Stale {
                        expected: changes.expected_version,
                        actual: stored.version,
                    },
                    false,
                );
            }
            if stored.status == GameStatus::Finished && changes.game.status != GameStatus::Finished
            {
                if let Some(active) = tables.active_game() {
                    return (CommitOutcome::ActiveExists(active.clone()), false);
                }
            }

            if changes.seed_all_teams {
                let team_ids: Vec<TeamId> = tables.teams.keys().copied().collect();
                for team_id in team_ids {
                    tables.ensure_participant(game_id, team_id);
                }
            }
            if let Some(award) = changes.award {
                tables.add_points(game_id, award);
            }
            tables.games.insert(game_id, changes.game.clone());
            (CommitOutcome::Applied(changes.game), true)
        })
        .await
    }

    async fn ensure_participants(&self, game_id: GameId, team_ids: Vec<TeamId>) -> StorageResult<()> {
        let missing: Vec<TeamId> = self
            .read(|tables| {
                team_ids
                    .into_iter()
                    .filter(|team_id| !tables.has_participant(game_id, *team_id))
                    .collect()
            })
            .await;
        if missing.is_empty() {
            return Ok(());
        }
        let team_ids = missing;
        self.mutate(move |tables| {
            let mut created = false;
            for team_id in team_ids {
                created |= tables.ensure_participant(game_id, team_id);
            }
            ((), created)
        })
        .await
    }

    async fn award(&self, game_id: GameId, team_id: TeamId, points: u32) -> StorageResult<u32> {
        self.mutate(move |tables| {
            let total = tables.add_points(game_id, Award { team_id, points });
            (total, true)
        })
        .await
    }

    async fn health_check(&self) -> StorageResult<()> {
        match &self.inner.snapshot {
            Some(snapshot) => snapshot.probe().await.map_err(Into::into),
            None => Ok(()),
        }
    }
}

impl BuzzerStore for MemoryStore {
    fn upsert_player(
        &self,
        external_id: ExternalId,
        meta: PlayerMeta,
    ) -> BoxFuture<'static, StorageResult<PlayerEntity>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_player(external_id, meta).await })
    }

    fn find_player(
        &self,
        external_id: ExternalId,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .read(|tables| tables.players.get(&external_id).cloned())
                .await)
        })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .read(|tables| tables.players.values().cloned().collect())
                .await)
        })
    }

    fn players_without_team(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .read(|tables| {
                    tables
                        .players
                        .values()
                        .filter(|player| !tables.memberships.contains_key(&player.external_id))
                        .cloned()
                        .collect()
                })
                .await)
        })
    }

    fn team_of(
        &self,
        external_id: ExternalId,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.read(|tables| tables.team_of(external_id).cloned()).await) })
    }

    fn register_team(
        &self,
        external_id: ExternalId,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Registration>> {
        let store = self.clone();
        Box::pin(async move { store.register_team(external_id, name).await })
    }

    fn members_of(&self, team_id: TeamId) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.read(|tables| tables.members_of(team_id)).await) })
    }

    fn find_team(&self, team_id: TeamId) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.read(|tables| tables.teams.get(&team_id).cloned()).await) })
    }

    fn teams_by_ids(
        &self,
        team_ids: Vec<TeamId>,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .read(|tables| {
                    team_ids
                        .iter()
                        .filter_map(|id| tables.teams.get(id).cloned())
                        .collect()
                })
                .await)
        })
    }

    fn active_game(&self) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.read(|tables| tables.active_game().cloned()).await) })
    }

    fn find_game(&self, game_id: GameId) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.read(|tables| tables.games.get(&game_id).cloned()).await) })
    }

    fn create_game(&self, owner_id: ExternalId) -> BoxFuture<'static, StorageResult<GameCreation>> {
        let store = self.clone();
        Box::pin(async move { store.create_game(owner_id).await })
    }

    fn reassign_owner(
        &self,
        game_id: GameId,
        owner_id: ExternalId,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.reassign_owner(game_id, owner_id).await })
    }

    fn commit(&self, changes: ChangeSet) -> BoxFuture<'static, StorageResult<CommitOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.commit(changes).await })
    }

    fn ensure_participants(
        &self,
        game_id: GameId,
        team_ids: Vec<TeamId>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_participants(game_id, team_ids).await })
    }

    fn award(
        &self,
        game_id: GameId,
        team_id: TeamId,
        points: u32,
    ) -> BoxFuture<'static, StorageResult<u32>> {
        let store = self.clone();
        Box::pin(async move { store.award(game_id, team_id, points).await })
    }

    fn scores(&self, game_id: GameId) -> BoxFuture<'static, StorageResult<Vec<ScoreEntry>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.read(|tables| tables.scores(game_id)).await) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.health_check().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn team(store: &MemoryStore, player: ExternalId, name: &str) -> TeamEntity {
        match store.register_team(player, name.into()).await.unwrap() {
            Registration::Created(team) => team,
            other => panic!("expected team creation, got {other:?}"),
        }
    }

    async fn game(store: &MemoryStore) -> GameEntity {
        match store.create_game(1).await.unwrap() {
            GameCreation::Created(game) => game,
            other => panic!("expected game creation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upsert_player_never_duplicates() {
        let store = MemoryStore::in_memory();
        store.upsert_player(7, PlayerMeta::default()).await.unwrap();
        let player = store
            .upsert_player(
                7,
                PlayerMeta {
                    username: Some("neo".into()),
                    full_name: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(player.username.as_deref(), Some("neo"));
        assert_eq!(BuzzerStore::list_players(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn team_names_are_unique_regardless_of_case() {
        let store = MemoryStore::in_memory();
        let nova = team(&store, 1, "Nova").await;

        match store.register_team(2, "nOVA".into()).await.unwrap() {
            Registration::DuplicateName(existing) => assert_eq!(existing.id, nova.id),
            other => panic!("unexpected registration outcome: {other:?}"),
        }
        assert!(BuzzerStore::team_of(&store, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_registration_reports_current_team() {
        let store = MemoryStore::in_memory();
        let alpha = team(&store, 1, "Alpha").await;

        let outcome = store.register_team(1, "Beta".into()).await.unwrap();
        assert_eq!(outcome, Registration::AlreadyOnTeam(alpha.clone()));
        let teams = BuzzerStore::teams_by_ids(&store, vec![alpha.id, Uuid::new_v4()])
            .await
            .unwrap();
        assert_eq!(teams, vec![alpha]);
    }

    #[tokio::test]
    async fn only_one_unfinished_game_exists() {
        let store = MemoryStore::in_memory();
        let first = game(&store).await;

        match store.create_game(2).await.unwrap() {
            GameCreation::ActiveExists(active) => assert_eq!(active.id, first.id),
            other => panic!("unexpected creation outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn commit_applies_award_and_status_together() {
        let store = MemoryStore::in_memory();
        let alpha = team(&store, 1, "Alpha").await;
        let game = game(&store).await;

        let mut next = game.clone();
        next.status = GameStatus::Running;
        next.version = 1;
        let outcome = store
            .commit(ChangeSet {
                game: next.clone(),
                expected_version: 0,
                seed_all_teams: true,
                award: Some(Award {
                    team_id: alpha.id,
                    points: 2,
                }),
            })
            .await
            .unwrap();

        assert_eq!(outcome, CommitOutcome::Applied(next));
        let scores = BuzzerStore::scores(&store, game.id).await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, 2);
    }

    #[tokio::test]
    async fn stale_commit_changes_nothing() {
        let store = MemoryStore::in_memory();
        let alpha = team(&store, 1, "Alpha").await;
        let game = game(&store).await;

        let mut next = game.clone();
        next.status = GameStatus::Running;
        let outcome = store
            .commit(ChangeSet {
                game: next,
                expected_version: 3,
                seed_all_teams: false,
                award: Some(Award {
                    team_id: alpha.id,
                    points: 1,
                }),
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CommitOutcome::Stale {
                expected: 3,
                actual: 0
            }
        );
        assert!(BuzzerStore::scores(&store, game.id).await.unwrap().is_empty());
        let stored = BuzzerStore::find_game(&store, game.id).await.unwrap().unwrap();
        assert_eq!(stored.status, GameStatus::Idle);
    }

    #[tokio::test]
    async fn scores_rank_by_score_then_name() {
        let store = MemoryStore::in_memory();
        let a = team(&store, 1, "A").await;
        let b = team(&store, 2, "B").await;
        let c = team(&store, 3, "C").await;
        let game = game(&store).await;

        store.ensure_participants(game.id, vec![b.id]).await.unwrap();
        store.award(game.id, c.id, 1).await.unwrap();
        store.award(game.id, a.id, 1).await.unwrap();

        let table: Vec<(String, u32)> = BuzzerStore::scores(&store, game.id)
            .await
            .unwrap()
            .into_iter()
            .map(|row| (row.team_name, row.score))
            .collect();
        assert_eq!(
            table,
            vec![("A".into(), 1), ("C".into(), 1), ("B".into(), 0)]
        );
    }

    #[tokio::test]
    async fn members_and_unaffiliated_players() {
        let store = MemoryStore::in_memory();
        store.upsert_player(1, PlayerMeta::default()).await.unwrap();
        store.upsert_player(2, PlayerMeta::default()).await.unwrap();
        let alpha = team(&store, 1, "Alpha").await;

        let members = BuzzerStore::members_of(&store, alpha.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].external_id, 1);

        let loners = BuzzerStore::players_without_team(&store).await.unwrap();
        assert_eq!(loners.len(), 1);
        assert_eq!(loners[0].external_id, 2);
    }

    #[tokio::test]
    async fn failed_snapshot_write_rolls_the_commit_back() {
        let dir = std::env::temp_dir().join(format!("quiz-buzzer-{}", Uuid::new_v4().simple()));
        let store = MemoryStore::open(SnapshotFile::new(dir.join("store.json")))
            .await
            .unwrap();
        let alpha = team(&store, 1, "Alpha").await;
        let game = game(&store).await;

        // A plain file where the snapshot directory should be makes every save fail.
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, b"").unwrap();

        let mut next = game.clone();
        next.status = GameStatus::Running;
        next.version = 1;
        let err = store
            .commit(ChangeSet {
                game: next,
                expected_version: 0,
                seed_all_teams: true,
                award: Some(Award {
                    team_id: alpha.id,
                    points: 1,
                }),
            })
            .await
            .unwrap_err();
        assert!(err.is_transient());

        assert!(BuzzerStore::scores(&store, game.id).await.unwrap().is_empty());
        let stored = BuzzerStore::find_game(&store, game.id).await.unwrap().unwrap();
        assert_eq!(stored, game);

        let _ = std::fs::remove_file(dir);
    }

    #[tokio::test]
    async fn known_participants_are_not_restaged() {
        let store = MemoryStore::in_memory();
        let alpha = team(&store, 1, "Alpha").await;
        let game = game(&store).await;

        store.award(game.id, alpha.id, 2).await.unwrap();
        store.ensure_participants(game.id, vec![alpha.id]).await.unwrap();

        let scores = BuzzerStore::scores(&store, game.id).await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, 2);
    }

    #[tokio::test]
    async fn reopened_snapshot_keeps_roster() {
        let dir = std::env::temp_dir().join(format!("quiz-buzzer-{}", Uuid::new_v4().simple()));
        let path = dir.join("store.json");

        let store = MemoryStore::open(SnapshotFile::new(&path)).await.unwrap();
        let alpha = team(&store, 1, "Alpha").await;
        drop(store);

        let reopened = MemoryStore::open(SnapshotFile::new(&path)).await.unwrap();
        let found = BuzzerStore::team_of(&reopened, 1).await.unwrap();
        assert_eq!(found, Some(alpha));

        let _ = std::fs::remove_dir_all(dir);
    }
}
