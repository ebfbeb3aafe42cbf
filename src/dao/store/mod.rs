mod memory;
mod snapshot;

pub use memory::MemoryStore;
pub use snapshot::{SnapshotError, SnapshotFile};

use futures::future::BoxFuture;

use crate::dao::{
    models::{
        ExternalId, GameEntity, GameId, PlayerEntity, PlayerMeta, ScoreEntry, TeamEntity, TeamId,
    },
    storage::StorageResult,
};

/// Outcome of an atomic team registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// Team and membership were created together.
    Created(TeamEntity),
    /// The player already belongs to this team; nothing was written.
    AlreadyOnTeam(TeamEntity),
    /// Another team already uses this name (case-insensitive); nothing was written.
    DuplicateName(TeamEntity),
}

/// Outcome of a game creation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameCreation {
    /// A new idle game was stored.
    Created(GameEntity),
    /// A non-finished game already exists.
    ActiveExists(GameEntity),
}

/// Points granted to a team as part of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Award {
    /// Team receiving the points.
    pub team_id: TeamId,
    /// Strictly positive amount of points.
    pub points: u32,
}

/// Unit of work applied atomically by [`BuzzerStore::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// Next state of the game record.
    pub game: GameEntity,
    /// Version the stored game must still have for the commit to apply.
    pub expected_version: u64,
    /// Create a zero-score participant row for every known team.
    pub seed_all_teams: bool,
    /// Points to add in the same commit.
    pub award: Option<Award>,
}

/// Result of a [`ChangeSet`] commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Everything was applied; carries the stored game.
    Applied(GameEntity),
    /// The stored game moved on since the change set was planned; nothing was applied.
    Stale {
        /// Version the change set expected.
        expected: u64,
        /// Version found in storage.
        actual: u64,
    },
    /// Reopening a finished game would leave two non-finished games; carries the active one.
    ActiveExists(GameEntity),
    /// The game does not exist.
    MissingGame,
}

/// Abstraction over the persistence layer for players, teams, games and scores.
///
/// Every method is atomic on its own: it either applies completely or not at all.
pub trait BuzzerStore: Send + Sync {
    /// Insert the player or refresh its metadata.
    fn upsert_player(
        &self,
        external_id: ExternalId,
        meta: PlayerMeta,
    ) -> BoxFuture<'static, StorageResult<PlayerEntity>>;
    /// Look a player up by external id.
    fn find_player(
        &self,
        external_id: ExternalId,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// Every known player, in first-interaction order.
    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Players without any membership.
    fn players_without_team(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Team the player belongs to, if any.
    fn team_of(
        &self,
        external_id: ExternalId,
    ) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    /// Create a team named `name` (already trimmed) and join `external_id` to it.
    fn register_team(
        &self,
        external_id: ExternalId,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Registration>>;
    /// Members of a team in join order.
    fn members_of(&self, team_id: TeamId) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Look a team up by id.
    fn find_team(&self, team_id: TeamId) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    /// Teams matching the given ids; unknown ids are skipped.
    fn teams_by_ids(
        &self,
        team_ids: Vec<TeamId>,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;
    /// Most recently created non-finished game.
    fn active_game(&self) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Look a game up by id.
    fn find_game(&self, game_id: GameId) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Create an idle game unless a non-finished game exists.
    fn create_game(&self, owner_id: ExternalId) -> BoxFuture<'static, StorageResult<GameCreation>>;
    /// Hand an existing game over to another admin.
    fn reassign_owner(
        &self,
        game_id: GameId,
        owner_id: ExternalId,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Apply a state transition and its side effects atomically.
    fn commit(&self, changes: ChangeSet) -> BoxFuture<'static, StorageResult<CommitOutcome>>;
    /// Create missing zero-score participant rows.
    fn ensure_participants(
        &self,
        game_id: GameId,
        team_ids: Vec<TeamId>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Add points to a team, creating its participant row when needed. Returns the new total.
    fn award(
        &self,
        game_id: GameId,
        team_id: TeamId,
        points: u32,
    ) -> BoxFuture<'static, StorageResult<u32>>;
    /// Ranked score table: score descending, then team name ascending.
    fn scores(&self, game_id: GameId) -> BoxFuture<'static, StorageResult<Vec<ScoreEntry>>>;
    /// Cheap liveness probe of the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
