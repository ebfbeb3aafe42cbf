use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{
        ExternalId, GameEntity, PlayerEntity, PlayerMeta, ScoreEntry, TeamEntity,
    },
    dto::format_system_time,
    state::state_machine::GameStatus,
};

/// Identity and display metadata of the player sending a request.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct PlayerIdentity {
    /// External (chat) user id.
    #[validate(range(min = 1))]
    pub user_id: ExternalId,
    /// Short handle, if any.
    #[serde(default)]
    #[validate(length(max = 64))]
    pub username: Option<String>,
    /// Full display name, if any.
    #[serde(default)]
    #[validate(length(max = 256))]
    pub full_name: Option<String>,
}

impl PlayerIdentity {
    /// Metadata to refresh on the stored player.
    pub fn meta(&self) -> PlayerMeta {
        PlayerMeta {
            username: self.username.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

/// Public projection of a game.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameSummary {
    pub id: Uuid,
    pub status: GameStatus,
    pub owner_id: ExternalId,
    pub version: u64,
    pub created_at: String,
    pub finished_at: Option<String>,
}

impl From<&GameEntity> for GameSummary {
    fn from(game: &GameEntity) -> Self {
        Self {
            id: game.id,
            status: game.status,
            owner_id: game.owner_id,
            version: game.version,
            created_at: format_system_time(game.created_at),
            finished_at: game.finished_at.map(format_system_time),
        }
    }
}

impl From<GameEntity> for GameSummary {
    fn from(game: GameEntity) -> Self {
        Self::from(&game)
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// Public projection of a team exposed to REST/SSE clients.
pub struct TeamSummary {
    pub id: Uuid,
    pub name: String,
    pub created_at: String,
}

impl From<TeamEntity> for TeamSummary {
    fn from(team: TeamEntity) -> Self {
        Self {
            id: team.id,
            name: team.name,
            created_at: format_system_time(team.created_at),
        }
    }
}

/// One line of the scoreboard.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ScoreRow {
    pub team_id: Uuid,
    pub team_name: String,
    pub score: u32,
}

impl From<ScoreEntry> for ScoreRow {
    fn from(entry: ScoreEntry) -> Self {
        Self {
            team_id: entry.team_id,
            team_name: entry.team_name,
            score: entry.score,
        }
    }
}

/// Convert a score table into its wire form.
pub fn score_rows(entries: Vec<ScoreEntry>) -> Vec<ScoreRow> {
    entries.into_iter().map(ScoreRow::from).collect()
}

/// Public projection of a player.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PlayerSummary {
    pub user_id: ExternalId,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub created_at: String,
}

impl From<PlayerEntity> for PlayerSummary {
    fn from(player: PlayerEntity) -> Self {
        Self {
            user_id: player.external_id,
            username: player.username,
            full_name: player.full_name,
            created_at: format_system_time(player.created_at),
        }
    }
}
