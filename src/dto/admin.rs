//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::common::{GameSummary, PlayerSummary, ScoreRow, TeamSummary, score_rows},
    services::{
        buzzer_service::{CorrectOutcome, WrongOutcome},
        game_service::GameRef,
        roster_service::PlayerFilter,
    },
};

/// Optional game selector; the active game when omitted.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GameQuery {
    pub game_id: Option<Uuid>,
}

impl GameQuery {
    /// Target of the request.
    pub fn game_ref(&self) -> GameRef {
        self.game_id.into()
    }
}

/// "Correct" verdict for a team.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CorrectRequest {
    pub team_id: Uuid,
}

/// Result of a "correct" verdict.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct CorrectResponse {
    pub game: GameSummary,
    /// Team that received the point.
    pub team_id: Uuid,
    /// Head of the queue when the verdict was given.
    pub popped_team_id: Option<Uuid>,
    pub scores: Vec<ScoreRow>,
}

impl From<CorrectOutcome> for CorrectResponse {
    fn from(outcome: CorrectOutcome) -> Self {
        Self {
            game: outcome.game.into(),
            team_id: outcome.notify_team_id,
            popped_team_id: outcome.popped_team_id,
            scores: score_rows(outcome.scores),
        }
    }
}

/// Result of a "wrong" verdict.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct WrongResponse {
    pub game: GameSummary,
    pub removed_team_id: Uuid,
    pub next_team_id: Option<Uuid>,
    /// `true` when nobody is left and the question was closed.
    pub exhausted: bool,
    pub scores: Option<Vec<ScoreRow>>,
}

impl From<WrongOutcome> for WrongResponse {
    fn from(outcome: WrongOutcome) -> Self {
        Self {
            exhausted: outcome.exhausted(),
            game: outcome.game.into(),
            removed_team_id: outcome.removed_team_id,
            next_team_id: outcome.next_team_id,
            scores: outcome.scores.map(score_rows),
        }
    }
}

/// Manual score correction.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AwardRequest {
    pub team_id: Uuid,
    #[validate(range(min = 1))]
    pub points: u32,
}

/// Total after a manual award.
#[derive(Debug, Serialize, ToSchema)]
pub struct AwardResponse {
    pub team_id: Uuid,
    pub score: u32,
}

/// Current buzz-in order.
#[derive(Debug, Serialize, ToSchema)]
pub struct QueueResponse {
    pub game_id: Uuid,
    pub teams: Vec<TeamSummary>,
}

/// Roster subset selector.
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlayerFilterParam {
    #[default]
    All,
    WithTeam,
    WithoutTeam,
}

impl From<PlayerFilterParam> for PlayerFilter {
    fn from(param: PlayerFilterParam) -> Self {
        match param {
            PlayerFilterParam::All => PlayerFilter::All,
            PlayerFilterParam::WithTeam => PlayerFilter::WithTeam,
            PlayerFilterParam::WithoutTeam => PlayerFilter::WithoutTeam,
        }
    }
}

/// Query of the player listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PlayersQuery {
    #[serde(default)]
    #[param(inline)]
    pub filter: PlayerFilterParam,
}

/// Player listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayersResponse {
    pub players: Vec<PlayerSummary>,
}

/// Game with its ranked score table.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameScoresResponse {
    pub game: GameSummary,
    pub scores: Vec<ScoreRow>,
}
