//! DTO definitions used by the player REST API.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        common::{GameSummary, PlayerIdentity, PlayerSummary, TeamSummary},
        validation::validate_team_name,
    },
    services::{
        buzzer_service::{BuzzOutcome, BuzzResult},
        game_service::PlayerStatus,
    },
};

/// Buzzer press.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct BuzzRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub player: PlayerIdentity,
    /// Target game; the active game when omitted.
    #[serde(default)]
    pub game_id: Option<Uuid>,
}

/// How a press was handled.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BuzzOutcomeKind {
    /// First team to buzz for this question.
    First,
    /// Already queued; nothing changed.
    AlreadyQueued,
    /// Queued behind other teams.
    Queued,
}

/// Result of a press.
#[derive(Debug, Serialize, ToSchema)]
pub struct BuzzResponse {
    pub game_id: Uuid,
    pub outcome: BuzzOutcomeKind,
    /// 1-based position in the queue.
    pub position: usize,
    pub team: TeamSummary,
}

impl From<BuzzResult> for BuzzResponse {
    fn from(result: BuzzResult) -> Self {
        let outcome = match result.outcome {
            BuzzOutcome::First => BuzzOutcomeKind::First,
            BuzzOutcome::AlreadyQueued { .. } => BuzzOutcomeKind::AlreadyQueued,
            BuzzOutcome::Queued { .. } => BuzzOutcomeKind::Queued,
        };
        Self {
            game_id: result.game.id,
            outcome,
            position: result.position,
            team: result.team.into(),
        }
    }
}

/// Direct team registration.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterTeamRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub player: PlayerIdentity,
    #[validate(custom(function = "validate_team_name"))]
    pub name: String,
}

/// Free text sent by a player, e.g. the team name after starting a registration.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct MessageRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub player: PlayerIdentity,
    #[validate(length(min = 1, max = 4096))]
    pub text: String,
}

/// Outcome of a free text message.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    /// `false` when no registration was pending and the text was ignored.
    pub handled: bool,
    pub team: Option<TeamSummary>,
}

/// Acknowledgement of a registration start.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationStartedResponse {
    pub awaiting_team_name: bool,
}

/// What a player can do right now.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerStatusResponse {
    pub player: PlayerSummary,
    /// `idle`, `running`, `question`, `finished` or `none`.
    pub status: String,
    pub game: Option<GameSummary>,
    pub team: Option<TeamSummary>,
    pub can_buzz: bool,
    pub awaiting_team_name: bool,
}

impl PlayerStatusResponse {
    /// Build the response from the service projection.
    pub fn new(status: PlayerStatus, awaiting_team_name: bool) -> Self {
        Self {
            player: status.player.into(),
            status: status.label.to_string(),
            game: status.game.map(GameSummary::from),
            team: status.team.map(TeamSummary::from),
            can_buzz: status.can_buzz,
            awaiting_team_name,
        }
    }
}

/// Team of a player with its members.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamMembersResponse {
    pub team: TeamSummary,
    pub members: Vec<PlayerSummary>,
}
