use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::common::{GameSummary, ScoreRow};

/// Status of the active game as seen by the public.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct GameStatusResponse {
    /// `idle`, `running`, `question`, `finished` or `none`.
    pub status: String,
    pub game: Option<GameSummary>,
    /// True when the backend runs without storage.
    pub degraded: bool,
}

/// Scoreboard of a game.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScoresResponse {
    pub game_id: Uuid,
    pub scores: Vec<ScoreRow>,
}
