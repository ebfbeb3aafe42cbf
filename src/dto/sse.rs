use std::sync::Arc;

use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::ExternalId,
    dto::common::{GameSummary, ScoreRow, TeamSummary},
};

/// Who a notification is addressed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Audience {
    /// Every connected subscriber.
    Everyone,
    /// Only the listed users.
    Users(Arc<[ExternalId]>),
}

impl Audience {
    /// Audience made of the given users.
    pub fn users(ids: impl IntoIterator<Item = ExternalId>) -> Self {
        Audience::Users(ids.into_iter().collect())
    }
}

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub audience: Audience,
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(audience: Audience, event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            audience,
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Whether `user` should receive this event.
    pub fn is_for(&self, user: ExternalId) -> bool {
        match &self.audience {
            Audience::Everyone => true,
            Audience::Users(ids) => ids.contains(&user),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    pub user_id: ExternalId,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent when a game starts. Players without a team are invited to register.
pub struct GameStartedEvent {
    pub game: GameSummary,
    pub has_team: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent to players with a team when a question opens.
pub struct QuestionStartedEvent {
    pub game_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent to the host and the team when a team buzzes first.
pub struct FirstBuzzEvent {
    pub game_id: Uuid,
    pub team: TeamSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent to a team whose answer was accepted.
pub struct AnswerCorrectEvent {
    pub game_id: Uuid,
    pub team_id: Uuid,
    pub scores: Vec<ScoreRow>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent to a team whose answer was rejected.
pub struct AnswerWrongEvent {
    pub game_id: Uuid,
    pub team_id: Uuid,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
/// Sent to the next team and the host after a wrong answer.
pub struct NextTurnEvent {
    pub game_id: Uuid,
    /// Team now allowed to answer; absent when nobody is left.
    pub team_id: Option<Uuid>,
    pub scores: Option<Vec<ScoreRow>>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent to everyone with the final table.
pub struct GameFinishedEvent {
    pub game: GameSummary,
    pub scores: Vec<ScoreRow>,
}
