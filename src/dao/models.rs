use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::state_machine::GameStatus;

/// External user identifier handed over by the transport (chat user id).
pub type ExternalId = i64;
/// Identifier of a team in the roster.
pub type TeamId = Uuid;
/// Identifier of a game session.
pub type GameId = Uuid;

/// Display metadata reported by the transport for a player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerMeta {
    /// Short handle of the user, if any.
    pub username: Option<String>,
    /// Full display name of the user, if any.
    pub full_name: Option<String>,
}

/// A person who interacted with the game at least once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Unique external identifier (primary key).
    pub external_id: ExternalId,
    /// Last known short handle.
    pub username: Option<String>,
    /// Last known full display name.
    pub full_name: Option<String>,
    /// First interaction timestamp.
    pub created_at: SystemTime,
}

impl PlayerEntity {
    /// Apply the provided metadata, returning whether anything changed.
    ///
    /// Missing fields never erase what is already known.
    pub fn refresh(&mut self, meta: &PlayerMeta) -> bool {
        let mut updated = false;
        if let Some(username) = meta.username.as_ref().filter(|u| !u.is_empty()) {
            if self.username.as_ref() != Some(username) {
                self.username = Some(username.clone());
                updated = true;
            }
        }
        if let Some(full_name) = meta.full_name.as_ref().filter(|n| !n.is_empty()) {
            if self.full_name.as_ref() != Some(full_name) {
                self.full_name = Some(full_name.clone());
                updated = true;
            }
        }
        updated
    }
}

/// A registered team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Stable identifier for the team.
    pub id: TeamId,
    /// Display name, trimmed; unique regardless of case.
    pub name: String,
    /// Registration timestamp.
    pub created_at: SystemTime,
}

/// Link between a player and the single team they belong to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MembershipEntity {
    /// Member of the team.
    pub player_id: ExternalId,
    /// Team joined by the player.
    pub team_id: TeamId,
    /// When the player joined.
    pub joined_at: SystemTime,
}

/// Aggregate game entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: GameId,
    /// External id of the admin hosting the game.
    pub owner_id: ExternalId,
    /// Current lifecycle status.
    pub status: GameStatus,
    /// Incremented on every committed transition.
    pub version: u64,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Completion timestamp, only set once finished.
    pub finished_at: Option<SystemTime>,
}

/// Score of a team within a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Game the score belongs to.
    pub game_id: GameId,
    /// Team scoring.
    pub team_id: TeamId,
    /// Accumulated points.
    pub score: u32,
}

/// One line of a ranked score table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntry {
    /// Team identifier.
    pub team_id: TeamId,
    /// Team display name.
    pub team_name: String,
    /// Accumulated points.
    pub score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> PlayerEntity {
        PlayerEntity {
            external_id: 42,
            username: Some("ann".into()),
            full_name: None,
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn refresh_updates_changed_fields_only() {
        let mut player = player();
        let changed = player.refresh(&PlayerMeta {
            username: Some("ann".into()),
            full_name: Some("Ann Lee".into()),
        });
        assert!(changed);
        assert_eq!(player.username.as_deref(), Some("ann"));
        assert_eq!(player.full_name.as_deref(), Some("Ann Lee"));
    }

    #[test]
    fn refresh_never_erases_known_metadata() {
        let mut player = player();
        assert!(!player.refresh(&PlayerMeta::default()));
        assert_eq!(player.username.as_deref(), Some("ann"));
    }
}
