//! Players, teams and memberships.

use tracing::{debug, info};

use crate::{
    dao::{
        models::{ExternalId, PlayerEntity, PlayerMeta, TeamEntity, TeamId},
        store::Registration,
    },
    error::ServiceError,
    state::{SharedState, transitions::run_detached},
};

/// Longest accepted team name, in characters, after trimming.
pub const MAX_TEAM_NAME_CHARS: usize = 120;

/// Trim `raw` and check it can be used as a team name.
pub fn normalize_team_name(raw: &str) -> Result<String, ServiceError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidName(
            "team name cannot be empty".into(),
        ));
    }
    if name.chars().count() > MAX_TEAM_NAME_CHARS {
        return Err(ServiceError::InvalidName(format!(
            "team name cannot exceed {MAX_TEAM_NAME_CHARS} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(ServiceError::InvalidName(
            "team name cannot contain control characters".into(),
        ));
    }
    Ok(name.to_string())
}

/// Insert the player on first contact, refreshing metadata afterwards.
pub async fn get_or_create_player(
    state: &SharedState,
    external_id: ExternalId,
    meta: PlayerMeta,
) -> Result<PlayerEntity, ServiceError> {
    let store = state.require_store().await?;
    Ok(store.upsert_player(external_id, meta).await?)
}

/// Create a team named `name` with the player as its first member.
///
/// When a game is in progress the new team immediately gets a score row in it.
pub async fn register_team(
    state: &SharedState,
    external_id: ExternalId,
    name: &str,
) -> Result<TeamEntity, ServiceError> {
    let raw = name.to_string();
    let state = state.clone();
    run_detached(async move {
        let store = state.require_store().await?;
        if let Some(team) = store.team_of(external_id).await? {
            return Err(ServiceError::AlreadyOnTeam {
                team_name: team.name,
            });
        }
        let name = normalize_team_name(&raw)?;
        let team = match store.register_team(external_id, name.clone()).await? {
            Registration::Created(team) => team,
            Registration::AlreadyOnTeam(team) => {
                return Err(ServiceError::AlreadyOnTeam {
                    team_name: team.name,
                });
            }
            Registration::DuplicateName(_) => {
                return Err(ServiceError::DuplicateTeamName { name });
            }
        };
        info!(team_id = %team.id, player = external_id, name = %team.name, "team registered");

        if let Some(game) = store.active_game().await? {
            store.ensure_participants(game.id, vec![team.id]).await?;
            debug!(game_id = %game.id, team_id = %team.id, "late team joined the scoreboard");
        }
        Ok(team)
    })
    .await
}

/// Stored player, if they ever interacted.
pub async fn find_player(
    state: &SharedState,
    external_id: ExternalId,
) -> Result<Option<PlayerEntity>, ServiceError> {
    let store = state.require_store().await?;
    Ok(store.find_player(external_id).await?)
}

/// Team of the player, if any.
pub async fn team_of(
    state: &SharedState,
    external_id: ExternalId,
) -> Result<Option<TeamEntity>, ServiceError> {
    let store = state.require_store().await?;
    Ok(store.team_of(external_id).await?)
}

/// Members of a team in join order.
pub async fn members_of(
    state: &SharedState,
    team_id: TeamId,
) -> Result<Vec<PlayerEntity>, ServiceError> {
    let store = state.require_store().await?;
    if store.find_team(team_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("team `{team_id}` not found")));
    }
    Ok(store.members_of(team_id).await?)
}

/// Subset of players to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerFilter {
    /// Everyone who ever interacted.
    #[default]
    All,
    /// Players registered in a team.
    WithTeam,
    /// Players not registered in any team.
    WithoutTeam,
}

/// Players matching `filter`, in first-interaction order.
pub async fn list_players(
    state: &SharedState,
    filter: PlayerFilter,
) -> Result<Vec<PlayerEntity>, ServiceError> {
    let store = state.require_store().await?;
    let players = match filter {
        PlayerFilter::All => store.list_players().await?,
        PlayerFilter::WithoutTeam => store.players_without_team().await?,
        PlayerFilter::WithTeam => {
            let loners: Vec<ExternalId> = store
                .players_without_team()
                .await?
                .into_iter()
                .map(|player| player.external_id)
                .collect();
            store
                .list_players()
                .await?
                .into_iter()
                .filter(|player| !loners.contains(&player.external_id))
                .collect()
        }
    };
    Ok(players)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed() {
        assert_eq!(normalize_team_name("  Nova \n").unwrap(), "Nova");
    }

    #[test]
    fn blank_or_oversized_names_are_rejected() {
        assert!(matches!(
            normalize_team_name("   "),
            Err(ServiceError::InvalidName(_))
        ));
        let long = "x".repeat(MAX_TEAM_NAME_CHARS + 1);
        assert!(matches!(
            normalize_team_name(&long),
            Err(ServiceError::InvalidName(_))
        ));
        assert!(normalize_team_name(&"é".repeat(MAX_TEAM_NAME_CHARS)).is_ok());
    }

    #[test]
    fn control_characters_are_rejected() {
        assert!(normalize_team_name("No\u{7}va").is_err());
    }
}
