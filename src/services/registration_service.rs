//! Two-step team registration: the player asks to register, then sends the name as text.

use tracing::debug;

use crate::{
    dao::models::{ExternalId, TeamEntity},
    error::ServiceError,
    services::roster_service,
    state::{SharedState, interaction::Intent},
};

/// Remember that the next text of the player is a team name.
pub async fn begin_registration(
    state: &SharedState,
    external_id: ExternalId,
) -> Result<(), ServiceError> {
    if let Some(team) = roster_service::team_of(state, external_id).await? {
        return Err(ServiceError::AlreadyOnTeam {
            team_name: team.name,
        });
    }
    state
        .interactions()
        .begin(external_id, Intent::AwaitingTeamName);
    debug!(player = external_id, "awaiting team name");
    Ok(())
}

/// Handle free text from a player.
///
/// Returns `Ok(None)` when nothing was pending. A pending intent is consumed on
/// success and when the player turns out to already have a team; any other
/// failure keeps it so the player can send another name.
pub async fn submit_text(
    state: &SharedState,
    external_id: ExternalId,
    text: &str,
) -> Result<Option<TeamEntity>, ServiceError> {
    match state.interactions().current(external_id) {
        Some(Intent::AwaitingTeamName) => {}
        None => return Ok(None),
    }

    match roster_service::register_team(state, external_id, text).await {
        Ok(team) => {
            state.interactions().clear(external_id);
            Ok(Some(team))
        }
        Err(err @ ServiceError::AlreadyOnTeam { .. }) => {
            state.interactions().clear(external_id);
            Err(err)
        }
        Err(err) => Err(err),
    }
}

/// Abandon a pending registration.
pub fn cancel_registration(state: &SharedState, external_id: ExternalId) -> bool {
    state.interactions().clear(external_id)
}
