use std::sync::Arc;

use tracing::info;

use crate::{
    dao::{
        models::{ExternalId, GameEntity, GameId, ScoreEntry, TeamId},
        store::BuzzerStore,
    },
    error::ServiceError,
    services::game_service::{GameRef, ensure_admin, resolve_game},
    state::{SharedState, transitions::run_detached},
};

/// Add `points` to a team, creating its score row when needed. Returns the new total.
pub async fn award(
    state: &SharedState,
    game: GameRef,
    team_id: TeamId,
    points: u32,
) -> Result<u32, ServiceError> {
    if points == 0 {
        return Err(ServiceError::InvalidInput(
            "points must be at least 1".into(),
        ));
    }
    let state = state.clone();
    run_detached(async move {
        let store = state.require_store().await?;
        let game = resolve_game(&store, game).await?;
        if store.find_team(team_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("team `{team_id}` not found")));
        }
        let total = store.award(game.id, team_id, points).await?;
        info!(game_id = %game.id, team_id = %team_id, points, total, "points awarded");
        Ok(total)
    })
    .await
}

/// [`award`] restricted to admins, used for manual score corrections.
pub async fn admin_award(
    state: &SharedState,
    game: GameRef,
    actor: ExternalId,
    team_id: TeamId,
    points: u32,
) -> Result<u32, ServiceError> {
    ensure_admin(state, actor)?;
    award(state, game, team_id, points).await
}

/// The referenced game with its ranked score table.
pub async fn scores(
    state: &SharedState,
    game: GameRef,
) -> Result<(GameEntity, Vec<ScoreEntry>), ServiceError> {
    let store = state.require_store().await?;
    let game = resolve_game(&store, game).await?;
    let scores = scores_of(&store, game.id).await?;
    Ok((game, scores))
}

/// Score table sorted by score descending, then team name ascending.
pub async fn scores_of(
    store: &Arc<dyn BuzzerStore>,
    game_id: GameId,
) -> Result<Vec<ScoreEntry>, ServiceError> {
    Ok(store.scores(game_id).await?)
}
