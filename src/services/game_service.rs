//! Game lifecycle driven by admins: session bootstrap, start, questions and finish.
//! Every transition runs under the transition gate and commits atomically.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    dao::{
        models::{ExternalId, GameEntity, GameId, PlayerEntity, PlayerMeta, TeamEntity},
        store::{BuzzerStore, GameCreation},
    },
    error::ServiceError,
    state::{
        SharedState,
        state_machine::{GameEvent, GameStatus},
        transitions::{Effects, apply_transition, run_detached},
    },
};

/// Label reported when no game is in progress.
pub const NO_GAME_LABEL: &str = "none";

/// Which game an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameRef {
    /// The single non-finished game.
    #[default]
    Active,
    /// A game by id, finished or not.
    Id(GameId),
}

impl From<Option<GameId>> for GameRef {
    fn from(id: Option<GameId>) -> Self {
        id.map_or(GameRef::Active, GameRef::Id)
    }
}

/// Load the referenced game.
pub async fn resolve_game(
    store: &Arc<dyn BuzzerStore>,
    game: GameRef,
) -> Result<GameEntity, ServiceError> {
    match game {
        GameRef::Active => store.active_game().await?.ok_or(ServiceError::NoActiveGame),
        GameRef::Id(id) => store
            .find_game(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("game `{id}` not found"))),
    }
}

/// Fail with [`ServiceError::NotAuthorized`] unless `actor` is an admin.
pub fn ensure_admin(state: &SharedState, actor: ExternalId) -> Result<(), ServiceError> {
    if state.admins().is_admin(actor) {
        Ok(())
    } else {
        debug!(actor, "admin action refused");
        Err(ServiceError::NotAuthorized)
    }
}

/// Label of the active game status, `none` when there is no active game.
pub fn status_label(game: Option<&GameEntity>) -> &'static str {
    game.map_or(NO_GAME_LABEL, |game| game.status.label())
}

async fn create_or_adopt(
    store: &Arc<dyn BuzzerStore>,
    actor: ExternalId,
) -> Result<GameEntity, ServiceError> {
    match store.create_game(actor).await? {
        GameCreation::Created(game) => {
            info!(game_id = %game.id, owner = actor, "game created");
            Ok(game)
        }
        GameCreation::ActiveExists(game) => Ok(game),
    }
}

/// Open the admin panel: make sure a game exists and return it.
pub async fn admin_session(
    state: &SharedState,
    actor: ExternalId,
) -> Result<GameEntity, ServiceError> {
    ensure_admin(state, actor)?;
    let state = state.clone();
    run_detached(async move {
        let store = state.require_store().await?;
        let _gate = state.lock_transitions().await;
        create_or_adopt(&store, actor).await
    })
    .await
}

/// Start the game, creating it when none is active. The acting admin becomes its owner.
pub async fn admin_start_game(
    state: &SharedState,
    game: GameRef,
    actor: ExternalId,
) -> Result<GameEntity, ServiceError> {
    ensure_admin(state, actor)?;
    let state = state.clone();
    run_detached(async move {
        let store = state.require_store().await?;
        let gate = state.lock_transitions().await;

        let current = match game {
            GameRef::Active => create_or_adopt(&store, actor).await?,
            GameRef::Id(_) => resolve_game(&store, game).await?,
        };
        let current = if current.owner_id == actor {
            current
        } else {
            let reassigned = store.reassign_owner(current.id, actor).await?;
            info!(game_id = %current.id, owner = actor, "game ownership reassigned");
            reassigned.ok_or_else(|| ServiceError::NotFound(format!("game `{}`", current.id)))?
        };

        apply_transition(
            &state,
            &gate,
            &store,
            &current,
            GameEvent::StartGame,
            Effects::of(GameEvent::StartGame),
        )
        .await
    })
    .await
}

async fn admin_transition(
    state: &SharedState,
    game: GameRef,
    actor: ExternalId,
    event: GameEvent,
) -> Result<GameEntity, ServiceError> {
    ensure_admin(state, actor)?;
    let state = state.clone();
    run_detached(async move {
        let store = state.require_store().await?;
        let gate = state.lock_transitions().await;
        let current = resolve_game(&store, game).await?;
        apply_transition(&state, &gate, &store, &current, event, Effects::of(event)).await
    })
    .await
}

/// Open a new question with an empty queue.
pub async fn admin_start_question(
    state: &SharedState,
    game: GameRef,
    actor: ExternalId,
) -> Result<GameEntity, ServiceError> {
    admin_transition(state, game, actor, GameEvent::StartQuestion).await
}

/// Close the current question without awarding anything.
pub async fn admin_finish_question(
    state: &SharedState,
    game: GameRef,
    actor: ExternalId,
) -> Result<GameEntity, ServiceError> {
    admin_transition(state, game, actor, GameEvent::FinishQuestion).await
}

/// End the game.
pub async fn admin_finish_game(
    state: &SharedState,
    game: GameRef,
    actor: ExternalId,
) -> Result<GameEntity, ServiceError> {
    admin_transition(state, game, actor, GameEvent::FinishGame).await
}

/// Teams currently queued, head first.
pub async fn admin_queue(
    state: &SharedState,
    game: GameRef,
    actor: ExternalId,
) -> Result<(GameEntity, Vec<TeamEntity>), ServiceError> {
    ensure_admin(state, actor)?;
    let store = state.require_store().await?;
    let current = resolve_game(&store, game).await?;
    let order = state.queues().snapshot(current.id).await;
    let teams = store.teams_by_ids(order).await?;
    Ok((current, teams))
}

/// What a player sees when opening the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStatus {
    /// The player, created on first contact.
    pub player: PlayerEntity,
    /// Team of the player, if registered.
    pub team: Option<TeamEntity>,
    /// Active game, if any.
    pub game: Option<GameEntity>,
    /// Status label of the active game (`none` without one).
    pub label: &'static str,
    /// Whether pressing the buzzer would currently be accepted.
    pub can_buzz: bool,
}

/// Upsert the player and describe what they can do right now.
pub async fn player_status(
    state: &SharedState,
    external_id: ExternalId,
    meta: PlayerMeta,
) -> Result<PlayerStatus, ServiceError> {
    let store = state.require_store().await?;
    let player = store.upsert_player(external_id, meta).await?;
    let team = store.team_of(external_id).await?;
    let game = store.active_game().await?;

    let label = status_label(game.as_ref());
    let can_buzz = team.is_some()
        && game
            .as_ref()
            .is_some_and(|game| game.status == GameStatus::Question);

    Ok(PlayerStatus {
        player,
        team,
        game,
        label,
        can_buzz,
    })
}

/// Active game, if any, for read-only projections.
pub async fn active_game(state: &SharedState) -> Result<Option<GameEntity>, ServiceError> {
    let store = state.require_store().await?;
    Ok(store.active_game().await?)
}
