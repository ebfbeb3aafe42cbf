use std::{future::Future, sync::Arc, time::SystemTime};

use tokio::sync::{RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

use crate::{
    dao::{
        models::GameEntity,
        store::{Award, BuzzerStore, ChangeSet, CommitOutcome},
    },
    error::ServiceError,
    state::{
        AppState,
        state_machine::{ApplyError, GameEvent, GameStateMachine, GameStatus},
    },
};

/// Proof that the caller holds the transition gate exclusively. Only one transition
/// runs at a time, and never while a press is in flight.
pub struct TransitionGate<'a> {
    _guard: RwLockWriteGuard<'a, ()>,
}

impl<'a> TransitionGate<'a> {
    pub(super) fn new(guard: RwLockWriteGuard<'a, ()>) -> Self {
        Self { _guard: guard }
    }
}

/// Shared hold on the transition gate taken by presses.
///
/// While it is alive the game status read by the holder cannot change, so the
/// status check and the enqueue belong to the same question. Presses do not
/// exclude each other; the round queue orders them.
pub struct RoundPermit<'a> {
    _guard: RwLockReadGuard<'a, ()>,
}

impl<'a> RoundPermit<'a> {
    pub(super) fn new(guard: RwLockReadGuard<'a, ()>) -> Self {
        Self { _guard: guard }
    }
}

/// Durable side effects committed together with a transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Effects {
    /// Create a zero-score participant for every known team.
    pub seed_all_teams: bool,
    /// Points granted in the same commit.
    pub award: Option<Award>,
}

impl Effects {
    /// Effects of the event itself, without any award.
    pub fn of(event: GameEvent) -> Self {
        Self {
            seed_all_teams: event == GameEvent::StartGame,
            award: None,
        }
    }
}

/// Plan `event` against `game`, commit it with `effects` and sync the round queue.
///
/// The commit is rejected when the stored game no longer matches the version the
/// plan was built from. Leaving the question phase closes the queue before the
/// commit so no press can slip in once the question is over; a failed commit
/// reopens it untouched.
pub async fn apply_transition(
    state: &AppState,
    _gate: &TransitionGate<'_>,
    store: &Arc<dyn BuzzerStore>,
    game: &GameEntity,
    event: GameEvent,
    effects: Effects,
) -> Result<GameEntity, ServiceError> {
    let mut machine = GameStateMachine::resume(game.status, game.version);
    let plan = machine.plan(event)?;

    let next = GameEntity {
        status: plan.to,
        version: plan.version_next,
        finished_at: match (plan.to, event) {
            (GameStatus::Finished, _) => Some(SystemTime::now()),
            (_, GameEvent::StartGame) => None,
            _ => game.finished_at,
        },
        ..game.clone()
    };

    let leaves_question = plan.from == GameStatus::Question && plan.to != GameStatus::Question;
    if leaves_question {
        state.queues().set_accepting(game.id, false).await;
    }

    let outcome = store
        .commit(ChangeSet {
            game: next,
            expected_version: plan.version,
            seed_all_teams: effects.seed_all_teams,
            award: effects.award,
        })
        .await;

    let failure = match outcome {
        Ok(CommitOutcome::Applied(stored)) => {
            machine.apply(&plan)?;
            sync_queue(state, &stored).await;
            info!(
                game_id = %stored.id,
                plan_id = %plan.id,
                event = ?event,
                from = plan.from.label(),
                to = plan.to.label(),
                version = stored.version,
                "game transition committed"
            );
            return Ok(stored);
        }
        Ok(CommitOutcome::Stale { expected, actual }) => {
            ApplyError::VersionMismatch { expected, actual }.into()
        }
        Ok(CommitOutcome::ActiveExists(active)) => ServiceError::InvalidStateTransition(format!(
            "game {} is still in progress",
            active.id
        )),
        Ok(CommitOutcome::MissingGame) => ServiceError::NotFound(format!("game {}", game.id)),
        Err(err) => err.into(),
    };

    if leaves_question {
        state.queues().set_accepting(game.id, true).await;
    }
    warn!(
        game_id = %game.id,
        plan_id = %plan.id,
        event = ?event,
        error = %failure,
        "game transition aborted"
    );
    Err(failure)
}

async fn sync_queue(state: &AppState, game: &GameEntity) {
    let queues = state.queues();
    match game.status {
        GameStatus::Question => queues.open(game.id, game.version).await,
        GameStatus::Finished => {
            queues.reset(game.id).await;
            queues.evict(game.id);
        }
        GameStatus::Idle | GameStatus::Running => queues.reset(game.id).await,
    }
}

/// Run a service mutation on its own task so that dropping the caller
/// (e.g. an aborted HTTP request) cannot interrupt it halfway.
pub async fn run_detached<F, T>(work: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work).await?
}
