//! Buzzer arbitration: who pressed first, who answers next, and the admin verdicts.

use tracing::{debug, info};

use crate::{
    dao::{
        models::{ExternalId, GameEntity, ScoreEntry, TeamEntity, TeamId},
        store::Award,
    },
    error::ServiceError,
    services::{
        game_service::{GameRef, ensure_admin, resolve_game},
        scoring_service::scores_of,
    },
    state::{
        SharedState,
        queue::Enqueued,
        state_machine::{GameEvent, GameStatus},
        transitions::{Effects, apply_transition, run_detached},
    },
};

/// Points granted for a correct answer.
pub const CORRECT_ANSWER_POINTS: u32 = 1;

/// How a press was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuzzOutcome {
    /// The team is the first to buzz for this question.
    First,
    /// The team had already buzzed; the queue is unchanged.
    AlreadyQueued {
        /// Existing 1-based position.
        position: usize,
    },
    /// The team joined the queue behind others.
    Queued {
        /// 1-based position.
        position: usize,
    },
}

impl From<Enqueued> for BuzzOutcome {
    fn from(enqueued: Enqueued) -> Self {
        match enqueued {
            Enqueued {
                position,
                newly_added: false,
            } => BuzzOutcome::AlreadyQueued { position },
            Enqueued { position: 1, .. } => BuzzOutcome::First,
            Enqueued { position, .. } => BuzzOutcome::Queued { position },
        }
    }
}

/// Result of a press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuzzResult {
    /// Game the press was recorded in.
    pub game: GameEntity,
    /// Team the player buzzed for.
    pub team: TeamEntity,
    /// How the press was handled.
    pub outcome: BuzzOutcome,
    /// 1-based position of the team in the queue.
    pub position: usize,
}

/// Result of a "correct" verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectOutcome {
    /// Game after the question was closed.
    pub game: GameEntity,
    /// Score table after the award.
    pub scores: Vec<ScoreEntry>,
    /// Team that received the point.
    pub notify_team_id: TeamId,
    /// Head of the queue when the verdict was given.
    pub popped_team_id: Option<TeamId>,
}

/// Result of a "wrong" verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrongOutcome {
    /// Game after the verdict.
    pub game: GameEntity,
    /// Team that answered wrongly.
    pub removed_team_id: TeamId,
    /// Team that answers next, `None` when the queue is exhausted.
    pub next_team_id: Option<TeamId>,
    /// Score table, only when the queue was exhausted and the question closed.
    pub scores: Option<Vec<ScoreEntry>>,
}

impl WrongOutcome {
    /// Whether nobody is left to answer and the question was closed.
    pub fn exhausted(&self) -> bool {
        self.next_team_id.is_none()
    }
}

/// Record a press from `external_id` for its team.
pub async fn press_buzzer(
    state: &SharedState,
    game: GameRef,
    external_id: ExternalId,
) -> Result<BuzzResult, ServiceError> {
    let state = state.clone();
    run_detached(async move {
        let store = state.require_store().await?;
        let _permit = state.enter_round().await;
        let game = resolve_game(&store, game).await?;
        if game.status != GameStatus::Question {
            return Err(ServiceError::NoActiveQuestion);
        }
        let team = store
            .team_of(external_id)
            .await?
            .ok_or(ServiceError::NoTeam)?;
        store.ensure_participants(game.id, vec![team.id]).await?;

        if state.queues().open_if_untracked(game.id, game.version) {
            debug!(game_id = %game.id, "reopened queue of a question left open");
        }
        let enqueued = state
            .queues()
            .enqueue(game.id, game.version, team.id)
            .await?;
        let outcome = BuzzOutcome::from(enqueued);
        debug!(
            game_id = %game.id,
            team_id = %team.id,
            player = external_id,
            position = enqueued.position,
            outcome = ?outcome,
            "buzzer pressed"
        );

        Ok(BuzzResult {
            game,
            team,
            outcome,
            position: enqueued.position,
        })
    })
    .await
}

/// Give the point to `team_id` and close the question.
///
/// The team is taken as given, even when it is not at the head of the queue.
pub async fn admin_mark_correct(
    state: &SharedState,
    game: GameRef,
    actor: ExternalId,
    team_id: TeamId,
) -> Result<CorrectOutcome, ServiceError> {
    ensure_admin(state, actor)?;
    let state = state.clone();
    run_detached(async move {
        let store = state.require_store().await?;
        let gate = state.lock_transitions().await;
        let game = resolve_game(&store, game).await?;
        if game.status != GameStatus::Question {
            return Err(ServiceError::NoActiveQuestion);
        }
        if store.find_team(team_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("team `{team_id}` not found")));
        }

        let popped_team_id = state.queues().snapshot(game.id).await.first().copied();
        let updated = apply_transition(
            &state,
            &gate,
            &store,
            &game,
            GameEvent::FinishQuestion,
            Effects {
                seed_all_teams: false,
                award: Some(Award {
                    team_id,
                    points: CORRECT_ANSWER_POINTS,
                }),
            },
        )
        .await?;
        let scores = scores_of(&store, game.id).await?;
        info!(
            game_id = %game.id,
            team_id = %team_id,
            popped = ?popped_team_id,
            "answer marked correct"
        );

        Ok(CorrectOutcome {
            game: updated,
            scores,
            notify_team_id: team_id,
            popped_team_id,
        })
    })
    .await
}

/// Drop the team at the head of the queue. The question closes once nobody is left.
pub async fn admin_mark_wrong(
    state: &SharedState,
    game: GameRef,
    actor: ExternalId,
) -> Result<WrongOutcome, ServiceError> {
    ensure_admin(state, actor)?;
    let state = state.clone();
    run_detached(async move {
        let store = state.require_store().await?;
        let gate = state.lock_transitions().await;
        let game = resolve_game(&store, game).await?;
        if game.status != GameStatus::Question {
            return Err(ServiceError::NoActiveQuestion);
        }

        let (removed, remaining) = state.queues().dequeue_front(game.id).await;
        let Some(removed_team_id) = removed else {
            return Err(ServiceError::QueueEmpty);
        };
        info!(game_id = %game.id, team_id = %removed_team_id, "answer marked wrong");

        if let Some(next_team_id) = remaining.first().copied() {
            return Ok(WrongOutcome {
                game,
                removed_team_id,
                next_team_id: Some(next_team_id),
                scores: None,
            });
        }

        let event = GameEvent::FinishQuestion;
        let updated =
            match apply_transition(&state, &gate, &store, &game, event, Effects::of(event)).await {
                Ok(updated) => updated,
                Err(err) => {
                    state.queues().requeue_front(game.id, removed_team_id).await;
                    return Err(err);
                }
            };
        let scores = scores_of(&store, game.id).await?;
        Ok(WrongOutcome {
            game: updated,
            removed_team_id,
            next_team_id: None,
            scores: Some(scores),
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_results_map_to_outcomes() {
        let first = Enqueued {
            position: 1,
            newly_added: true,
        };
        let again = Enqueued {
            position: 1,
            newly_added: false,
        };
        let third = Enqueued {
            position: 3,
            newly_added: true,
        };

        assert_eq!(BuzzOutcome::from(first), BuzzOutcome::First);
        assert_eq!(
            BuzzOutcome::from(again),
            BuzzOutcome::AlreadyQueued { position: 1 }
        );
        assert_eq!(BuzzOutcome::from(third), BuzzOutcome::Queued { position: 3 });
    }
}
