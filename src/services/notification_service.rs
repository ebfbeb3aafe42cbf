//! Turns service results into notifications on the SSE hub.
//!
//! Delivery is best effort: a failure to resolve recipients is logged and never
//! fails the request that produced the result.

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    dao::models::{ExternalId, GameEntity, ScoreEntry, TeamId},
    dto::{
        common::{GameSummary, score_rows},
        sse::{
            AnswerCorrectEvent, AnswerWrongEvent, Audience, FirstBuzzEvent, GameFinishedEvent,
            GameStartedEvent, NextTurnEvent, QuestionStartedEvent, ServerEvent, SystemStatus,
        },
    },
    error::ServiceError,
    services::{
        buzzer_service::{BuzzOutcome, BuzzResult, CorrectOutcome, WrongOutcome},
        roster_service::{self, PlayerFilter},
    },
    state::SharedState,
};

const EVENT_SYSTEM_STATUS: &str = "system.status";
const EVENT_GAME_STARTED: &str = "game.started";
const EVENT_REGISTRATION_INVITE: &str = "game.started.register";
const EVENT_QUESTION_STARTED: &str = "question.started";
const EVENT_FIRST_BUZZ: &str = "buzz.first";
const EVENT_ANSWER_CORRECT: &str = "answer.correct";
const EVENT_ANSWER_WRONG: &str = "answer.wrong";
const EVENT_NEXT_TURN: &str = "turn.next";
const EVENT_GAME_FINISHED: &str = "game.finished";

fn send_event<T: Serialize>(state: &SharedState, audience: Audience, event: &str, payload: &T) {
    match ServerEvent::json(audience, Some(event.to_string()), payload) {
        Ok(message) => {
            let streams = state.notifications().broadcast(message);
            debug!(event, streams, "notification published");
        }
        Err(err) => warn!(event, error = %err, "failed to serialise notification"),
    }
}

async fn team_members(
    state: &SharedState,
    team_id: TeamId,
) -> Result<Vec<ExternalId>, ServiceError> {
    Ok(roster_service::members_of(state, team_id)
        .await?
        .into_iter()
        .map(|player| player.external_id)
        .collect())
}

async fn player_ids(
    state: &SharedState,
    filter: PlayerFilter,
) -> Result<Vec<ExternalId>, ServiceError> {
    Ok(roster_service::list_players(state, filter)
        .await?
        .into_iter()
        .map(|player| player.external_id)
        .collect())
}

fn log_failure(event: &str, result: Result<(), ServiceError>) {
    if let Err(err) = result {
        warn!(event, error = %err, "failed to resolve notification recipients");
    }
}

/// Broadcast the degraded flag to everyone.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_event(
        state,
        Audience::Everyone,
        EVENT_SYSTEM_STATUS,
        &SystemStatus { degraded },
    );
}

/// Forward every degraded-mode change to subscribers until the state is dropped.
pub async fn forward_degraded_changes(state: SharedState) {
    let mut watcher = state.degraded_watcher();
    while watcher.changed().await.is_ok() {
        let degraded = *watcher.borrow_and_update();
        debug!(degraded, "degraded flag changed");
        broadcast_system_status(&state, degraded);
    }
}

/// Tell the host and the team that the team buzzed first.
pub async fn notify_buzz(state: &SharedState, result: &BuzzResult) {
    if result.outcome != BuzzOutcome::First {
        return;
    }
    let outcome = async {
        let mut recipients = team_members(state, result.team.id).await?;
        recipients.push(result.game.owner_id);
        send_event(
            state,
            Audience::users(recipients),
            EVENT_FIRST_BUZZ,
            &FirstBuzzEvent {
                game_id: result.game.id,
                team: result.team.clone().into(),
            },
        );
        Ok::<(), ServiceError>(())
    }
    .await;
    log_failure(EVENT_FIRST_BUZZ, outcome);
}

/// Tell the rewarded team its answer was accepted.
pub async fn notify_correct(state: &SharedState, outcome: &CorrectOutcome) {
    let result = async {
        let recipients = team_members(state, outcome.notify_team_id).await?;
        send_event(
            state,
            Audience::users(recipients),
            EVENT_ANSWER_CORRECT,
            &AnswerCorrectEvent {
                game_id: outcome.game.id,
                team_id: outcome.notify_team_id,
                scores: score_rows(outcome.scores.clone()),
            },
        );
        Ok::<(), ServiceError>(())
    }
    .await;
    log_failure(EVENT_ANSWER_CORRECT, result);
}

/// Tell the removed team, the next team and the host what happened.
pub async fn notify_wrong(state: &SharedState, outcome: &WrongOutcome) {
    let result = async {
        let removed = team_members(state, outcome.removed_team_id).await?;
        send_event(
            state,
            Audience::users(removed),
            EVENT_ANSWER_WRONG,
            &AnswerWrongEvent {
                game_id: outcome.game.id,
                team_id: outcome.removed_team_id,
            },
        );

        let mut recipients = match outcome.next_team_id {
            Some(next) => team_members(state, next).await?,
            None => Vec::new(),
        };
        recipients.push(outcome.game.owner_id);
        send_event(
            state,
            Audience::users(recipients),
            EVENT_NEXT_TURN,
            &NextTurnEvent {
                game_id: outcome.game.id,
                team_id: outcome.next_team_id,
                scores: outcome.scores.clone().map(score_rows),
            },
        );
        Ok::<(), ServiceError>(())
    }
    .await;
    log_failure(EVENT_ANSWER_WRONG, result);
}

/// Announce the start to registered players and invite the others to register.
pub async fn notify_game_started(state: &SharedState, game: &GameEntity) {
    let result = async {
        let with_team = player_ids(state, PlayerFilter::WithTeam).await?;
        let without_team = player_ids(state, PlayerFilter::WithoutTeam).await?;
        let summary = GameSummary::from(game);

        send_event(
            state,
            Audience::users(with_team),
            EVENT_GAME_STARTED,
            &GameStartedEvent {
                game: summary.clone(),
                has_team: true,
            },
        );
        send_event(
            state,
            Audience::users(without_team),
            EVENT_REGISTRATION_INVITE,
            &GameStartedEvent {
                game: summary,
                has_team: false,
            },
        );
        Ok::<(), ServiceError>(())
    }
    .await;
    log_failure(EVENT_GAME_STARTED, result);
}

/// Tell players with a team that they may buzz.
pub async fn notify_question_started(state: &SharedState, game: &GameEntity) {
    let result = async {
        let with_team = player_ids(state, PlayerFilter::WithTeam).await?;
        send_event(
            state,
            Audience::users(with_team),
            EVENT_QUESTION_STARTED,
            &QuestionStartedEvent { game_id: game.id },
        );
        Ok::<(), ServiceError>(())
    }
    .await;
    log_failure(EVENT_QUESTION_STARTED, result);
}

/// Announce the final table to everyone.
pub fn notify_game_finished(state: &SharedState, game: &GameEntity, scores: Vec<ScoreEntry>) {
    send_event(
        state,
        Audience::Everyone,
        EVENT_GAME_FINISHED,
        &GameFinishedEvent {
            game: game.into(),
            scores: score_rows(scores),
        },
    );
}
