use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Created, not started yet.
    Idle,
    /// Started, between questions.
    Running,
    /// A question is open; players may buzz in.
    Question,
    /// Ended; kept for history only.
    Finished,
}

impl GameStatus {
    /// Stable label shown to players and admins.
    pub fn label(self) -> &'static str {
        match self {
            GameStatus::Idle => "idle",
            GameStatus::Running => "running",
            GameStatus::Question => "question",
            GameStatus::Finished => "finished",
        }
    }
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Admin starts (or restarts) the game.
    StartGame,
    /// Admin opens a new question.
    StartQuestion,
    /// The current question is closed, by an admin or by a verdict.
    FinishQuestion,
    /// Admin ends the game.
    FinishGame,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The status the game was in when the event was received.
    pub from: GameStatus,
    /// The event that cannot be applied from this status.
    pub event: GameEvent,
}

/// Errors that can occur when applying a planned transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// Status changed since the plan was created.
    #[error("game status changed from {expected:?} to {actual:?} while the transition was pending")]
    PhaseMismatch {
        /// Status when the plan was created.
        expected: GameStatus,
        /// Current status.
        actual: GameStatus,
    },
    /// Version changed since the plan was created.
    #[error("game version moved to {actual} while version {expected} was expected")]
    VersionMismatch {
        /// Version the plan was built against.
        expected: u64,
        /// Current version.
        actual: u64,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A transition that has been validated but not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Unique identifier for this plan, used in logs.
    pub id: PlanId,
    /// Status the game is in.
    pub from: GameStatus,
    /// Status the game will be in once committed.
    pub to: GameStatus,
    /// Event that triggered this transition.
    pub event: GameEvent,
    /// Version the game was read at.
    pub version: u64,
    /// Version number after applying this transition.
    pub version_next: u64,
}

/// State machine of a single game, rebuilt from the stored status and version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameStateMachine {
    status: GameStatus,
    version: u64,
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameStateMachine {
    /// Fresh machine for a newly created game.
    pub fn new() -> Self {
        Self::resume(GameStatus::Idle, 0)
    }

    /// Machine positioned at a persisted status and version.
    pub fn resume(status: GameStatus, version: u64) -> Self {
        Self { status, version }
    }

    /// Current status.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Number of transitions committed so far.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Validate `event` against the current status and describe the resulting transition.
    pub fn plan(&self, event: GameEvent) -> Result<Plan, InvalidTransition> {
        let to = self.compute_transition(event)?;
        Ok(Plan {
            id: Uuid::new_v4(),
            from: self.status,
            to,
            event,
            version: self.version,
            version_next: self.version + 1,
        })
    }

    /// Apply a plan, refusing it when the machine moved on since it was built.
    pub fn apply(&mut self, plan: &Plan) -> Result<GameStatus, ApplyError> {
        if self.status != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.status,
            });
        }
        if self.version != plan.version {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version,
                actual: self.version,
            });
        }

        self.status = plan.to;
        self.version = plan.version_next;
        Ok(self.status)
    }

    fn compute_transition(&self, event: GameEvent) -> Result<GameStatus, InvalidTransition> {
        let next = match (self.status, event) {
            (GameStatus::Idle | GameStatus::Finished, GameEvent::StartGame) => GameStatus::Running,
            (GameStatus::Running | GameStatus::Question, GameEvent::StartQuestion) => {
                GameStatus::Question
            }
            (GameStatus::Question, GameEvent::FinishQuestion) => GameStatus::Running,
            (
                GameStatus::Idle | GameStatus::Running | GameStatus::Question,
                GameEvent::FinishGame,
            ) => GameStatus::Finished,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut GameStateMachine, event: GameEvent) -> GameStatus {
        let plan = sm.plan(event).unwrap();
        sm.apply(&plan).unwrap()
    }

    #[test]
    fn initial_state_is_idle() {
        let sm = GameStateMachine::new();
        assert_eq!(sm.status(), GameStatus::Idle);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn full_happy_path_through_game() {
        let mut sm = GameStateMachine::new();

        assert_eq!(apply(&mut sm, GameEvent::StartGame), GameStatus::Running);
        assert_eq!(apply(&mut sm, GameEvent::StartQuestion), GameStatus::Question);
        assert_eq!(apply(&mut sm, GameEvent::StartQuestion), GameStatus::Question);
        assert_eq!(apply(&mut sm, GameEvent::FinishQuestion), GameStatus::Running);
        assert_eq!(apply(&mut sm, GameEvent::FinishGame), GameStatus::Finished);
        assert_eq!(sm.version(), 5);
    }

    #[test]
    fn finished_game_can_be_restarted() {
        let mut sm = GameStateMachine::resume(GameStatus::Finished, 9);
        assert_eq!(apply(&mut sm, GameEvent::StartGame), GameStatus::Running);
        assert_eq!(sm.version(), 10);
    }

    #[test]
    fn question_cannot_start_after_finish() {
        let mut sm = GameStateMachine::resume(GameStatus::Question, 3);
        apply(&mut sm, GameEvent::FinishGame);

        let err = sm.plan(GameEvent::StartQuestion).unwrap_err();
        assert_eq!(
            err,
            InvalidTransition {
                from: GameStatus::Finished,
                event: GameEvent::StartQuestion,
            }
        );
    }

    #[test]
    fn invalid_transition_returns_error() {
        let sm = GameStateMachine::new();
        for event in [GameEvent::StartQuestion, GameEvent::FinishQuestion] {
            let err = sm.plan(event).unwrap_err();
            assert_eq!(err.from, GameStatus::Idle);
            assert_eq!(err.event, event);
        }
        let running = GameStateMachine::resume(GameStatus::Running, 1);
        assert!(running.plan(GameEvent::StartGame).is_err());
    }

    #[test]
    fn stale_plan_is_rejected() {
        let mut sm = GameStateMachine::new();
        let stale = sm.plan(GameEvent::StartGame).unwrap();
        apply(&mut sm, GameEvent::StartGame);

        let err = sm.apply(&stale).unwrap_err();
        assert_eq!(
            err,
            ApplyError::PhaseMismatch {
                expected: GameStatus::Idle,
                actual: GameStatus::Running,
            }
        );
    }
}
