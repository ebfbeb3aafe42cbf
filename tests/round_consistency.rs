mod common;

use std::{sync::Arc, time::Duration};

use quiz_buzzer_back::{
    auth::StaticAdminList,
    dao::{
        models::{ExternalId, PlayerMeta, TeamEntity},
        store::BuzzerStore,
    },
    error::ServiceError,
    services::{
        buzzer_service::{self, BuzzOutcome},
        game_service::{self, GameRef},
        roster_service,
    },
    state::{AppState, SharedState, state_machine::GameStatus},
};
use tokio::time::sleep;

use common::ScriptedStore;

const ADMIN: ExternalId = 1;

fn app(store: Arc<ScriptedStore>) -> SharedState {
    AppState::with_store(
        Arc::new(StaticAdminList::new([ADMIN])),
        Duration::from_secs(60),
        store,
    )
}

async fn team(state: &SharedState, player: ExternalId, name: &str) -> TeamEntity {
    roster_service::get_or_create_player(state, player, PlayerMeta::default())
        .await
        .unwrap();
    roster_service::register_team(state, player, name)
        .await
        .unwrap()
}

async fn open_question(state: &SharedState) {
    game_service::admin_start_game(state, GameRef::Active, ADMIN)
        .await
        .unwrap();
    game_service::admin_start_question(state, GameRef::Active, ADMIN)
        .await
        .unwrap();
}

#[tokio::test]
async fn finishing_the_game_waits_for_a_press_in_flight() {
    let store = Arc::new(ScriptedStore::new());
    let state = app(store.clone());
    team(&state, 10, "Alpha").await;
    open_question(&state).await;

    let pause = store.pause_next_team_of();
    let press = tokio::spawn({
        let state = state.clone();
        async move { buzzer_service::press_buzzer(&state, GameRef::Active, 10).await }
    });
    pause.entered.notified().await;

    let finish = tokio::spawn({
        let state = state.clone();
        async move { game_service::admin_finish_game(&state, GameRef::Active, ADMIN).await }
    });
    sleep(Duration::from_millis(50)).await;
    assert!(!finish.is_finished());

    pause.release.notify_one();
    let pressed = press.await.unwrap().unwrap();
    assert_eq!(pressed.outcome, BuzzOutcome::First);
    assert_eq!(pressed.game.status, GameStatus::Question);

    let finished = finish.await.unwrap().unwrap();
    assert_eq!(finished.status, GameStatus::Finished);
    assert!(state.queues().snapshot(finished.id).await.is_empty());
    assert!(!state.queues().is_open(finished.id).await);

    let late = buzzer_service::press_buzzer(&state, GameRef::Id(finished.id), 10)
        .await
        .unwrap_err();
    assert!(matches!(late, ServiceError::NoActiveQuestion));
    assert!(!state.queues().is_open(finished.id).await);
}

#[tokio::test]
async fn press_from_the_previous_question_stays_out_of_the_next_one() {
    let store = Arc::new(ScriptedStore::new());
    let state = app(store.clone());
    team(&state, 10, "Alpha").await;
    open_question(&state).await;

    let pause = store.pause_next_team_of();
    let press = tokio::spawn({
        let state = state.clone();
        async move { buzzer_service::press_buzzer(&state, GameRef::Active, 10).await }
    });
    pause.entered.notified().await;

    let next_question = tokio::spawn({
        let state = state.clone();
        async move {
            game_service::admin_finish_question(&state, GameRef::Active, ADMIN)
                .await
                .unwrap();
            game_service::admin_start_question(&state, GameRef::Active, ADMIN).await
        }
    });
    sleep(Duration::from_millis(50)).await;
    assert!(!next_question.is_finished());

    pause.release.notify_one();
    let pressed = press.await.unwrap().unwrap();
    let reopened = next_question.await.unwrap().unwrap();

    assert_eq!(reopened.status, GameStatus::Question);
    assert!(reopened.version > pressed.game.version);
    assert!(state.queues().snapshot(reopened.id).await.is_empty());
    assert!(state.queues().is_open(reopened.id).await);
}

#[tokio::test]
async fn failed_close_puts_the_wrong_team_back_at_the_head() {
    let store = Arc::new(ScriptedStore::new());
    let state = app(store.clone());
    let alpha = team(&state, 10, "Alpha").await;
    open_question(&state).await;
    let pressed = buzzer_service::press_buzzer(&state, GameRef::Active, 10)
        .await
        .unwrap();
    let game_id = pressed.game.id;

    store.refuse_commits(true);
    let err = buzzer_service::admin_mark_wrong(&state, GameRef::Active, ADMIN)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unavailable(_)));

    assert_eq!(state.queues().snapshot(game_id).await, vec![alpha.id]);
    assert!(state.queues().is_open(game_id).await);
    let stored = store.find_game(game_id).await.unwrap().unwrap();
    assert_eq!(stored.status, GameStatus::Question);
    assert_eq!(stored.version, pressed.game.version);

    store.refuse_commits(false);
    let wrong = buzzer_service::admin_mark_wrong(&state, GameRef::Active, ADMIN)
        .await
        .unwrap();
    assert!(wrong.exhausted());
    assert_eq!(wrong.removed_team_id, alpha.id);
    assert_eq!(wrong.game.status, GameStatus::Running);
}

#[tokio::test]
async fn failed_correct_keeps_queue_and_scores() {
    let store = Arc::new(ScriptedStore::new());
    let state = app(store.clone());
    let alpha = team(&state, 10, "Alpha").await;
    open_question(&state).await;
    let pressed = buzzer_service::press_buzzer(&state, GameRef::Active, 10)
        .await
        .unwrap();
    let game_id = pressed.game.id;

    store.refuse_commits(true);
    let err = buzzer_service::admin_mark_correct(&state, GameRef::Active, ADMIN, alpha.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unavailable(_)));

    assert_eq!(state.queues().snapshot(game_id).await, vec![alpha.id]);
    let scores = store.scores(game_id).await.unwrap();
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].score, 0);
}
