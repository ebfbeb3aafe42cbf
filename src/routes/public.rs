use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::{
        admin::GameQuery,
        common::{GameSummary, score_rows},
        public::{GameStatusResponse, ScoresResponse},
    },
    error::{AppError, ErrorBody, ServiceError},
    services::{game_service, scoring_service},
    state::SharedState,
};

/// Public read-only endpoints that expose the current game state.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/public/game", get(get_game_status))
        .route("/public/scores", get(get_scores))
}

#[utoipa::path(
    get,
    path = "/public/game",
    tag = "public",
    responses((status = 200, description = "Status of the active game", body = GameStatusResponse))
)]
/// Return the status of the active game, `none` when there is none or storage is down.
pub async fn get_game_status(
    State(state): State<SharedState>,
) -> Result<Json<GameStatusResponse>, AppError> {
    let game = match game_service::active_game(&state).await {
        Ok(game) => game,
        Err(ServiceError::Degraded) => None,
        Err(err) => return Err(err.into()),
    };

    Ok(Json(GameStatusResponse {
        status: game_service::status_label(game.as_ref()).to_string(),
        game: game.as_ref().map(GameSummary::from),
        degraded: state.is_degraded(),
    }))
}

#[utoipa::path(
    get,
    path = "/public/scores",
    tag = "public",
    params(GameQuery),
    responses(
        (status = 200, description = "Scoreboard, best team first", body = ScoresResponse),
        (status = 404, description = "No active game or unknown game id", body = ErrorBody)
    )
)]
/// Return the scoreboard of the active game or of `game_id`.
pub async fn get_scores(
    State(state): State<SharedState>,
    Query(query): Query<GameQuery>,
) -> Result<Json<ScoresResponse>, AppError> {
    let (game, scores) = scoring_service::scores(&state, query.game_ref()).await?;

    Ok(Json(ScoresResponse {
        game_id: game.id,
        scores: score_rows(scores),
    }))
}
