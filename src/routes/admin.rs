use axum::{
    Extension, Json, Router,
    body::Body,
    extract::{Query, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_valid::Valid;
use tracing::debug;

use crate::{
    dao::models::ExternalId,
    dto::{
        admin::{
            AwardRequest, AwardResponse, CorrectRequest, CorrectResponse, GameQuery,
            GameScoresResponse, PlayersQuery, PlayersResponse, QueueResponse, WrongResponse,
        },
        common::{GameSummary, PlayerSummary, TeamSummary, score_rows},
    },
    error::{AppError, ErrorBody},
    services::{
        buzzer_service,
        game_service::{self, GameRef},
        notification_service, roster_service, scoring_service,
    },
    state::SharedState,
};

const USER_ID_HEADER: &str = "x-user-id";

/// Identity of the caller of an admin endpoint, taken from the `x-user-id` header.
///
/// Whether that identity is actually an admin is decided by the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminActor(pub ExternalId);

/// Admin-only endpoints used by the host to drive the game.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/admin/session", post(open_session))
        .route("/admin/game/start", post(start_game))
        .route("/admin/game/question", post(start_question))
        .route("/admin/game/question/finish", post(finish_question))
        .route("/admin/game/finish", post(finish_game))
        .route("/admin/game/correct", post(mark_correct))
        .route("/admin/game/wrong", post(mark_wrong))
        .route("/admin/game/queue", get(get_queue))
        .route("/admin/game/scores", get(get_scores))
        .route("/admin/game/award", post(award_points))
        .route("/admin/players", get(list_players))
        .route_layer(middleware::from_fn(require_user_id))
}

/// Open the admin panel, creating the game when none is in progress.
#[utoipa::path(
    post,
    path = "/admin/session",
    tag = "admin",
    params(("x-user-id" = i64, Header, description = "External id of the admin")),
    responses(
        (status = 200, description = "Active game, created if needed", body = GameSummary),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    )
)]
pub async fn open_session(
    State(state): State<SharedState>,
    Extension(AdminActor(actor)): Extension<AdminActor>,
) -> Result<Json<GameSummary>, AppError> {
    let game = game_service::admin_session(&state, actor).await?;
    Ok(Json(game.into()))
}

/// Start the game and invite players without a team to register.
#[utoipa::path(
    post,
    path = "/admin/game/start",
    tag = "admin",
    params(("x-user-id" = i64, Header, description = "External id of the admin"), GameQuery),
    responses(
        (status = 200, description = "Game running", body = GameSummary),
        (status = 409, description = "Game cannot be started from its current status", body = ErrorBody)
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Extension(AdminActor(actor)): Extension<AdminActor>,
    Query(query): Query<GameQuery>,
) -> Result<Json<GameSummary>, AppError> {
    let game = game_service::admin_start_game(&state, query.game_ref(), actor).await?;
    notification_service::notify_game_started(&state, &game).await;
    Ok(Json(game.into()))
}

/// Open a new question; teams may buzz until it is closed.
#[utoipa::path(
    post,
    path = "/admin/game/question",
    tag = "admin",
    params(("x-user-id" = i64, Header, description = "External id of the admin"), GameQuery),
    responses(
        (status = 200, description = "Question open with an empty queue", body = GameSummary),
        (status = 409, description = "Game is not running", body = ErrorBody)
    )
)]
pub async fn start_question(
    State(state): State<SharedState>,
    Extension(AdminActor(actor)): Extension<AdminActor>,
    Query(query): Query<GameQuery>,
) -> Result<Json<GameSummary>, AppError> {
    let game = game_service::admin_start_question(&state, query.game_ref(), actor).await?;
    notification_service::notify_question_started(&state, &game).await;
    Ok(Json(game.into()))
}

/// Close the current question without awarding anything.
#[utoipa::path(
    post,
    path = "/admin/game/question/finish",
    tag = "admin",
    params(("x-user-id" = i64, Header, description = "External id of the admin"), GameQuery),
    responses(
        (status = 200, description = "Question closed", body = GameSummary),
        (status = 409, description = "No open question", body = ErrorBody)
    )
)]
pub async fn finish_question(
    State(state): State<SharedState>,
    Extension(AdminActor(actor)): Extension<AdminActor>,
    Query(query): Query<GameQuery>,
) -> Result<Json<GameSummary>, AppError> {
    let game = game_service::admin_finish_question(&state, query.game_ref(), actor).await?;
    Ok(Json(game.into()))
}

/// End the game and announce the final table to everyone.
#[utoipa::path(
    post,
    path = "/admin/game/finish",
    tag = "admin",
    params(("x-user-id" = i64, Header, description = "External id of the admin"), GameQuery),
    responses(
        (status = 200, description = "Game finished with its final table", body = GameScoresResponse),
        (status = 409, description = "Game already finished", body = ErrorBody)
    )
)]
pub async fn finish_game(
    State(state): State<SharedState>,
    Extension(AdminActor(actor)): Extension<AdminActor>,
    Query(query): Query<GameQuery>,
) -> Result<Json<GameScoresResponse>, AppError> {
    let game = game_service::admin_finish_game(&state, query.game_ref(), actor).await?;
    let (game, scores) = scoring_service::scores(&state, GameRef::Id(game.id)).await?;
    notification_service::notify_game_finished(&state, &game, scores.clone());
    Ok(Json(GameScoresResponse {
        game: game.into(),
        scores: score_rows(scores),
    }))
}

/// Give the point to a team and close the question.
#[utoipa::path(
    post,
    path = "/admin/game/correct",
    tag = "admin",
    params(("x-user-id" = i64, Header, description = "External id of the admin"), GameQuery),
    request_body = CorrectRequest,
    responses(
        (status = 200, description = "Point awarded, question closed", body = CorrectResponse),
        (status = 404, description = "Unknown team", body = ErrorBody),
        (status = 409, description = "No open question", body = ErrorBody)
    )
)]
pub async fn mark_correct(
    State(state): State<SharedState>,
    Extension(AdminActor(actor)): Extension<AdminActor>,
    Query(query): Query<GameQuery>,
    Json(request): Json<CorrectRequest>,
) -> Result<Json<CorrectResponse>, AppError> {
    let outcome =
        buzzer_service::admin_mark_correct(&state, query.game_ref(), actor, request.team_id)
            .await?;
    notification_service::notify_correct(&state, &outcome).await;
    Ok(Json(outcome.into()))
}

/// Drop the team at the head of the queue and hand the turn to the next one.
#[utoipa::path(
    post,
    path = "/admin/game/wrong",
    tag = "admin",
    params(("x-user-id" = i64, Header, description = "External id of the admin"), GameQuery),
    responses(
        (status = 200, description = "Team removed; question closed when nobody is left", body = WrongResponse),
        (status = 409, description = "No open question or empty queue", body = ErrorBody)
    )
)]
pub async fn mark_wrong(
    State(state): State<SharedState>,
    Extension(AdminActor(actor)): Extension<AdminActor>,
    Query(query): Query<GameQuery>,
) -> Result<Json<WrongResponse>, AppError> {
    let outcome = buzzer_service::admin_mark_wrong(&state, query.game_ref(), actor).await?;
    notification_service::notify_wrong(&state, &outcome).await;
    Ok(Json(outcome.into()))
}

/// Show the buzz-in order of the current question.
#[utoipa::path(
    get,
    path = "/admin/game/queue",
    tag = "admin",
    params(("x-user-id" = i64, Header, description = "External id of the admin"), GameQuery),
    responses((status = 200, description = "Queued teams, head first", body = QueueResponse))
)]
pub async fn get_queue(
    State(state): State<SharedState>,
    Extension(AdminActor(actor)): Extension<AdminActor>,
    Query(query): Query<GameQuery>,
) -> Result<Json<QueueResponse>, AppError> {
    let (game, teams) = game_service::admin_queue(&state, query.game_ref(), actor).await?;
    Ok(Json(QueueResponse {
        game_id: game.id,
        teams: teams.into_iter().map(TeamSummary::from).collect(),
    }))
}

/// Scoreboard as seen by the host.
#[utoipa::path(
    get,
    path = "/admin/game/scores",
    tag = "admin",
    params(("x-user-id" = i64, Header, description = "External id of the admin"), GameQuery),
    responses((status = 200, description = "Scoreboard, best team first", body = GameScoresResponse))
)]
pub async fn get_scores(
    State(state): State<SharedState>,
    Extension(AdminActor(actor)): Extension<AdminActor>,
    Query(query): Query<GameQuery>,
) -> Result<Json<GameScoresResponse>, AppError> {
    game_service::ensure_admin(&state, actor)?;
    let (game, scores) = scoring_service::scores(&state, query.game_ref()).await?;
    Ok(Json(GameScoresResponse {
        game: game.into(),
        scores: score_rows(scores),
    }))
}

/// Manually add points to a team.
#[utoipa::path(
    post,
    path = "/admin/game/award",
    tag = "admin",
    params(("x-user-id" = i64, Header, description = "External id of the admin"), GameQuery),
    request_body = AwardRequest,
    responses(
        (status = 200, description = "New total of the team", body = AwardResponse),
        (status = 400, description = "Invalid amount", body = ErrorBody),
        (status = 404, description = "Unknown team or game", body = ErrorBody)
    )
)]
pub async fn award_points(
    State(state): State<SharedState>,
    Extension(AdminActor(actor)): Extension<AdminActor>,
    Query(query): Query<GameQuery>,
    Valid(Json(request)): Valid<Json<AwardRequest>>,
) -> Result<Json<AwardResponse>, AppError> {
    let score = scoring_service::admin_award(
        &state,
        query.game_ref(),
        actor,
        request.team_id,
        request.points,
    )
    .await?;
    Ok(Json(AwardResponse {
        team_id: request.team_id,
        score,
    }))
}

/// List players, optionally only those with or without a team.
#[utoipa::path(
    get,
    path = "/admin/players",
    tag = "admin",
    params(("x-user-id" = i64, Header, description = "External id of the admin"), PlayersQuery),
    responses((status = 200, description = "Players in first-contact order", body = PlayersResponse))
)]
pub async fn list_players(
    State(state): State<SharedState>,
    Extension(AdminActor(actor)): Extension<AdminActor>,
    Query(query): Query<PlayersQuery>,
) -> Result<Json<PlayersResponse>, AppError> {
    game_service::ensure_admin(&state, actor)?;
    let players = roster_service::list_players(&state, query.filter.into()).await?;
    Ok(Json(PlayersResponse {
        players: players.into_iter().map(PlayerSummary::from).collect(),
    }))
}

async fn require_user_id(mut req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let actor = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<ExternalId>().ok())
        .ok_or_else(|| {
            debug!("admin request without a usable `x-user-id` header");
            AppError::missing_identity()
        })?;

    req.extensions_mut().insert(AdminActor(actor));
    Ok(next.run(req).await)
}
