use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use axum_valid::Valid;

use crate::{
    dao::models::ExternalId,
    dto::{
        common::{PlayerIdentity, PlayerSummary},
        player::{
            BuzzRequest, BuzzResponse, MessageRequest, MessageResponse, PlayerStatusResponse,
            RegisterTeamRequest, RegistrationStartedResponse, TeamMembersResponse,
        },
    },
    error::{AppError, ErrorBody, ServiceError},
    services::{
        buzzer_service, game_service, notification_service, registration_service, roster_service,
    },
    state::SharedState,
};

/// Endpoints used by the chat front-end on behalf of players.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/players/session", post(open_session))
        .route("/players/buzz", post(press_buzzer))
        .route("/players/team", post(register_team))
        .route("/players/registration", post(begin_registration))
        .route(
            "/players/{user_id}/registration",
            delete(cancel_registration),
        )
        .route("/players/messages", post(submit_message))
        .route("/players/{user_id}/team", get(get_team))
}

#[utoipa::path(
    post,
    path = "/players/session",
    tag = "players",
    request_body = PlayerIdentity,
    responses(
        (status = 200, description = "What the player can do right now", body = PlayerStatusResponse),
        (status = 503, description = "Storage unavailable", body = ErrorBody)
    )
)]
/// Register the player on first contact and describe the current game from their side.
pub async fn open_session(
    State(state): State<SharedState>,
    Valid(Json(identity)): Valid<Json<PlayerIdentity>>,
) -> Result<Json<PlayerStatusResponse>, AppError> {
    let status = game_service::player_status(&state, identity.user_id, identity.meta()).await?;
    let awaiting = state.interactions().current(identity.user_id).is_some();
    Ok(Json(PlayerStatusResponse::new(status, awaiting)))
}

#[utoipa::path(
    post,
    path = "/players/buzz",
    tag = "players",
    request_body = BuzzRequest,
    responses(
        (status = 200, description = "Press recorded", body = BuzzResponse),
        (status = 404, description = "No active game", body = ErrorBody),
        (status = 409, description = "No open question or player without team", body = ErrorBody)
    )
)]
/// Press the buzzer for the team of the player.
pub async fn press_buzzer(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<BuzzRequest>>,
) -> Result<Json<BuzzResponse>, AppError> {
    let player = &request.player;
    roster_service::get_or_create_player(&state, player.user_id, player.meta()).await?;
    let result =
        buzzer_service::press_buzzer(&state, request.game_id.into(), player.user_id).await?;
    notification_service::notify_buzz(&state, &result).await;
    Ok(Json(result.into()))
}

#[utoipa::path(
    post,
    path = "/players/team",
    tag = "players",
    request_body = RegisterTeamRequest,
    responses(
        (status = 200, description = "Team created with the player as first member", body = TeamMembersResponse),
        (status = 400, description = "Invalid team name", body = ErrorBody),
        (status = 409, description = "Player already on a team or name taken", body = ErrorBody)
    )
)]
/// Create a team in one step.
pub async fn register_team(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<RegisterTeamRequest>>,
) -> Result<Json<TeamMembersResponse>, AppError> {
    let player = &request.player;
    roster_service::get_or_create_player(&state, player.user_id, player.meta()).await?;
    let team = roster_service::register_team(&state, player.user_id, &request.name).await?;
    let members = roster_service::members_of(&state, team.id).await?;
    Ok(Json(TeamMembersResponse {
        team: team.into(),
        members: members.into_iter().map(PlayerSummary::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/players/registration",
    tag = "players",
    request_body = PlayerIdentity,
    responses(
        (status = 200, description = "Next message is taken as the team name", body = RegistrationStartedResponse),
        (status = 409, description = "Player already on a team", body = ErrorBody)
    )
)]
/// Start the two-step registration; the next message of the player names the team.
pub async fn begin_registration(
    State(state): State<SharedState>,
    Valid(Json(identity)): Valid<Json<PlayerIdentity>>,
) -> Result<Json<RegistrationStartedResponse>, AppError> {
    roster_service::get_or_create_player(&state, identity.user_id, identity.meta()).await?;
    registration_service::begin_registration(&state, identity.user_id).await?;
    Ok(Json(RegistrationStartedResponse {
        awaiting_team_name: true,
    }))
}

#[utoipa::path(
    delete,
    path = "/players/{user_id}/registration",
    tag = "players",
    params(("user_id" = i64, Path, description = "External id of the player")),
    responses(
        (status = 204, description = "Pending registration dropped"),
        (status = 404, description = "Nothing was pending", body = ErrorBody)
    )
)]
/// Abandon a pending registration.
pub async fn cancel_registration(
    State(state): State<SharedState>,
    Path(user_id): Path<ExternalId>,
) -> Result<StatusCode, AppError> {
    if registration_service::cancel_registration(&state, user_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServiceError::NotFound(format!("no pending registration for `{user_id}`")).into())
    }
}

#[utoipa::path(
    post,
    path = "/players/messages",
    tag = "players",
    request_body = MessageRequest,
    responses(
        (status = 200, description = "Message handled, or ignored when nothing was pending", body = MessageResponse),
        (status = 400, description = "Invalid team name, registration still pending", body = ErrorBody),
        (status = 409, description = "Player already on a team or name taken", body = ErrorBody)
    )
)]
/// Handle free text from a player.
pub async fn submit_message(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<MessageRequest>>,
) -> Result<Json<MessageResponse>, AppError> {
    let player = &request.player;
    roster_service::get_or_create_player(&state, player.user_id, player.meta()).await?;
    let team = registration_service::submit_text(&state, player.user_id, &request.text).await?;
    Ok(Json(MessageResponse {
        handled: team.is_some(),
        team: team.map(Into::into),
    }))
}

#[utoipa::path(
    get,
    path = "/players/{user_id}/team",
    tag = "players",
    params(("user_id" = i64, Path, description = "External id of the player")),
    responses(
        (status = 200, description = "Team of the player with its members", body = TeamMembersResponse),
        (status = 404, description = "Unknown player or player without team", body = ErrorBody)
    )
)]
/// Return the team of a player and its members in join order.
pub async fn get_team(
    State(state): State<SharedState>,
    Path(user_id): Path<ExternalId>,
) -> Result<Json<TeamMembersResponse>, AppError> {
    if roster_service::find_player(&state, user_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("player `{user_id}` is unknown")).into());
    }
    let team = roster_service::team_of(&state, user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("player `{user_id}` has no team")))?;
    let members = roster_service::members_of(&state, team.id).await?;
    Ok(Json(TeamMembersResponse {
        team: team.into(),
        members: members.into_iter().map(PlayerSummary::from).collect(),
    }))
}
