use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the quiz buzzer backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::user_stream,
        crate::routes::public::get_game_status,
        crate::routes::public::get_scores,
        crate::routes::player::open_session,
        crate::routes::player::press_buzzer,
        crate::routes::player::register_team,
        crate::routes::player::begin_registration,
        crate::routes::player::cancel_registration,
        crate::routes::player::submit_message,
        crate::routes::player::get_team,
        crate::routes::admin::open_session,
        crate::routes::admin::start_game,
        crate::routes::admin::start_question,
        crate::routes::admin::finish_question,
        crate::routes::admin::finish_game,
        crate::routes::admin::mark_correct,
        crate::routes::admin::mark_wrong,
        crate::routes::admin::get_queue,
        crate::routes::admin::get_scores,
        crate::routes::admin::award_points,
        crate::routes::admin::list_players,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::common::PlayerIdentity,
            crate::dto::common::GameSummary,
            crate::dto::common::TeamSummary,
            crate::dto::common::ScoreRow,
            crate::dto::common::PlayerSummary,
            crate::dto::player::BuzzRequest,
            crate::dto::player::BuzzOutcomeKind,
            crate::dto::player::BuzzResponse,
            crate::dto::player::RegisterTeamRequest,
            crate::dto::player::MessageRequest,
            crate::dto::player::MessageResponse,
            crate::dto::player::RegistrationStartedResponse,
            crate::dto::player::PlayerStatusResponse,
            crate::dto::player::TeamMembersResponse,
            crate::dto::admin::CorrectRequest,
            crate::dto::admin::CorrectResponse,
            crate::dto::admin::WrongResponse,
            crate::dto::admin::AwardRequest,
            crate::dto::admin::AwardResponse,
            crate::dto::admin::QueueResponse,
            crate::dto::admin::GameScoresResponse,
            crate::dto::admin::PlayerFilterParam,
            crate::dto::admin::PlayersResponse,
            crate::dto::public::GameStatusResponse,
            crate::dto::public::ScoresResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::GameStartedEvent,
            crate::dto::sse::QuestionStartedEvent,
            crate::dto::sse::FirstBuzzEvent,
            crate::dto::sse::AnswerCorrectEvent,
            crate::dto::sse::AnswerWrongEvent,
            crate::dto::sse::NextTurnEvent,
            crate::dto::sse::GameFinishedEvent,
            crate::state::state_machine::GameStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Per-user notification streams"),
        (name = "public", description = "Read-only game status and scoreboard"),
        (name = "players", description = "Player actions relayed by the chat front-end"),
        (name = "admin", description = "Host actions; the caller is identified by `x-user-id`"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_group() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        for path in [
            "/healthcheck",
            "/sse/{user_id}",
            "/public/game",
            "/players/buzz",
            "/admin/game/correct",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }
}
