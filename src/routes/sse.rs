use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{dao::models::ExternalId, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/{user_id}",
    tag = "sse",
    params(("user_id" = i64, Path, description = "External id of the listening user")),
    responses((status = 200, description = "Notifications addressed to the user", content_type = "text/event-stream", body = String))
)]
/// Stream the notifications addressed to one user (player or host).
pub async fn user_stream(
    State(state): State<SharedState>,
    Path(user_id): Path<ExternalId>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = sse_service::subscribe(&state, user_id);
    info!(user = user_id, "new SSE connection");
    sse_service::to_sse_stream(receiver, user_id)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/{user_id}", get(user_stream))
}
