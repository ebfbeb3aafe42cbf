use axum::Router;

use crate::state::SharedState;

pub mod admin;
pub mod docs;
pub mod health;
pub mod player;
pub mod public;
pub mod sse;

/// Compose all route trees and the documentation UI, then bind the shared state.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(public::router())
        .merge(player::router())
        .merge(admin::router())
        .merge(docs::router());

    api_router.with_state(state)
}
