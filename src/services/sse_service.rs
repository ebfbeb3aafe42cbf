use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::{
    dao::models::ExternalId,
    dto::sse::{Audience, Handshake, ServerEvent},
    state::SharedState,
};

const EVENT_HANDSHAKE: &str = "handshake";

/// Subscribe `user` to the notification hub and greet it with a handshake.
///
/// The handshake is queued on the returned receiver only, so other subscribers never see it.
pub fn subscribe(state: &SharedState, user: ExternalId) -> broadcast::Receiver<ServerEvent> {
    let receiver = state.notifications().subscribe();
    let handshake = Handshake {
        user_id: user,
        message: "notification stream connected".into(),
        degraded: state.is_degraded(),
    };
    match ServerEvent::json(
        Audience::users([user]),
        Some(EVENT_HANDSHAKE.to_string()),
        &handshake,
    ) {
        Ok(event) => {
            state.notifications().broadcast(event);
        }
        Err(err) => warn!(error = %err, "failed to serialise SSE handshake"),
    }
    receiver
}

/// Convert a broadcast receiver into an SSE response, forwarding the events
/// addressed to `user` and cleaning up once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    user: ExternalId,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if !payload.is_for(user) {
                                continue;
                            }
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(user, skipped, "SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!(user, "SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
