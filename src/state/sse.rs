use tokio::sync::broadcast;
use tracing::trace;

use crate::dto::sse::ServerEvent;

/// Fan-out of notifications to every open SSE stream.
///
/// All streams share one channel; each stream keeps only the events addressed to its
/// user, see [`ServerEvent::is_for`].
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Hub whose slowest stream may lag `capacity` events behind before skipping.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Attach a new stream; it sees events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Number of open streams.
    pub fn stream_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish `event`, returning how many streams received it. Nobody listening is not an error.
    pub fn broadcast(&self, event: ServerEvent) -> usize {
        match self.sender.send(event) {
            Ok(streams) => streams,
            Err(broadcast::error::SendError(event)) => {
                trace!(event = ?event.event, "notification dropped: no open stream");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::sse::Audience;

    #[tokio::test]
    async fn streams_filter_their_own_events() {
        let hub = SseHub::new(8);
        assert_eq!(
            hub.broadcast(ServerEvent::json(Audience::Everyone, None::<String>, &1).unwrap()),
            0
        );

        let mut receiver = hub.subscribe();
        assert_eq!(hub.stream_count(), 1);
        let event =
            ServerEvent::json(Audience::users([7]), Some("ping".to_string()), &"hi").unwrap();
        assert_eq!(hub.broadcast(event), 1);

        let received = receiver.recv().await.unwrap();
        assert!(received.is_for(7));
        assert!(!received.is_for(8));
        assert_eq!(received.data, "\"hi\"");
    }
}
