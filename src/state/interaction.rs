use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::dao::models::ExternalId;

/// What the next free-text message of a player is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// The player asked to register and must now send a team name.
    AwaitingTeamName,
}

#[derive(Debug, Clone, Copy)]
struct PendingIntent {
    intent: Intent,
    expires_at: Instant,
}

/// Per-player conversational intents, each expiring after a fixed TTL.
#[derive(Debug)]
pub struct InteractionState {
    pending: DashMap<ExternalId, PendingIntent>,
    ttl: Duration,
}

impl InteractionState {
    /// Empty state whose intents live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            ttl,
        }
    }

    /// Record `intent`, replacing whatever the player had pending.
    pub fn begin(&self, player: ExternalId, intent: Intent) {
        self.pending.insert(
            player,
            PendingIntent {
                intent,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Live intent of the player; an expired one is dropped and reported as absent.
    pub fn current(&self, player: ExternalId) -> Option<Intent> {
        let now = Instant::now();
        let live = self
            .pending
            .get(&player)
            .map(|entry| (entry.intent, entry.expires_at > now));
        match live {
            Some((intent, true)) => Some(intent),
            Some((_, false)) => {
                self.pending
                    .remove_if(&player, |_, pending| pending.expires_at <= now);
                None
            }
            None => None,
        }
    }

    /// Forget the player's intent.
    pub fn clear(&self, player: ExternalId) -> bool {
        self.pending.remove(&player).is_some()
    }

    /// Drop every expired intent, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.pending.len();
        self.pending.retain(|_, pending| pending.expires_at > now);
        before.saturating_sub(self.pending.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_then_clear() {
        let state = InteractionState::new(Duration::from_secs(60));
        assert_eq!(state.current(1), None);

        state.begin(1, Intent::AwaitingTeamName);
        assert_eq!(state.current(1), Some(Intent::AwaitingTeamName));
        assert_eq!(state.current(2), None);

        assert!(state.clear(1));
        assert!(!state.clear(1));
        assert_eq!(state.current(1), None);
    }

    #[test]
    fn expired_intents_disappear() {
        let state = InteractionState::new(Duration::ZERO);
        state.begin(1, Intent::AwaitingTeamName);
        state.begin(2, Intent::AwaitingTeamName);

        assert_eq!(state.current(1), None);
        assert_eq!(state.purge_expired(), 1);
        assert_eq!(state.purge_expired(), 0);
    }
}
