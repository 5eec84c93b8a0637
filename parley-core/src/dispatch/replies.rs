//! Bookkeeping of the bot's responses to each trigger message, so that an edited trigger rewrites
//! them in place.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use moka::sync::Cache;

use crate::transport::{Destination, MessageId, SentMessage};

/// Responses to one trigger, grouped by where they were sent, oldest first.
pub type TrackedResponses = HashMap<Destination, Vec<SentMessage>>;

#[derive(Debug, Clone)]
pub struct Reply {
    pub responses: TrackedResponses,
    /// When the trigger was first dispatched. Edits after the editable window are new messages.
    pub created: Instant,
}

/// Replies of recent triggers, by trigger message id.
pub struct Replies {
    cache: Cache<MessageId, Reply>,
    editable_for: Duration,
}

impl Replies {
    pub fn new(editable_for: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(1000)
                .time_to_live(editable_for.max(Duration::from_secs(1)))
                .build(),
            editable_for,
        }
    }

    pub fn insert(&self, id: MessageId, reply: Reply) {
        if !self.editable_for.is_zero() {
            self.cache.insert(id, reply);
        }
    }

    pub fn remove(&self, id: MessageId) -> Option<Reply> {
        self.cache.remove(&id)
    }

    /// The reply of a trigger that is still editable.
    pub fn get(&self, id: MessageId) -> Option<Reply> {
        self.cache
            .get(&id)
            .filter(|reply| reply.created.elapsed() < self.editable_for)
    }
}

/// Tracks the responses of one dispatch. When seeded with an earlier dispatch's responses, each
/// new response to a destination replaces the next earlier one there instead of being sent anew.
#[derive(Debug, Default)]
pub struct ResponseTracker {
    previous: TrackedResponses,
    positions: HashMap<Destination, usize>,
    produced: Vec<SentMessage>,
}

impl ResponseTracker {
    pub fn seeded(previous: TrackedResponses) -> Self {
        Self {
            previous,
            ..Default::default()
        }
    }

    /// The earlier response to overwrite with the next response to `destination`, if any.
    pub fn next_editable(&mut self, destination: Destination) -> Option<SentMessage> {
        let position = self.positions.entry(destination).or_default();
        let editable = self.previous.get(&destination)?.get(*position).cloned();
        *position += 1;
        editable
    }

    pub fn record(&mut self, message: SentMessage) {
        self.produced.push(message);
    }

    /// Earlier responses this dispatch did not overwrite.
    pub fn leftovers(&self) -> Vec<SentMessage> {
        self.previous
            .iter()
            .flat_map(|(destination, sent)| {
                let used = self.positions.get(destination).copied().unwrap_or(0);
                sent.iter().skip(used).cloned()
            })
            .collect()
    }

    pub fn into_responses(self) -> TrackedResponses {
        let mut responses = TrackedResponses::new();
        for message in self.produced {
            responses.entry(message.destination).or_default().push(message);
        }
        responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sent(id: u64, destination: Destination) -> SentMessage {
        SentMessage { id, destination }
    }

    #[test]
    fn reuses_in_order_and_reports_leftovers() {
        let channel = Destination::Channel(5);
        let direct = Destination::Direct(1);
        let previous = TrackedResponses::from([
            (channel, vec![sent(1, channel), sent(2, channel), sent(3, channel)]),
            (direct, vec![sent(4, direct)]),
        ]);
        let mut tracker = ResponseTracker::seeded(previous);

        assert_eq!(tracker.next_editable(channel), Some(sent(1, channel)));
        tracker.record(sent(1, channel));

        let mut leftovers = tracker.leftovers().into_iter().map(|m| m.id).collect::<Vec<_>>();
        leftovers.sort_unstable();
        assert_eq!(leftovers, vec![2, 3, 4]);

        let responses = tracker.into_responses();
        assert_eq!(responses[&channel], vec![sent(1, channel)]);
        assert!(!responses.contains_key(&direct));
    }

    #[test]
    fn unseeded_tracker_sends_new() {
        let channel = Destination::Channel(5);
        let mut tracker = ResponseTracker::default();
        assert_eq!(tracker.next_editable(channel), None);
        tracker.record(sent(9, channel));
        assert!(tracker.leftovers().is_empty());
        assert_eq!(tracker.into_responses()[&channel].len(), 1);
    }

    #[test]
    fn zero_window_caches_nothing() {
        let replies = Replies::new(Duration::ZERO);
        replies.insert(1, Reply {
            responses: TrackedResponses::new(),
            created: Instant::now(),
        });
        assert!(replies.get(1).is_none());

        let replies = Replies::new(Duration::from_secs(30));
        replies.insert(1, Reply {
            responses: TrackedResponses::new(),
            created: Instant::now(),
        });
        assert!(replies.get(1).is_some());
        assert!(replies.remove(1).is_some());
        assert!(replies.get(1).is_none());
    }
}
