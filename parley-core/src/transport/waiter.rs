use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use super::{ChannelId, IncomingMessage, UserId};

type Pending = (u64, oneshot::Sender<IncomingMessage>);

/// Pending "wait for one reply" requests, for transports that receive messages from an event loop.
///
/// The event loop hands every message to [`ReplyWaiter::offer`]; a message from an author that is
/// being waited on in that channel is delivered to the waiter instead. Only one wait per author
/// and channel can be pending at a time.
#[derive(Default)]
pub struct ReplyWaiter {
    pending: Mutex<HashMap<(UserId, ChannelId), Pending>>,
    next_token: AtomicU64,
}
impl ReplyWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the next message from `author` in `channel`. Returns `None` straight away if
    /// another wait for the same pair is still pending.
    pub async fn wait(&self, author: UserId, channel: ChannelId, wait: Option<Duration>) -> Option<IncomingMessage> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().ok()?;
            match pending.entry((author, channel)) {
                Entry::Occupied(entry) if !entry.get().1.is_closed() => {
                    debug!("already waiting for {author} in {channel}");
                    return None;
                },
                Entry::Occupied(mut entry) => {
                    entry.insert((token, tx));
                },
                Entry::Vacant(entry) => {
                    entry.insert((token, tx));
                },
            }
        }

        let received = match wait {
            Some(wait) => tokio::time::timeout(wait, rx).await.ok().and_then(Result::ok),
            None => rx.await.ok(),
        };

        if received.is_none() {
            debug!("no reply from {author} in {channel}");
            if let Ok(mut pending) = self.pending.lock()
                && let Entry::Occupied(entry) = pending.entry((author, channel))
                && entry.get().0 == token
            {
                entry.remove();
            }
        }

        received
    }

    /// Returns `true` if the message was consumed as a reply.
    pub fn offer(&self, message: &IncomingMessage) -> bool {
        let sender = self
            .pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(&(message.author.id, message.channel_id)));

        match sender {
            Some((_, sender)) => sender.send(message.clone()).is_ok(),
            None => false,
        }
    }

    pub fn is_waiting(&self, author: UserId, channel: ChannelId) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.contains_key(&(author, channel)))
            .unwrap_or(false)
    }
}
