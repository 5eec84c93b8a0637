use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parley_core::transport::waiter::ReplyWaiter;
use parley_core::transport::{
    Author, ChannelId, Destination, IncomingMessage, MessageId, SentMessage, Transport, UserId,
};

pub const CONSOLE_USER: UserId = 1;
pub const CONSOLE_CHANNEL: ChannelId = 1;

/// Talks to whoever is at the terminal. Every line is a direct message from [`CONSOLE_USER`].
pub struct ConsoleTransport {
    next_id: AtomicU64,
    waiter: ReplyWaiter,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            waiter: ReplyWaiter::new(),
        }
    }

    fn next_id(&self) -> MessageId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn message(&self, content: &str) -> IncomingMessage {
        IncomingMessage {
            id: self.next_id(),
            author: Author {
                id: CONSOLE_USER,
                name: "console".to_owned(),
                bot: false,
            },
            channel_id: CONSOLE_CHANNEL,
            guild_id: None,
            content: content.to_owned(),
            nsfw: false,
            edited_timestamp: None,
        }
    }

    /// `message` as if it had been edited to say `content`.
    pub fn edit_of(&self, message: &IncomingMessage, content: &str) -> IncomingMessage {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        IncomingMessage {
            content: content.to_owned(),
            edited_timestamp: Some(now),
            ..message.clone()
        }
    }

    /// Hands `message` to a pending prompt. Returns `true` if it was consumed as an answer.
    pub fn offer(&self, message: &IncomingMessage) -> bool {
        self.waiter.offer(message)
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send(&self, destination: Destination, content: &str) -> anyhow::Result<SentMessage> {
        let id = self.next_id();
        println!("[{id}] {content}");
        Ok(SentMessage { id, destination })
    }

    async fn edit(&self, message: &SentMessage, content: &str) -> anyhow::Result<()> {
        println!("[{} edited] {content}", message.id);
        Ok(())
    }

    async fn delete(&self, message: &SentMessage) -> anyhow::Result<()> {
        println!("[{} deleted]", message.id);
        Ok(())
    }

    async fn await_reply(
        &self,
        author: UserId,
        channel: ChannelId,
        wait: Option<Duration>,
    ) -> anyhow::Result<Option<IncomingMessage>> {
        Ok(self.waiter.wait(author, channel, wait).await)
    }
}
