//! The boundary between the dispatch core and whatever chat service delivers messages.
//!
//! The core never talks to a chat service directly. Everything it needs (sending, editing and
//! deleting replies, waiting for a prompt answer, permission and entity lookups) goes through the
//! [`Transport`] trait, and inbound messages arrive as plain [`IncomingMessage`] values.

use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;

pub mod waiter;

#[cfg(test)]
pub mod mock;

pub type UserId = u64;
pub type ChannelId = u64;
pub type GuildId = u64;
pub type MessageId = u64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    /// Whether the author is an automated account.
    pub bot: bool,
}

/// A chat message as delivered by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub author: Author,
    pub channel_id: ChannelId,
    /// `None` for direct (private) conversations.
    pub guild_id: Option<GuildId>,
    pub content: String,
    /// Whether the channel allows age-restricted content.
    pub nsfw: bool,
    /// Unix timestamp (milliseconds) of the last edit, if the message was ever edited.
    pub edited_timestamp: Option<u64>,
}
impl IncomingMessage {
    pub fn is_direct(&self) -> bool {
        self.guild_id.is_none()
    }
}

/// Where a response is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Destination {
    Channel(ChannelId),
    /// A private conversation with the given user.
    Direct(UserId),
}
impl Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(id) => write!(f, "{id}"),
            Self::Direct(_) => f.write_str("direct"),
        }
    }
}

/// A message the bot sent, as far as the core needs to know about it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub id: MessageId,
    pub destination: Destination,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Channel,
    Role,
}
impl Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::User => "users",
            Self::Channel => "channels",
            Self::Role => "roles",
        })
    }
}

/// Something a user can reference in an argument, resolved by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    pub kind: EntityKind,
    pub id: u64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityQuery {
    Id(u64),
    /// Case-insensitive substring search on names.
    Name(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, destination: Destination, content: &str) -> anyhow::Result<SentMessage>;

    async fn edit(&self, message: &SentMessage, content: &str) -> anyhow::Result<()>;

    async fn delete(&self, message: &SentMessage) -> anyhow::Result<()>;

    /// Waits for exactly one message from `author` in `channel`. `None` for `wait` means no bound.
    ///
    /// Returns `Ok(None)` if nothing arrived in time.
    async fn await_reply(
        &self,
        author: UserId,
        channel: ChannelId,
        wait: Option<Duration>,
    ) -> anyhow::Result<Option<IncomingMessage>>;

    /// Returns which of `required` the user (or the bot itself, when `user` is `None`) lacks in
    /// `channel`.
    async fn missing_permissions(
        &self,
        _channel: ChannelId,
        _user: Option<UserId>,
        _required: &[String],
    ) -> anyhow::Result<Vec<String>> {
        Ok(vec![])
    }

    async fn lookup_entities(
        &self,
        _kind: EntityKind,
        _guild: Option<GuildId>,
        _query: &EntityQuery,
    ) -> anyhow::Result<Vec<Entity>> {
        Ok(vec![])
    }
}
