use crate::command::arguments::Cancellation;
use crate::command::errors::BlockReason;
use crate::transport::{GuildId, MessageId};

/// Notifications published by the dispatcher. Subscribe through `Parley::subscribe`.
#[derive(Clone, Debug)]
pub enum DispatchEvent {
    CommandRun {
        command: String,
        message_id: MessageId,
        from_pattern: bool,
    },
    CommandBlocked {
        command: Option<String>,
        message_id: MessageId,
        reason: BlockReason,
    },
    CommandCancelled {
        command: String,
        message_id: MessageId,
        reason: Cancellation,
    },
    CommandError {
        command: String,
        message_id: MessageId,
        error: String,
    },
    UnknownCommand {
        message_id: MessageId,
        content: String,
    },
    CommandStatusChange {
        guild: Option<GuildId>,
        command: String,
        enabled: bool,
    },
    GroupStatusChange {
        guild: Option<GuildId>,
        group: String,
        enabled: bool,
    },
    PrefixChange {
        guild: Option<GuildId>,
        prefix: Option<String>,
    },
    /// Something failed outside of a command body.
    Error {
        message_id: Option<MessageId>,
        error: String,
    },
}
