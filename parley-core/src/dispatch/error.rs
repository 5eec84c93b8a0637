use std::fmt::Display;

use crate::transport::{ChannelId, UserId};

/// Why a message was not considered for dispatch at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreParseError {
    /// The author is an automated account, or the bot itself.
    UserIsBot(UserId),
    /// In self-operated mode only the bot's own account issues commands.
    NotSelf(UserId),
    /// The author is answering an argument prompt in this channel.
    AwaitingReply { author: UserId, channel: ChannelId },
    /// An update was received, but its content did not change.
    UnchangedEdit,
    /// An update was received, but it had no edited timestamp.
    EditedMessageWithNoTimestamp,
}

impl Display for PreParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserIsBot(id) => write!(f, "User is a bot ({id})"),
            Self::NotSelf(id) => write!(f, "User {id} is not the operating account"),
            Self::AwaitingReply { author, channel } => {
                write!(f, "User {author} is answering a prompt in channel {channel}")
            },
            Self::UnchangedEdit => f.write_str("The message was updated, but its content did not change."),
            Self::EditedMessageWithNoTimestamp => f.write_str("The message was updated, but not edited."),
        }
    }
}
impl std::error::Error for PreParseError {}
