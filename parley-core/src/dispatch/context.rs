use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use parley_string_fmt::Markdown;
use tracing::{debug, error, info};

use super::replies::{ResponseTracker, TrackedResponses};
use crate::command::arguments::collector::ArgumentCollectorResult;
use crate::command::arguments::split::{split_args, strip_quotes};
use crate::command::arguments::value::CommandArgs;
use crate::command::arguments::Cancellation;
use crate::command::errors::{BlockReason, FriendlyError};
use crate::command::{ArgsSpec, Command, PermissionCheck};
use crate::events::DispatchEvent;
use crate::parley::ThreadSafeParley;
use crate::transport::{Destination, IncomingMessage, SentMessage};

/// Longest message the bot sends. Longer content is cut.
const MAX_MESSAGE_LENGTH: usize = 2000;

/// Trims a `String` in-place such that it fits in the message length limit.
fn trim_content_fits(content: &mut String) {
    if let Some((truncated_byte_index, _)) = content.char_indices().nth(MAX_MESSAGE_LENGTH) {
        content.truncate(truncated_byte_index);
    }
}

/// One inbound message bound to the command it resolved to.
///
/// A context with no command stands for an invocation that resolved to nothing. The context also
/// tracks every response sent through it, so that an edit of the trigger message can rewrite
/// those responses instead of adding new ones.
pub struct DispatchContext {
    pub parley: ThreadSafeParley,
    pub message: IncomingMessage,
    pub command: Option<Arc<Command>>,
    /// Everything after the command name. `None` when the message matched a pattern.
    pub arg_string: Option<String>,
    /// Capture groups of the matching pattern, index 0 being the whole match.
    pub pattern_matches: Option<Vec<Option<String>>>,
    /// The prefix in effect where the message was sent. `None` means mention-only.
    pub prefix: Option<String>,
    responses: Mutex<ResponseTracker>,
}

impl DispatchContext {
    pub fn new(
        parley: ThreadSafeParley,
        message: IncomingMessage,
        command: Option<Arc<Command>>,
        arg_string: Option<String>,
        pattern_matches: Option<Vec<Option<String>>>,
        prefix: Option<String>,
    ) -> Self {
        Self {
            parley,
            message,
            command,
            arg_string,
            pattern_matches,
            prefix,
            responses: Mutex::new(ResponseTracker::default()),
        }
    }

    fn tracker(&self) -> MutexGuard<'_, ResponseTracker> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Continues from an earlier dispatch of the same trigger: responses overwrite the earlier
    /// ones in order.
    pub fn seed_responses(&self, previous: TrackedResponses) {
        *self.tracker() = ResponseTracker::seeded(previous);
    }

    /// Where plain responses go: the trigger's channel, or the author's direct conversation.
    pub fn home(&self) -> Destination {
        if self.message.is_direct() {
            Destination::Direct(self.message.author.id)
        } else {
            Destination::Channel(self.message.channel_id)
        }
    }

    fn as_reply(&self, content: &str) -> String {
        if self.message.is_direct() {
            content.to_owned()
        } else {
            format!("{}, {content}", parley_common::util::user_mention(self.message.author.id))
        }
    }

    async fn respond(&self, destination: Destination, content: &str) -> anyhow::Result<SentMessage> {
        let mut content = content.to_owned();
        trim_content_fits(&mut content);

        let editable = self.tracker().next_editable(destination);
        let sent = match editable {
            Some(earlier) => match self.parley.transport.edit(&earlier, &content).await {
                Ok(()) => earlier,
                Err(e) => {
                    debug!("could not edit response {}, sending anew: {e}", earlier.id);
                    self.parley.transport.send(destination, &content).await?
                },
            },
            None => self.parley.transport.send(destination, &content).await?,
        };

        self.tracker().record(sent.clone());
        Ok(sent)
    }

    /// Sends `content` where the command was used.
    pub async fn say(&self, content: &str) -> anyhow::Result<SentMessage> {
        self.respond(self.home(), content).await
    }

    /// Sends `content` addressed to the author. Plain in direct conversations.
    pub async fn reply(&self, content: &str) -> anyhow::Result<SentMessage> {
        let content = self.as_reply(content);
        self.respond(self.home(), &content).await
    }

    /// Sends `content` to the author's direct conversation.
    pub async fn direct(&self, content: &str) -> anyhow::Result<SentMessage> {
        self.respond(Destination::Direct(self.message.author.id), content).await
    }

    pub async fn code(&self, language: &str, content: &str) -> anyhow::Result<SentMessage> {
        self.respond(self.home(), &content.codeblock(language)).await
    }

    /// Sends an argument prompt. Prompts are not responses: an edit of the trigger never rewrites
    /// them.
    pub async fn prompt(&self, content: &str) -> anyhow::Result<SentMessage> {
        let mut content = self.as_reply(content);
        trim_content_fits(&mut content);
        self.parley.transport.send(self.home(), &content).await
    }

    /// Waits for the author's next message in the trigger's channel.
    pub async fn await_reply(&self, wait: Option<Duration>) -> anyhow::Result<Option<IncomingMessage>> {
        self.parley
            .transport
            .await_reply(self.message.author.id, self.message.channel_id, wait)
            .await
    }

    /// How to invoke `command_text` where this message was sent: with the prefix or a mention
    /// in servers, bare in direct conversations.
    pub fn usage(&self, command_text: &str) -> String {
        if self.message.is_direct() {
            crate::command::usage(command_text, None, None)
        } else {
            crate::command::usage(
                command_text,
                self.prefix.as_deref(),
                Some(self.parley.config.bot.name.as_str()),
            )
        }
    }

    /// Ends response tracking. Returns the earlier responses that were not overwritten, and
    /// this dispatch's responses.
    pub fn finalize(&self) -> (Vec<SentMessage>, TrackedResponses) {
        let tracker = std::mem::take(&mut *self.tracker());
        (tracker.leftovers(), tracker.into_responses())
    }

    async fn block(&self, command: &Command, reason: BlockReason) -> anyhow::Result<()> {
        debug!("command {} blocked for message {}: {reason}", command.name, self.message.id);
        self.parley.metrics_handler.add_block(reason.reason());
        self.parley.emit(DispatchEvent::CommandBlocked {
            command: Some(command.name.clone()),
            message_id: self.message.id,
            reason: reason.clone(),
        });

        command.handler.on_block(self, command, &reason).await
    }

    async fn cancelled(&self, command: &Command, result: ArgumentCollectorResult) -> anyhow::Result<()> {
        let reason = result.cancelled.unwrap_or(Cancellation::User);
        debug!("command {} cancelled for message {}: {reason}", command.name, self.message.id);
        self.parley.metrics_handler.add_cancellation(&reason.to_string());
        self.parley.emit(DispatchEvent::CommandCancelled {
            command: command.name.clone(),
            message_id: self.message.id,
            reason,
        });

        if result.prompts.is_empty() || reason == Cancellation::PromptLimit {
            let format = command.format().unwrap_or_default();
            let usage = self.usage(format!("{} {format}", command.name).trim_end());
            let help = self.usage(&format!("help {}", command.name));
            self.reply(&format!(
                "Invalid command usage. The `{}` command's accepted format is: {usage}. Use {help} for more information.",
                command.name
            ))
            .await?;
        } else {
            self.reply("Cancelled command.").await?;
        }
        Ok(())
    }

    /// Runs the resolved command: checks where and by whom it may be used, the user's throttle,
    /// obtains its arguments, then calls the handler.
    pub async fn run(&self) -> anyhow::Result<()> {
        let Some(command) = self.command.clone() else {
            return Ok(());
        };
        let author = self.message.author.id;

        if command.guild_only && self.message.is_direct() {
            return self.block(&command, BlockReason::GuildOnly).await;
        }
        if command.nsfw && !self.message.nsfw {
            return self.block(&command, BlockReason::Nsfw).await;
        }

        match command.handler.has_permission(self, &command).await? {
            PermissionCheck::Allowed => {},
            PermissionCheck::Denied => {
                return self.block(&command, BlockReason::Permission { response: None }).await;
            },
            PermissionCheck::DeniedWith(response) => {
                return self
                    .block(&command, BlockReason::Permission {
                        response: Some(response),
                    })
                    .await;
            },
        }

        if !self.message.is_direct() && !command.client_permissions.is_empty() {
            let missing = self
                .parley
                .transport
                .missing_permissions(self.message.channel_id, None, &command.client_permissions)
                .await?;
            if !missing.is_empty() {
                return self.block(&command, BlockReason::ClientPermissions { missing }).await;
            }
        }

        let throttle = command.throttle(author, self.parley.is_owner(author));
        if let (Some(throttle), Some(throttles)) = (&throttle, &command.throttles) {
            if let Some(remaining) = throttles.remaining(throttle) {
                return self.block(&command, BlockReason::Throttling { remaining }).await;
            }
        }

        let arg_string = self.arg_string.as_deref().unwrap_or_default().trim();
        let args = match (&self.pattern_matches, &command.args) {
            (Some(matches), _) => CommandArgs::Pattern(matches.clone()),
            (None, ArgsSpec::Collector(collector)) => {
                let provided = split_args(arg_string, collector.count(), command.args_single_quotes);
                let result = collector.obtain(self, &provided).await?;
                match result.values {
                    Some(values) => CommandArgs::Collected(values),
                    None => return self.cancelled(&command, result).await,
                }
            },
            (None, ArgsSpec::Single) => {
                CommandArgs::Single(strip_quotes(arg_string, command.args_single_quotes).to_owned())
            },
            (None, ArgsSpec::Multiple { count }) => {
                CommandArgs::Multiple(split_args(arg_string, *count, command.args_single_quotes))
            },
        };

        // other invocations may have used the command while arguments were collected
        if let (Some(throttle), Some(throttles)) = (&throttle, &command.throttles) {
            if let Err(remaining) = throttles.take(throttle) {
                return self.block(&command, BlockReason::Throttling { remaining }).await;
            }
        }

        let from_pattern = self.pattern_matches.is_some();
        info!(
            "running command {} for {} (message {})",
            command.name, self.message.author.name, self.message.id
        );
        self.parley.metrics_handler.add_command(&command.name);
        self.parley.emit(DispatchEvent::CommandRun {
            command: command.name.clone(),
            message_id: self.message.id,
            from_pattern,
        });

        if let Err(err) = command.handler.run(self, args, from_pattern).await {
            self.parley.metrics_handler.add_command_error();
            self.parley.emit(DispatchEvent::CommandError {
                command: command.name.clone(),
                message_id: self.message.id,
                error: format!("{err:#}"),
            });

            if let Some(friendly) = err.downcast_ref::<FriendlyError>() {
                debug!("command {} failed with a friendly error: {friendly}", command.name);
                self.reply(&friendly.0).await?;
            } else {
                error!("command {} failed: {err:?}", command.name);
                command.handler.on_error(self, &command, &err).await?;
            }
        }

        Ok(())
    }
}
