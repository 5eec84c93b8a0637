//! The command system.
//!
//! The key things that make up the command system are:
//!
//! - [`Command`]: an immutable, registered command definition (identity, flags, argument
//!   specification, throttling) plus the [`CommandHandler`] that runs it. Built with a
//!   [`CommandBuilder`](builder::CommandBuilder).
//!
//! - [`CommandHandler`]: the command body, and hooks to customise the permission check and the
//!   notices sent when a dispatch is blocked or the body fails.
//!
//! - The argument system in [`arguments`]: types, constraints, and the interactive collector that
//!   prompts users for missing or invalid values.
//!
//! - The [`Registry`](registry::Registry): the catalog of commands, groups and argument types,
//!   with exact and fuzzy lookup.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use parley_string_fmt::Markdown;
use serde_json::Value;
use tracing::info;

use self::arguments::collector::ArgumentCollector;
use self::arguments::value::CommandArgs;
use self::errors::{BlockReason, RegistrationError};
use self::registry::Registry;
use self::throttle::{Throttle, Throttles, Throttling};
use crate::dispatch::context::DispatchContext;
use crate::events::DispatchEvent;
use crate::parley::Parley;
use crate::settings::{command_key, enabled_in, Scope};
use crate::transport::{GuildId, UserId};

pub mod arguments;
pub mod builder;
pub mod errors;
pub mod group;
pub mod registry;
pub mod throttle;

pub type TCommandHandler = Arc<dyn CommandHandler>;

/// The outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionCheck {
    Allowed,
    Denied,
    /// Denied, with an explanation sent to the user instead of the generic notice.
    DeniedWith(String),
}

/// How a command receives its arguments.
pub enum ArgsSpec {
    /// Values obtained (and prompted for) by a collector.
    Collector(ArgumentCollector),
    /// The whole argument string, trimmed.
    Single,
    /// The argument string split into at most `count` values, the last holding the remainder.
    Multiple { count: Option<usize> },
}

/// A command body.
///
/// Only [`run`](CommandHandler::run) is required; the other hooks default to the standard
/// behaviour for the command they are attached to.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Runs the command. `from_pattern` is set when the message matched one of the command's
    /// patterns rather than its name.
    async fn run(&self, ctxt: &DispatchContext, args: CommandArgs, from_pattern: bool) -> anyhow::Result<()>;

    async fn has_permission(&self, ctxt: &DispatchContext, command: &Command) -> anyhow::Result<PermissionCheck> {
        command.default_permission(ctxt).await
    }

    /// Called when a dispatch of this command was blocked.
    async fn on_block(&self, ctxt: &DispatchContext, command: &Command, reason: &BlockReason) -> anyhow::Result<()> {
        if let Some(notice) = command.block_notice(reason) {
            ctxt.reply(&notice).await?;
        }
        Ok(())
    }

    /// Called when [`run`](CommandHandler::run) failed with anything but a `FriendlyError`.
    async fn on_error(&self, ctxt: &DispatchContext, _command: &Command, error: &anyhow::Error) -> anyhow::Result<()> {
        let owners = &ctxt.parley.config.owners;
        let contact = if owners.is_empty() {
            "the bot owner".to_owned()
        } else {
            owners
                .iter()
                .map(|id| parley_common::util::user_mention(*id))
                .collect::<Vec<_>>()
                .join(", ")
        };

        ctxt.reply(&format!(
            "An error occurred while running the command: {}\nYou shouldn't ever receive an error like this.\nPlease contact {contact}.",
            error.to_string().codestring()
        ))
        .await?;
        Ok(())
    }
}

pub struct Command {
    /// Lowercase, unique across names and aliases.
    pub name: String,
    pub aliases: Vec<String>,
    pub group_id: String,
    /// Unique within the group.
    pub member_name: String,
    pub description: String,
    pub details: Option<String>,
    pub format: Option<String>,
    pub examples: Vec<String>,
    pub guild_only: bool,
    pub owner_only: bool,
    pub nsfw: bool,
    /// Guarded commands can never be disabled.
    pub guarded: bool,
    /// Whether the command can be invoked by name. Pattern-only commands turn this off.
    pub default_handling: bool,
    /// Receives invocations that resolve to no command.
    pub unknown: bool,
    pub hidden: bool,
    pub user_permissions: Vec<String>,
    pub client_permissions: Vec<String>,
    pub args: ArgsSpec,
    pub args_single_quotes: bool,
    pub patterns: Vec<regex::Regex>,
    pub throttles: Option<Throttles>,
    pub handler: TCommandHandler,
}

impl Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("group_id", &self.group_id)
            .field("member_name", &self.member_name)
            .finish_non_exhaustive()
    }
}

impl Command {
    pub fn throttling(&self) -> Option<Throttling> {
        self.throttles.as_ref().map(|t| t.throttling)
    }

    /// The user's throttle for this command. `None` if the command is not throttled or the user
    /// is exempt.
    pub fn throttle(&self, user: UserId, exempt: bool) -> Option<Arc<Throttle>> {
        if exempt {
            return None;
        }
        self.throttles.as_ref().map(|t| t.throttle(user))
    }

    /// The argument format shown in usage notices, derived from the collector when not given.
    pub fn format(&self) -> Option<String> {
        if let Some(format) = &self.format {
            return Some(format.clone());
        }

        let ArgsSpec::Collector(collector) = &self.args else {
            return None;
        };
        let derived = collector
            .args
            .iter()
            .map(|arg| {
                let infinite = if arg.infinite { "..." } else { "" };
                if arg.is_optional() {
                    format!("[{}{infinite}]", arg.label)
                } else {
                    format!("<{}{infinite}>", arg.label)
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        (!derived.is_empty()).then_some(derived)
    }

    /// Renders how to invoke this command with `arg_string`.
    pub fn usage(&self, arg_string: Option<&str>, prefix: Option<&str>, bot_name: Option<&str>) -> String {
        let command = match arg_string {
            Some(args) if !args.is_empty() => format!("{} {args}", self.name),
            _ => self.name.clone(),
        };
        usage(&command, prefix, bot_name)
    }

    /// Owner-only and user permission checks. Owners pass everything.
    pub async fn default_permission(&self, ctxt: &DispatchContext) -> anyhow::Result<PermissionCheck> {
        if !self.owner_only && self.user_permissions.is_empty() {
            return Ok(PermissionCheck::Allowed);
        }
        if ctxt.parley.is_owner(ctxt.message.author.id) {
            return Ok(PermissionCheck::Allowed);
        }
        if self.owner_only {
            return Ok(PermissionCheck::DeniedWith(format!(
                "The `{}` command can only be used by the bot owner.",
                self.name
            )));
        }

        if ctxt.message.is_direct() {
            return Ok(PermissionCheck::Allowed);
        }
        let missing = ctxt
            .parley
            .transport
            .missing_permissions(
                ctxt.message.channel_id,
                Some(ctxt.message.author.id),
                &self.user_permissions,
            )
            .await?;

        Ok(match &missing[..] {
            [] => PermissionCheck::Allowed,
            [permission] => PermissionCheck::DeniedWith(format!(
                "The `{}` command requires you to have the \"{permission}\" permission.",
                self.name
            )),
            _ => PermissionCheck::DeniedWith(format!(
                "The `{}` command requires you to have the following permissions: {}",
                self.name,
                missing.join(", ")
            )),
        })
    }

    /// The standard notice for a blocked dispatch. Inhibitions carry their own response.
    pub fn block_notice(&self, reason: &BlockReason) -> Option<String> {
        let name = &self.name;
        Some(match reason {
            BlockReason::GuildOnly => format!("The `{name}` command must be used in a server channel."),
            BlockReason::Nsfw => format!("The `{name}` command can only be used in NSFW channels."),
            BlockReason::Permission { response: Some(response) } => response.clone(),
            BlockReason::Permission { response: None } => {
                format!("You do not have permission to use the `{name}` command.")
            },
            BlockReason::ClientPermissions { missing } => match &missing[..] {
                [permission] => format!("I need the \"{permission}\" permission for the `{name}` command to work."),
                _ => format!(
                    "I need the following permissions for the `{name}` command to work: {}",
                    missing.join(", ")
                ),
            },
            BlockReason::Throttling { remaining } => format!(
                "You may not use the `{name}` command again for another {:.1} seconds.",
                remaining.as_secs_f64()
            ),
            BlockReason::Inhibited(_) => return None,
        })
    }

    /// Whether the command may run in `guild` (`None` meaning globally). Guarded commands always
    /// may; otherwise both the command and its group must be enabled.
    pub async fn is_enabled_in(&self, parley: &Parley, guild: Option<GuildId>) -> anyhow::Result<bool> {
        if self.guarded {
            return Ok(true);
        }
        if let Some(group) = parley.registry.resolve_group(&self.group_id) {
            if !group.is_enabled_in(parley, guild).await? {
                return Ok(false);
            }
        }
        enabled_in(&*parley.settings, guild, &command_key(&self.name)).await
    }

    pub async fn set_enabled_in(&self, parley: &Parley, guild: Option<GuildId>, enabled: bool) -> anyhow::Result<()> {
        if self.guarded {
            return Err(RegistrationError::Guarded(format!("command {}", self.name)).into());
        }

        parley
            .settings
            .set(Scope::from(guild), &command_key(&self.name), Value::Bool(enabled))
            .await?;
        info!(
            "command {} {} in {}",
            self.name,
            if enabled { "enabled" } else { "disabled" },
            Scope::from(guild)
        );

        parley.emit(DispatchEvent::CommandStatusChange {
            guild,
            command: self.name.clone(),
            enabled,
        });
        Ok(())
    }

    /// Whether the author of `ctxt` could run this command where they sent it.
    pub async fn is_usable(&self, ctxt: &DispatchContext) -> anyhow::Result<bool> {
        if self.guild_only && ctxt.message.is_direct() {
            return Ok(false);
        }
        Ok(self.is_enabled_in(&ctxt.parley, ctxt.message.guild_id).await?
            && self.handler.has_permission(ctxt, self).await? == PermissionCheck::Allowed)
    }

    /// Replaces this command with a new definition of it.
    pub fn reload(&self, registry: &Registry, replacement: builder::CommandBuilder) -> Result<Arc<Command>, RegistrationError> {
        if replacement.name() != self.name {
            return Err(RegistrationError::ImmutableField("name"));
        }
        registry.reregister_command(replacement)
    }

    pub fn unload(&self, registry: &Registry) -> Result<Arc<Command>, RegistrationError> {
        registry.unregister_command(&self.name)
    }
}

/// Renders how to invoke `command` (a name, optionally followed by arguments).
///
/// With a prefix and/or bot name this is `` `prefix command` or `@Bot command` ``, otherwise just
/// `` `command` ``. Spaces become non-breaking so the usage never wraps.
pub fn usage(command: &str, prefix: Option<&str>, bot_name: Option<&str>) -> String {
    let command = command.nbsp();
    let prefix = prefix.filter(|p| !p.is_empty());

    let prefixed = prefix.map(|prefix| {
        let separator = if prefix.chars().count() > 1 && !prefix.ends_with(' ') { " " } else { "" };
        format!("`{}{command}`", format!("{prefix}{separator}").nbsp())
    });
    let mentioned = bot_name.map(|name| format!("`@{}\u{a0}{command}`", name.nbsp()));

    match (prefixed, mentioned) {
        (Some(prefixed), Some(mentioned)) => format!("{prefixed} or {mentioned}"),
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => format!("`{command}`"),
    }
}
