use std::time::Duration;

use async_trait::async_trait;
use parley_core::command::arguments::value::{ArgValue, CommandArgs};
use parley_core::command::arguments::ArgumentBuilder;
use parley_core::command::builder::CommandBuilder;
use parley_core::command::errors::{FriendlyError, RegistrationError};
use parley_core::command::group::CommandGroup;
use parley_core::command::registry::Registry;
use parley_core::command::CommandHandler;
use parley_core::dispatch::context::DispatchContext;
use parley_string_fmt::Markdown;

struct Ping;

#[async_trait]
impl CommandHandler for Ping {
    async fn run(&self, ctxt: &DispatchContext, _: CommandArgs, _: bool) -> anyhow::Result<()> {
        ctxt.say(&format!(
            "Pong! {} commands in the last minute.",
            ctxt.parley.metrics_handler.get_commands_rate()
        ))
        .await?;
        Ok(())
    }
}

struct Add;

#[async_trait]
impl CommandHandler for Add {
    async fn run(&self, ctxt: &DispatchContext, args: CommandArgs, _: bool) -> anyhow::Result<()> {
        let total: f64 = args
            .get("numbers")
            .and_then(ArgValue::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(ArgValue::as_f64)
            .sum();

        ctxt.reply(&format!("Sum: {total}")).await?;
        Ok(())
    }
}

struct Prefix;

#[async_trait]
impl CommandHandler for Prefix {
    async fn run(&self, ctxt: &DispatchContext, args: CommandArgs, _: bool) -> anyhow::Result<()> {
        let parley = &ctxt.parley;
        let guild = ctxt.message.guild_id;
        let requested = args.get("prefix").and_then(ArgValue::as_str).unwrap_or_default();

        if requested.is_empty() {
            let current = match parley.prefix_for(guild).await? {
                Some(prefix) => format!("The command prefix is {}.", prefix.codestring()),
                None => "There is no command prefix.".to_owned(),
            };
            ctxt.reply(&format!("{current} To run commands, use {}.", ctxt.usage("command")))
                .await?;
            return Ok(());
        }

        if !parley.is_owner(ctxt.message.author.id) {
            return Err(FriendlyError::new("Only the bot owner may change the command prefix.").into());
        }

        let response = match requested.to_lowercase().as_str() {
            "default" => {
                parley.reset_prefix(guild).await?;
                match parley.prefix_for(guild).await? {
                    Some(prefix) => format!("Reset the command prefix to the default (currently {}).", prefix.codestring()),
                    None => "Reset the command prefix to the default (currently no prefix).".to_owned(),
                }
            },
            "none" => {
                parley.set_prefix(guild, "").await?;
                "Removed the command prefix entirely.".to_owned()
            },
            _ => {
                parley.set_prefix(guild, requested).await?;
                format!("Set the command prefix to {}.", requested.codestring())
            },
        };

        ctxt.reply(&format!("{response} To run commands, use {}.", ctxt.usage("command")))
            .await?;
        Ok(())
    }
}

struct Toggle {
    enable: bool,
}

#[async_trait]
impl CommandHandler for Toggle {
    async fn run(&self, ctxt: &DispatchContext, args: CommandArgs, _: bool) -> anyhow::Result<()> {
        let guild = ctxt.message.guild_id;
        let verb = if self.enable { "Enabled" } else { "Disabled" };

        match args.get("target") {
            Some(ArgValue::Command(command)) => {
                if command.guarded {
                    return Err(FriendlyError::new(format!("The `{}` command cannot be toggled.", command.name)).into());
                }
                command.set_enabled_in(&ctxt.parley, guild, self.enable).await?;
                ctxt.reply(&format!("{verb} the `{}` command.", command.name)).await?;
            },
            Some(ArgValue::Group(group)) => {
                if group.guarded {
                    return Err(FriendlyError::new(format!("The `{}` group cannot be toggled.", group.name)).into());
                }
                group.set_enabled_in(&ctxt.parley, guild, self.enable).await?;
                ctxt.reply(&format!("{verb} the `{}` group.", group.name)).await?;
            },
            _ => anyhow::bail!("no toggle target was collected"),
        }
        Ok(())
    }
}

struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn run(&self, ctxt: &DispatchContext, args: CommandArgs, _: bool) -> anyhow::Result<()> {
        let registry = &ctxt.parley.registry;

        if let Some(command) = args.get("command").and_then(ArgValue::as_command) {
            let format = command.format().unwrap_or_default();
            let mut help = format!(
                "Command **{}**: {}\n**Format:** {}",
                command.name,
                command.description,
                ctxt.usage(format!("{} {format}", command.name).trim_end())
            );
            if !command.aliases.is_empty() {
                help.push_str(&format!("\n**Aliases:** {}", command.aliases.join(", ")));
            }
            if let Some(details) = &command.details {
                help.push_str(&format!("\n**Details:** {details}"));
            }
            if !command.examples.is_empty() {
                help.push_str(&format!("\n**Examples:**\n{}", command.examples.join("\n")));
            }
            ctxt.say(&help).await?;
            return Ok(());
        }

        let mut help = format!("To run a command, use {}.\n", ctxt.usage("command"));
        for group in registry.groups() {
            let mut listed = vec![];
            for command in registry.group_commands(&group.id) {
                if !command.hidden && command.is_usable(ctxt).await? {
                    listed.push(format!("**{}:** {}", command.name, command.description));
                }
            }
            if !listed.is_empty() {
                help.push_str(&format!("\n__{}__\n{}\n", group.name, listed.join("\n")));
            }
        }
        ctxt.say(help.trim_end()).await?;
        Ok(())
    }
}

/// Registers the demonstration groups and commands.
pub fn register(registry: &Registry) -> Result<(), RegistrationError> {
    registry.register_groups([
        CommandGroup::new("util", "Utility"),
        CommandGroup::new("commands", "Commands").guarded(),
    ])?;

    registry.register_commands([
        CommandBuilder::new("ping")
            .group("util")
            .description("Checks that the bot is responding.")
            .throttling(5, Duration::from_secs(10))
            .handler(Ping),
        CommandBuilder::new("add")
            .aliases(["sum"])
            .group("util")
            .description("Adds numbers together.")
            .examples(["add 42 1337", "add 1.5 2.5 -1"])
            .args([ArgumentBuilder::new("numbers")
                .label("number")
                .prompt("What numbers would you like to add? Every message you send will be interpreted as a single number.")
                .kind("float")
                .infinite()])
            .handler(Add),
        CommandBuilder::new("prefix")
            .group("util")
            .description("Shows or sets the command prefix.")
            .format("[prefix/\"default\"/\"none\"]")
            .details("If no prefix is provided, the current prefix is shown. Only the bot owner may change it.")
            .args([ArgumentBuilder::new("prefix")
                .prompt("What would you like to set the prefix to?")
                .kind("string")
                .max(15.0)
                .default_value(ArgValue::String(String::new()))])
            .handler(Prefix),
        CommandBuilder::new("help")
            .group("util")
            .description("Lists the available commands, or shows details for one.")
            .guarded()
            .args([ArgumentBuilder::new("command")
                .prompt("Which command would you like to view the help for?")
                .kind("command")
                .default_value(ArgValue::String(String::new()))])
            .handler(Help),
        CommandBuilder::new("enable")
            .group("commands")
            .description("Enables a command or command group.")
            .owner_only()
            .guarded()
            .args([ArgumentBuilder::new("target")
                .label("command/group")
                .prompt("Which command or group would you like to enable?")
                .union(["group", "command"])])
            .handler(Toggle { enable: true }),
        CommandBuilder::new("disable")
            .group("commands")
            .description("Disables a command or command group.")
            .owner_only()
            .guarded()
            .args([ArgumentBuilder::new("target")
                .label("command/group")
                .prompt("Which command or group would you like to disable?")
                .union(["group", "command"])])
            .handler(Toggle { enable: false }),
    ])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use parley_common::config::ParleyConfig;
    use parley_core::settings::MemorySettings;
    use parley_core::transport::{
        Author, ChannelId, Destination, IncomingMessage, SentMessage, Transport, UserId,
    };
    use parley_core::{Parley, ThreadSafeParley};

    use super::*;

    const OWNER: UserId = 1;
    const STRANGER: UserId = 2;

    static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1000);

    /// Keeps everything sent, and never receives a reply.
    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
        next_id: AtomicU64,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, destination: Destination, content: &str) -> anyhow::Result<SentMessage> {
            self.sent.lock().unwrap().push(content.to_owned());
            Ok(SentMessage {
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
                destination,
            })
        }

        async fn edit(&self, _: &SentMessage, _: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn delete(&self, _: &SentMessage) -> anyhow::Result<()> {
            Ok(())
        }

        async fn await_reply(
            &self,
            _: UserId,
            _: ChannelId,
            _: Option<Duration>,
        ) -> anyhow::Result<Option<IncomingMessage>> {
            Ok(None)
        }
    }

    fn bot() -> (ThreadSafeParley, Arc<Recorder>) {
        let config = ParleyConfig {
            owners: vec![OWNER],
            ..Default::default()
        };
        let registry = Arc::new(Registry::new());
        registry.register_default_types().unwrap();
        register(&registry).unwrap();

        let transport = Arc::new(Recorder::default());
        let parley = Parley::new(config, registry, transport.clone(), Arc::new(MemorySettings::new())).unwrap();
        (Arc::new(parley), transport)
    }

    async fn send(parley: &ThreadSafeParley, author: UserId, content: &str) {
        let message = IncomingMessage {
            id: NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed),
            author: Author {
                id: author,
                name: "tester".to_owned(),
                bot: false,
            },
            channel_id: 10,
            guild_id: None,
            content: content.to_owned(),
            nsfw: false,
            edited_timestamp: None,
        };
        parley.handle_message(message, None).await;
    }

    fn last(transport: &Recorder) -> String {
        transport.sent.lock().unwrap().last().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn prefix_shows_the_current_prefix_without_prompting() {
        let (parley, transport) = bot();

        send(&parley, STRANGER, "!prefix").await;
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
        assert!(last(&transport).starts_with("The command prefix is `!`. To run commands, use "));
    }

    #[tokio::test]
    async fn owner_changes_the_prefix() {
        let (parley, transport) = bot();

        send(&parley, OWNER, "!prefix ?").await;
        assert!(last(&transport).starts_with("Set the command prefix to `?`."));
        assert_eq!(parley.prefix_for(None).await.unwrap().as_deref(), Some("?"));

        send(&parley, OWNER, "?prefix none").await;
        assert!(last(&transport).starts_with("Removed the command prefix entirely."));
        assert_eq!(parley.prefix_for(None).await.unwrap(), None);

        send(&parley, OWNER, "prefix default").await;
        assert!(last(&transport).starts_with("Reset the command prefix to the default (currently `!`)."));
        assert_eq!(parley.prefix_for(None).await.unwrap().as_deref(), Some("!"));
    }

    #[tokio::test]
    async fn only_owners_change_the_prefix() {
        let (parley, transport) = bot();

        send(&parley, STRANGER, "!prefix ?").await;
        assert_eq!(last(&transport), "Only the bot owner may change the command prefix.");
        assert_eq!(parley.prefix_for(None).await.unwrap().as_deref(), Some("!"));
    }

    #[tokio::test]
    async fn add_sums_its_arguments() {
        let (parley, transport) = bot();

        send(&parley, STRANGER, "!sum 1.5 2.5 -1").await;
        assert_eq!(last(&transport), "Sum: 3");
    }
}
