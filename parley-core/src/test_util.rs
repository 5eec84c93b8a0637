use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parley_common::config::config::{Bot, Prefixes};
use parley_common::config::ParleyConfig;

use crate::command::arguments::value::CommandArgs;
use crate::command::builder::CommandBuilder;
use crate::command::group::CommandGroup;
use crate::command::registry::Registry;
use crate::command::CommandHandler;
use crate::dispatch::context::DispatchContext;
use crate::parley::{Parley, ThreadSafeParley};
use crate::settings::MemorySettings;
use crate::transport::mock::MockTransport;
use crate::transport::{Author, GuildId, IncomingMessage, UserId};

pub const BOT_ID: u64 = 999;
pub const USER_ID: UserId = 1;
pub const OWNER_ID: UserId = 2;
pub const GUILD_ID: GuildId = 100;
pub const DM_CHANNEL: u64 = 10;
pub const GUILD_CHANNEL: u64 = 20;

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

pub struct Harness {
    pub parley: ThreadSafeParley,
    pub registry: Arc<Registry>,
    pub transport: Arc<MockTransport>,
}

/// A bot with the default argument types and a `util` group, prefix `!`, talking to a
/// [`MockTransport`].
pub fn harness() -> Harness {
    let config = ParleyConfig {
        bot: Bot {
            id: BOT_ID,
            name: "Parley".to_owned(),
            self_operated: false,
        },
        prefix: Prefixes {
            default: "!".to_owned(),
        },
        owners: vec![OWNER_ID],
        ..Default::default()
    };

    let registry = Arc::new(Registry::new());
    registry.register_default_types().unwrap();
    registry.register_group(CommandGroup::new("util", "Utility")).unwrap();

    let transport = Arc::new(MockTransport::new());
    let parley = Parley::new(config, registry.clone(), transport.clone(), Arc::new(MemorySettings::new())).unwrap();

    Harness {
        parley: Arc::new(parley),
        registry,
        transport,
    }
}

pub fn message_from(author: UserId, guild: Option<GuildId>, content: &str) -> IncomingMessage {
    IncomingMessage {
        id: NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed),
        author: Author {
            id: author,
            name: "tester".to_owned(),
            bot: false,
        },
        channel_id: if guild.is_some() { GUILD_CHANNEL } else { DM_CHANNEL },
        guild_id: guild,
        content: content.to_owned(),
        nsfw: false,
        edited_timestamp: None,
    }
}

/// `message` edited to say `content`.
pub fn edited(message: &IncomingMessage, content: &str) -> IncomingMessage {
    IncomingMessage {
        content: content.to_owned(),
        edited_timestamp: Some(1_700_000_000_000),
        ..message.clone()
    }
}

pub fn context_from(h: &Harness, author: UserId, guild: Option<GuildId>, content: &str) -> DispatchContext {
    DispatchContext::new(
        h.parley.clone(),
        message_from(author, guild, content),
        None,
        None,
        None,
        Some("!".to_owned()),
    )
}

/// A direct message from [`USER_ID`].
pub fn context(h: &Harness, content: &str) -> DispatchContext {
    context_from(h, USER_ID, None, content)
}

pub fn context_in_guild(h: &Harness, content: &str) -> DispatchContext {
    context_from(h, USER_ID, Some(GUILD_ID), content)
}

pub struct NoopHandler;

#[async_trait]
impl CommandHandler for NoopHandler {
    async fn run(&self, _: &DispatchContext, _: CommandArgs, _: bool) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A valid command in the `util` group that does nothing.
pub fn noop_command(name: &str) -> CommandBuilder {
    CommandBuilder::new(name)
        .group("util")
        .description("Does nothing")
        .handler(NoopHandler)
}
