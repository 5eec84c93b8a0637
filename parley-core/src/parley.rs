use std::sync::Arc;

use parley_common::config::ParleyConfig;
use parley_common::metrics_handler::MetricsHandler;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::info;

use crate::command::registry::Registry;
use crate::dispatch::{self, Dispatcher};
use crate::events::DispatchEvent;
use crate::settings::{PREFIX_KEY, Scope, SettingProvider};
use crate::transport::{GuildId, IncomingMessage, Transport, UserId};

pub type ThreadSafeParley = Arc<Parley>;

/// Subscribers that fall further behind than this miss events.
const EVENT_CAPACITY: usize = 256;

/// Everything a running bot shares: configuration, the command registry, the transport, settings
/// storage, dispatch state and metrics.
pub struct Parley {
    pub config: ParleyConfig,
    pub registry: Arc<Registry>,
    pub transport: Arc<dyn Transport>,
    pub settings: Arc<dyn SettingProvider>,
    pub dispatcher: Dispatcher,
    pub metrics_handler: MetricsHandler,
    events: broadcast::Sender<DispatchEvent>,
}

impl Parley {
    pub fn new(
        config: ParleyConfig,
        registry: Arc<Registry>,
        transport: Arc<dyn Transport>,
        settings: Arc<dyn SettingProvider>,
    ) -> anyhow::Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            dispatcher: Dispatcher::new(config.dispatch.command_editable_duration()),
            metrics_handler: MetricsHandler::new()?,
            config,
            registry,
            transport,
            settings,
            events,
        })
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.config.is_owner(user)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }

    pub fn emit(&self, event: DispatchEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// The command prefix in effect in `guild` (`None` meaning direct conversations). `None` if
    /// commands can only be invoked by mention there.
    pub async fn prefix_for(&self, guild: Option<GuildId>) -> anyhow::Result<Option<String>> {
        let mut prefix = None;
        if let Some(guild) = guild {
            prefix = self.settings.get(Scope::Guild(guild), PREFIX_KEY).await?;
        }
        if prefix.as_ref().is_none_or(Value::is_null) {
            prefix = self.settings.get(Scope::Global, PREFIX_KEY).await?;
        }

        let prefix = match prefix {
            Some(Value::String(prefix)) => prefix,
            _ => self.config.prefix.default.clone(),
        };
        Ok((!prefix.is_empty()).then_some(prefix))
    }

    /// Sets the prefix for `guild`, or the global one. An empty prefix means mention-only.
    pub async fn set_prefix(&self, guild: Option<GuildId>, prefix: &str) -> anyhow::Result<()> {
        self.settings
            .set(Scope::from(guild), PREFIX_KEY, Value::String(prefix.to_owned()))
            .await?;
        self.prefix_changed(guild).await
    }

    /// Removes the prefix for `guild` (or the global one) so the next level applies again.
    pub async fn reset_prefix(&self, guild: Option<GuildId>) -> anyhow::Result<()> {
        self.settings.remove(Scope::from(guild), PREFIX_KEY).await?;
        self.prefix_changed(guild).await
    }

    async fn prefix_changed(&self, guild: Option<GuildId>) -> anyhow::Result<()> {
        let prefix = self.prefix_for(guild).await?;
        info!("prefix in {} is now {prefix:?}", Scope::from(guild));
        self.emit(DispatchEvent::PrefixChange { guild, prefix });
        Ok(())
    }

    /// Dispatches a message, or an edit of one when `old` is given.
    pub async fn handle_message(self: &Arc<Self>, message: IncomingMessage, old: Option<IncomingMessage>) {
        dispatch::handle_message(self.clone(), message, old).await;
    }
}
