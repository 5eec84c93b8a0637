use serde_json::Value;
use tracing::info;

use super::errors::RegistrationError;
use crate::events::DispatchEvent;
use crate::parley::Parley;
use crate::settings::{enabled_in, group_key, Scope};
use crate::transport::GuildId;

/// A named set of commands that can be enabled or disabled together.
#[derive(Debug)]
pub struct CommandGroup {
    /// Lowercase, unique.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Guarded groups can never be disabled.
    pub guarded: bool,
}

impl CommandGroup {
    pub fn new(id: impl AsRef<str>, name: impl Into<String>) -> Self {
        Self {
            id: id.as_ref().to_lowercase(),
            name: name.into(),
            guarded: false,
        }
    }

    pub fn guarded(mut self) -> Self {
        self.guarded = true;
        self
    }

    pub async fn is_enabled_in(&self, parley: &Parley, guild: Option<GuildId>) -> anyhow::Result<bool> {
        if self.guarded {
            return Ok(true);
        }
        enabled_in(&*parley.settings, guild, &group_key(&self.id)).await
    }

    /// Enables or disables the group everywhere (`guild` is `None`) or in one guild.
    pub async fn set_enabled_in(&self, parley: &Parley, guild: Option<GuildId>, enabled: bool) -> anyhow::Result<()> {
        if self.guarded {
            return Err(RegistrationError::Guarded(format!("group {}", self.id)).into());
        }

        parley
            .settings
            .set(Scope::from(guild), &group_key(&self.id), Value::Bool(enabled))
            .await?;
        info!("group {} {} in {}", self.id, if enabled { "enabled" } else { "disabled" }, Scope::from(guild));

        parley.emit(DispatchEvent::GroupStatusChange {
            guild,
            group: self.id.clone(),
            enabled,
        });
        Ok(())
    }
}
