//! Persistent-ish settings, keyed by scope.
//!
//! The core only reads and writes a handful of keys through this (`prefix`, `cmd-<name>`,
//! `grp-<id>`); how they are stored is up to the [`SettingProvider`] implementation.

use std::collections::HashMap;
use std::fmt::Display;

use async_trait::async_trait;
use parley_common::GLOBAL_SCOPE;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::transport::GuildId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Guild(GuildId),
}
impl From<Option<GuildId>> for Scope {
    fn from(value: Option<GuildId>) -> Self {
        value.map_or(Scope::Global, Scope::Guild)
    }
}
impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => f.write_str(GLOBAL_SCOPE),
            Self::Guild(id) => write!(f, "{id}"),
        }
    }
}

#[async_trait]
pub trait SettingProvider: Send + Sync {
    async fn get(&self, scope: Scope, key: &str) -> anyhow::Result<Option<Value>>;

    async fn set(&self, scope: Scope, key: &str, value: Value) -> anyhow::Result<()>;

    /// Returns the removed value, if there was one.
    async fn remove(&self, scope: Scope, key: &str) -> anyhow::Result<Option<Value>>;

    async fn clear(&self, scope: Scope) -> anyhow::Result<()>;

    async fn get_or(&self, scope: Scope, key: &str, default: Value) -> anyhow::Result<Value> {
        Ok(self.get(scope, key).await?.unwrap_or(default))
    }
}

pub fn command_key(name: &str) -> String {
    format!("cmd-{name}")
}

pub fn group_key(id: &str) -> String {
    format!("grp-{id}")
}

pub static PREFIX_KEY: &str = "prefix";

/// Reads an enable flag: the guild's own setting, else the global one, else enabled.
pub async fn enabled_in(settings: &dyn SettingProvider, guild: Option<GuildId>, key: &str) -> anyhow::Result<bool> {
    if let Some(guild) = guild {
        if let Some(enabled) = settings.get(Scope::Guild(guild), key).await?.and_then(|v| v.as_bool()) {
            return Ok(enabled);
        }
    }

    Ok(settings
        .get(Scope::Global, key)
        .await?
        .and_then(|v| v.as_bool())
        .unwrap_or(true))
}

/// Settings held in memory only. Lost when the process exits.
#[derive(Default)]
pub struct MemorySettings {
    scopes: RwLock<HashMap<Scope, HashMap<String, Value>>>,
}
impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingProvider for MemorySettings {
    async fn get(&self, scope: Scope, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self
            .scopes
            .read()
            .await
            .get(&scope)
            .and_then(|settings| settings.get(key))
            .cloned())
    }

    async fn set(&self, scope: Scope, key: &str, value: Value) -> anyhow::Result<()> {
        self.scopes
            .write()
            .await
            .entry(scope)
            .or_default()
            .insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, scope: Scope, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self
            .scopes
            .write()
            .await
            .get_mut(&scope)
            .and_then(|settings| settings.remove(key)))
    }

    async fn clear(&self, scope: Scope) -> anyhow::Result<()> {
        self.scopes.write().await.remove(&scope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn scopes_are_independent() {
        let settings = MemorySettings::new();
        settings.set(Scope::Guild(1), "prefix", json!("?")).await.unwrap();
        settings.set(Scope::Global, "prefix", json!("!")).await.unwrap();

        assert_eq!(settings.get(Scope::Guild(1), "prefix").await.unwrap(), Some(json!("?")));
        assert_eq!(settings.get(Scope::Guild(2), "prefix").await.unwrap(), None);
        assert_eq!(settings.get(Scope::Global, "prefix").await.unwrap(), Some(json!("!")));
    }

    #[tokio::test]
    async fn remove_clear_and_default() {
        let settings = MemorySettings::new();
        settings.set(Scope::Guild(1), "cmd-ping", json!(false)).await.unwrap();
        settings.set(Scope::Guild(1), "grp-util", json!(false)).await.unwrap();

        assert_eq!(
            settings.remove(Scope::Guild(1), "cmd-ping").await.unwrap(),
            Some(json!(false))
        );
        assert_eq!(
            settings.get_or(Scope::Guild(1), "cmd-ping", json!(true)).await.unwrap(),
            json!(true)
        );

        settings.clear(Scope::Guild(1)).await.unwrap();
        assert_eq!(settings.get(Scope::Guild(1), "grp-util").await.unwrap(), None);
    }

    #[tokio::test]
    async fn guild_flag_falls_back_to_global() {
        let settings = MemorySettings::new();
        assert!(enabled_in(&settings, Some(1), "cmd-ping").await.unwrap());

        settings.set(Scope::Global, "cmd-ping", json!(false)).await.unwrap();
        assert!(!enabled_in(&settings, None, "cmd-ping").await.unwrap());
        assert!(!enabled_in(&settings, Some(1), "cmd-ping").await.unwrap());

        settings.set(Scope::Guild(1), "cmd-ping", json!(true)).await.unwrap();
        assert!(enabled_in(&settings, Some(1), "cmd-ping").await.unwrap());
        assert!(!enabled_in(&settings, Some(2), "cmd-ping").await.unwrap());
    }

    #[test]
    fn scope_display() {
        assert_eq!(Scope::Global.to_string(), "global");
        assert_eq!(Scope::from(Some(42)).to_string(), "42");
    }
}
