// See config.toml for information on the variables here.

use std::time::Duration;

use serde::Deserialize;

#[derive(Deserialize, Clone, Debug, Default)]
pub struct ParleyConfig {
    pub bot: Bot,
    pub prefix: Prefixes,
    /// Users exempt from throttling and permitted to run owner-only commands.
    #[serde(default)]
    pub owners: Vec<u64>,
    #[serde(default)]
    pub dispatch: Dispatch,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Bot {
    pub id: u64,
    #[serde(default = "default_bot_name")]
    pub name: String,
    /// When set, only messages authored by the bot's own account are handled.
    #[serde(default)]
    pub self_operated: bool,
}
impl Default for Bot {
    fn default() -> Self {
        Self {
            id: 0,
            name: default_bot_name(),
            self_operated: false,
        }
    }
}

fn default_bot_name() -> String {
    "parley".to_owned()
}

#[derive(Deserialize, Clone, Debug)]
pub struct Prefixes {
    /// Empty means mention-only.
    pub default: String,
}
impl Default for Prefixes {
    fn default() -> Self {
        Self { default: "!".to_owned() }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Dispatch {
    /// Seconds during which editing a message re-runs its command. 0 disables edit handling.
    #[serde(default = "default_editable_duration")]
    command_editable_duration: u64,
}
impl Dispatch {
    pub fn new(command_editable_duration: Duration) -> Self {
        Self {
            command_editable_duration: command_editable_duration.as_secs(),
        }
    }

    pub fn command_editable_duration(&self) -> Duration {
        Duration::from_secs(self.command_editable_duration)
    }
}
impl Default for Dispatch {
    fn default() -> Self {
        Self {
            command_editable_duration: default_editable_duration(),
        }
    }
}

fn default_editable_duration() -> u64 {
    30
}

#[derive(Deserialize, Clone, Debug)]
pub struct Logging {
    pub filter: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
        }
    }
}
