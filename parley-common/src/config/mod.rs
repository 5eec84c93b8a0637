pub mod config;

use std::path::Path;

use anyhow::Context;

pub use self::config::ParleyConfig;

pub static CONFIG_LOCATION: &str = "./config.toml";

impl ParleyConfig {
    /// Reads and parses the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<ParleyConfig> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("failed to read config at {}", path.display()))?;

        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<ParleyConfig> {
        toml::from_str::<ParleyConfig>(contents).context("failed to parse config")
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owners.contains(&user_id)
    }
}
