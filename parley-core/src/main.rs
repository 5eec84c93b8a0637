use std::sync::Arc;

use parley_common::config::{ParleyConfig, CONFIG_LOCATION};
use parley_common::tracing_init;
use parley_core::command::registry::Registry;
use parley_core::settings::MemorySettings;
use parley_core::{Parley, ThreadSafeParley};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::console::{ConsoleTransport, CONSOLE_USER};

mod commands;
mod console;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match ParleyConfig::load(CONFIG_LOCATION) {
        Ok(config) => {
            tracing_init!(config.logging.filter);
            config
        },
        Err(e) => {
            tracing_init!();
            warn!("{e:#}, falling back to the default configuration");
            ParleyConfig {
                owners: vec![CONSOLE_USER],
                ..Default::default()
            }
        },
    };

    info!("Initialising");
    let registry = Arc::new(Registry::new());
    registry.register_default_types()?;
    commands::register(&registry)?;

    let transport = Arc::new(ConsoleTransport::new());
    let parley: ThreadSafeParley = Arc::new(Parley::new(
        config,
        registry,
        transport.clone(),
        Arc::new(MemorySettings::new()),
    )?);

    info!("Reading messages from stdin. Start a line with ^ to edit the previous message.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last = None;

    while let Some(line) = lines.next_line().await? {
        let (message, old) = match (line.strip_prefix('^'), &last) {
            (Some(content), Some(previous)) => (transport.edit_of(previous, content), Some(previous.clone())),
            (Some(_), None) => {
                warn!("there is no message to edit");
                continue;
            },
            (None, _) => (transport.message(&line), None),
        };

        if old.is_none() && transport.offer(&message) {
            continue;
        }
        last = Some(message.clone());

        let parley = parley.clone();
        tokio::spawn(async move { parley.handle_message(message, old).await });
    }

    info!("stdin closed, {} commands ran in the last minute", parley.metrics_handler.get_commands_rate());
    Ok(())
}
