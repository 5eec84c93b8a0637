use std::sync::Mutex;
use std::time::Duration;

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::info;

use crate::util::rate_tracker::RateTracker;

/// Counters for everything the dispatcher does, registered into a registry owned by this handler
/// so that independent instances never collide.
pub struct MetricsHandler {
    pub registry: Registry,
    pub messages: IntCounter,
    pub commands: IntCounterVec,
    pub commands_rate_tracker: Mutex<RateTracker>,
    pub blocks: IntCounterVec,
    pub cancellations: IntCounterVec,
    pub command_errors: IntCounter,
    pub errors: IntCounter,
}
impl MetricsHandler {
    pub fn new() -> anyhow::Result<MetricsHandler> {
        let registry = Registry::new();

        let messages = IntCounter::new("messages", "Total number of messages handled")?;
        let commands = IntCounterVec::new(Opts::new("commands", "Total number of commands executed"), &["command"])?;
        let blocks = IntCounterVec::new(Opts::new("blocks", "Total number of blocked dispatches"), &["reason"])?;
        let cancellations = IntCounterVec::new(
            Opts::new("cancellations", "Total number of cancelled argument collections"),
            &["reason"],
        )?;
        let command_errors = IntCounter::new("command_errors", "Total number of errors raised by commands")?;
        let errors = IntCounter::new("errors", "Total number of errors raised while dispatching")?;

        registry.register(Box::new(messages.clone()))?;
        registry.register(Box::new(commands.clone()))?;
        registry.register(Box::new(blocks.clone()))?;
        registry.register(Box::new(cancellations.clone()))?;
        registry.register(Box::new(command_errors.clone()))?;
        registry.register(Box::new(errors.clone()))?;

        Ok(MetricsHandler {
            registry,
            messages,
            commands,
            commands_rate_tracker: Mutex::new(RateTracker::new(Duration::from_secs(60))),
            blocks,
            cancellations,
            command_errors,
            errors,
        })
    }

    pub fn add_message(&self) {
        self.messages.inc();
    }

    pub fn add_command(&self, name: &str) {
        self.commands.with_label_values(&[name]).inc();
        if let Ok(mut tracker) = self.commands_rate_tracker.lock() {
            tracker.add_sample();
        }
    }

    /// Commands ran over the last minute.
    pub fn get_commands_rate(&self) -> usize {
        self.commands_rate_tracker
            .lock()
            .map(|tracker| tracker.get_rate())
            .unwrap_or(0)
    }

    pub fn add_block(&self, reason: &str) {
        self.blocks.with_label_values(&[reason]).inc();
    }

    pub fn add_cancellation(&self, reason: &str) {
        self.cancellations.with_label_values(&[reason]).inc();
    }

    pub fn add_command_error(&self) {
        self.command_errors.inc();
    }

    pub fn add_error(&self) {
        self.errors.inc();
    }

    /// Renders every metric in the Prometheus text exposition format.
    pub fn gather(&self) -> anyhow::Result<String> {
        info!("Collecting prometheus metrics");

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
