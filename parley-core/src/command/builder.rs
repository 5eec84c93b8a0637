use std::sync::Arc;
use std::time::Duration;

use regex::Regex;

use super::arguments::collector::ArgumentCollector;
use super::arguments::ArgumentBuilder;
use super::errors::RegistrationError;
use super::registry::Registry;
use super::throttle::{Throttles, Throttling};
use super::{ArgsSpec, Command, CommandHandler, TCommandHandler};

enum ArgsBuilder {
    Collector(Vec<ArgumentBuilder>),
    Single,
    Multiple(Option<usize>),
}

/// Describes a [`Command`]. Argument types and the group are checked when it is built.
pub struct CommandBuilder {
    name: String,
    aliases: Vec<String>,
    group: Option<String>,
    member_name: Option<String>,
    description: Option<String>,
    details: Option<String>,
    format: Option<String>,
    examples: Vec<String>,
    guild_only: bool,
    owner_only: bool,
    nsfw: bool,
    guarded: bool,
    default_handling: bool,
    unknown: bool,
    hidden: bool,
    user_permissions: Vec<String>,
    client_permissions: Vec<String>,
    args: ArgsBuilder,
    args_single_quotes: bool,
    args_prompt_limit: Option<u32>,
    patterns: Vec<String>,
    throttling: Option<(u32, Duration)>,
    handler: Option<TCommandHandler>,
}

impl CommandBuilder {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: name.as_ref().to_lowercase(),
            aliases: vec![],
            group: None,
            member_name: None,
            description: None,
            details: None,
            format: None,
            examples: vec![],
            guild_only: false,
            owner_only: false,
            nsfw: false,
            guarded: false,
            default_handling: true,
            unknown: false,
            hidden: false,
            user_permissions: vec![],
            client_permissions: vec![],
            args: ArgsBuilder::Single,
            args_single_quotes: true,
            args_prompt_limit: None,
            patterns: vec![],
            throttling: None,
            handler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.aliases = aliases.into_iter().map(|a| a.as_ref().to_lowercase()).collect();
        self
    }

    pub fn group(mut self, group: impl AsRef<str>) -> Self {
        self.group = Some(group.as_ref().to_lowercase());
        self
    }

    /// Defaults to the command name.
    pub fn member_name(mut self, member_name: impl AsRef<str>) -> Self {
        self.member_name = Some(member_name.as_ref().to_lowercase());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    pub fn guild_only(mut self) -> Self {
        self.guild_only = true;
        self
    }

    pub fn owner_only(mut self) -> Self {
        self.owner_only = true;
        self
    }

    pub fn nsfw(mut self) -> Self {
        self.nsfw = true;
        self
    }

    pub fn guarded(mut self) -> Self {
        self.guarded = true;
        self
    }

    /// Stops the command from being invoked by name. It can still match its patterns.
    pub fn no_default_handling(mut self) -> Self {
        self.default_handling = false;
        self
    }

    /// Makes this the command that receives unresolved invocations.
    pub fn unknown(mut self) -> Self {
        self.unknown = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn user_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn client_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.client_permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = ArgumentBuilder>,
    {
        self.args = ArgsBuilder::Collector(args.into_iter().collect());
        self
    }

    /// Passes the argument string split into values. With a `count`, the last value holds the
    /// unsplit remainder.
    pub fn args_multiple(mut self, count: Option<usize>) -> Self {
        self.args = ArgsBuilder::Multiple(count);
        self
    }

    pub fn args_single_quotes(mut self, allowed: bool) -> Self {
        self.args_single_quotes = allowed;
        self
    }

    pub fn args_prompt_limit(mut self, limit: u32) -> Self {
        self.args_prompt_limit = Some(limit);
        self
    }

    /// Also triggers the command on any message matching `pattern`.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn throttling(mut self, usages: u32, duration: Duration) -> Self {
        self.throttling = Some((usages, duration));
        self
    }

    pub fn handler(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self, registry: &Registry) -> Result<Command, RegistrationError> {
        if self.name.is_empty() || self.name.contains(char::is_whitespace) {
            return Err(RegistrationError::InvalidInfo(format!(
                "command name {:?} must be a single non-empty word",
                self.name
            )));
        }
        if self.aliases.iter().any(|a| a.is_empty() || a.contains(char::is_whitespace)) {
            return Err(RegistrationError::InvalidInfo(format!(
                "command {} has an invalid alias",
                self.name
            )));
        }
        let Some(group_id) = self.group else {
            return Err(RegistrationError::InvalidInfo(format!("command {} has no group", self.name)));
        };
        let Some(description) = self.description else {
            return Err(RegistrationError::InvalidInfo(format!(
                "command {} has no description",
                self.name
            )));
        };
        let Some(handler) = self.handler else {
            return Err(RegistrationError::InvalidInfo(format!("command {} has no handler", self.name)));
        };

        let args = match self.args {
            ArgsBuilder::Collector(args) => {
                let args = args
                    .into_iter()
                    .map(|arg| arg.build(registry))
                    .collect::<Result<Vec<_>, _>>()?;
                ArgsSpec::Collector(ArgumentCollector::new(args, self.args_prompt_limit)?)
            },
            ArgsBuilder::Single => ArgsSpec::Single,
            ArgsBuilder::Multiple(Some(count)) if count < 2 => {
                return Err(RegistrationError::InvalidInfo(format!(
                    "command {} must split into at least 2 values",
                    self.name
                )));
            },
            ArgsBuilder::Multiple(count) => ArgsSpec::Multiple { count },
        };

        let patterns = self
            .patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| RegistrationError::InvalidPattern(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        let throttles = match self.throttling {
            Some((usages, duration)) => Some(Throttles::new(Throttling::new(usages, duration)?)),
            None => None,
        };

        Ok(Command {
            member_name: self.member_name.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            aliases: self.aliases,
            group_id,
            description,
            details: self.details,
            format: self.format,
            examples: self.examples,
            guild_only: self.guild_only,
            owner_only: self.owner_only,
            nsfw: self.nsfw,
            guarded: self.guarded,
            default_handling: self.default_handling,
            unknown: self.unknown,
            hidden: self.hidden,
            user_permissions: self.user_permissions,
            client_permissions: self.client_permissions,
            args,
            args_single_quotes: self.args_single_quotes,
            patterns,
            throttles,
            handler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{harness, noop_command, NoopHandler};

    #[test]
    fn normalises_case() {
        let h = harness();
        let command = CommandBuilder::new("Ping")
            .aliases(["PONG"])
            .group("Util")
            .description("Checks the bot is alive")
            .handler(NoopHandler)
            .build(&h.registry)
            .unwrap();

        assert_eq!(command.name, "ping");
        assert_eq!(command.aliases, vec!["pong"]);
        assert_eq!(command.group_id, "util");
        assert_eq!(command.member_name, "ping");
    }

    #[test]
    fn rejects_bad_definitions() {
        let h = harness();

        assert!(matches!(
            CommandBuilder::new("ping").group("util").handler(NoopHandler).build(&h.registry),
            Err(RegistrationError::InvalidInfo(_))
        ));
        assert!(matches!(
            noop_command("two words").build(&h.registry),
            Err(RegistrationError::InvalidInfo(_))
        ));
        assert!(matches!(
            noop_command("ping").throttling(0, Duration::from_secs(5)).build(&h.registry),
            Err(RegistrationError::InvalidThrottling(_))
        ));
        assert!(matches!(
            noop_command("ping").pattern("(unclosed").build(&h.registry),
            Err(RegistrationError::InvalidPattern(_))
        ));
        assert!(matches!(
            noop_command("ping").args_multiple(Some(1)).build(&h.registry),
            Err(RegistrationError::InvalidInfo(_))
        ));
        assert!(matches!(
            noop_command("ping")
                .args([ArgumentBuilder::new("n").prompt("?").kind("integer").infinite(),
                    ArgumentBuilder::new("m").prompt("?").kind("integer")])
                .build(&h.registry),
            Err(RegistrationError::ArgumentOrder(_))
        ));
    }
}
