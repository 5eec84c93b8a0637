//! Resolving a message to a command.
//!
//! Resolution happens in this order:
//!
//! 1. Every registered command's patterns, in registration order, against the raw message text.
//!    The first match wins and its captures become the command's arguments.
//! 2. The prefix form, `<prefix><name>`, or the mention form, `@bot [prefix]<name>`. The pattern
//!    combining both is built once per prefix and cached.
//! 3. In direct conversations only, a bare `<name>`.
//!
//! A name that does not resolve to exactly one command that accepts name invocations yields a
//! context for the unknown command (or for no command, if none is registered), so that the
//! unknown-command path still runs.

use parley_common::util::regex::BARE_COMMAND;
use regex::Regex;
use tracing::debug;

use super::context::DispatchContext;
use crate::parley::ThreadSafeParley;
use crate::transport::IncomingMessage;

/// Builds the pattern matching `prefix` and mention invocations. Group 1 is the prefix or
/// mention, group 2 the command name.
pub fn build_command_pattern(prefix: Option<&str>, bot_id: u64) -> Result<Regex, regex::Error> {
    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => {
            let prefix = regex::escape(prefix);
            Regex::new(&format!(
                r"(?i)^(<@!?{bot_id}>\s+(?:{prefix}\s*)?|{prefix}\s*)([^\s]+)"
            ))
        },
        None => Regex::new(&format!(r"(?i)(^<@!?{bot_id}>\s+)([^\s]+)")),
    }
}

fn match_default(
    parley: &ThreadSafeParley,
    message: &IncomingMessage,
    pattern: &Regex,
    name_index: usize,
    prefix: &Option<String>,
) -> Option<DispatchContext> {
    let captures = pattern.captures(&message.content)?;
    let name = captures.get(name_index)?.as_str();
    let whole = captures.get(0)?;

    let found = parley.registry.find_commands(name, true);
    let (command, arg_string) = match &found[..] {
        [command] if command.default_handling => {
            (Some(command.clone()), message.content[whole.end()..].to_owned())
        },
        _ => {
            debug!("parser: {name:?} does not resolve to a command");
            let invocation_start = captures.get(name_index).map_or(0, |m| m.start());
            (
                parley.registry.unknown_command(),
                message.content[invocation_start..].to_owned(),
            )
        },
    };

    Some(DispatchContext::new(
        parley.clone(),
        message.clone(),
        command,
        Some(arg_string),
        None,
        prefix.clone(),
    ))
}

/// Resolves `message` to a dispatch context. `None` if the message is not an invocation at all.
pub async fn parse_message(
    parley: &ThreadSafeParley,
    message: &IncomingMessage,
) -> anyhow::Result<Option<DispatchContext>> {
    let prefix = parley.prefix_for(message.guild_id).await?;

    for command in parley.registry.commands() {
        for pattern in &command.patterns {
            if let Some(captures) = pattern.captures(&message.content) {
                debug!("parser: message {} matched a pattern of {}", message.id, command.name);
                let matches = captures
                    .iter()
                    .map(|m| m.map(|m| m.as_str().to_owned()))
                    .collect();

                return Ok(Some(DispatchContext::new(
                    parley.clone(),
                    message.clone(),
                    Some(command.clone()),
                    None,
                    Some(matches),
                    prefix,
                )));
            }
        }
    }

    let pattern = parley
        .dispatcher
        .command_pattern(prefix.as_deref(), parley.config.bot.id)?;
    if let Some(ctxt) = match_default(parley, message, &pattern, 2, &prefix) {
        return Ok(Some(ctxt));
    }

    if message.is_direct() && !parley.config.bot.self_operated {
        return Ok(match_default(parley, message, &BARE_COMMAND, 1, &prefix));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{context_from, harness, message_from, noop_command, BOT_ID, USER_ID};

    #[test]
    fn command_pattern_forms() {
        let pattern = build_command_pattern(Some("!"), 42).unwrap();

        let name = |content: &str| {
            pattern
                .captures(content)
                .and_then(|c| c.get(2))
                .map(|m| m.as_str().to_owned())
        };
        assert_eq!(name("!ping").as_deref(), Some("ping"));
        assert_eq!(name("! ping now").as_deref(), Some("ping"));
        assert_eq!(name("<@42> ping").as_deref(), Some("ping"));
        assert_eq!(name("<@!42> !ping").as_deref(), Some("ping"));
        assert_eq!(name("<@43> ping"), None);
        assert_eq!(name("ping"), None);

        let mention_only = build_command_pattern(None, 42).unwrap();
        assert!(mention_only.is_match("<@42> ping"));
        assert!(!mention_only.is_match("!ping"));

        // regex metacharacters in prefixes are literal
        let dotted = build_command_pattern(Some("."), 42).unwrap();
        assert!(dotted.is_match(".ping"));
        assert!(!dotted.is_match("xping"));
    }

    #[tokio::test]
    async fn resolves_name_and_arguments() {
        let h = harness();
        h.registry.register_command(noop_command("ping").aliases(["p"])).unwrap();

        let message = message_from(USER_ID, Some(100), "!P  hello there");
        let ctxt = parse_message(&h.parley, &message).await.unwrap().unwrap();
        assert_eq!(ctxt.command.as_ref().map(|c| c.name.as_str()), Some("ping"));
        assert_eq!(ctxt.arg_string.as_deref(), Some("  hello there"));
        assert_eq!(ctxt.prefix.as_deref(), Some("!"));

        let message = message_from(USER_ID, Some(100), &format!("<@{BOT_ID}> ping"));
        let ctxt = parse_message(&h.parley, &message).await.unwrap().unwrap();
        assert_eq!(ctxt.command.as_ref().map(|c| c.name.as_str()), Some("ping"));

        let message = message_from(USER_ID, Some(100), "ping");
        assert!(parse_message(&h.parley, &message).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bare_names_only_in_direct_messages() {
        let h = harness();
        h.registry.register_command(noop_command("ping")).unwrap();

        let ctxt = context_from(&h, USER_ID, None, "ping");
        let parsed = parse_message(&h.parley, &ctxt.message).await.unwrap().unwrap();
        assert_eq!(parsed.command.as_ref().map(|c| c.name.as_str()), Some("ping"));
    }

    #[tokio::test]
    async fn unresolved_names_go_to_the_unknown_command() {
        let h = harness();
        h.registry.register_command(noop_command("ping")).unwrap();
        h.registry.register_command(noop_command("pong")).unwrap();
        h.registry
            .register_command(noop_command("hidden").no_default_handling())
            .unwrap();

        let message = message_from(USER_ID, Some(100), "!nothing here");
        let ctxt = parse_message(&h.parley, &message).await.unwrap().unwrap();
        assert!(ctxt.command.is_none());
        assert_eq!(ctxt.arg_string.as_deref(), Some("nothing here"));

        h.registry.register_command(noop_command("missing").unknown()).unwrap();
        let message = message_from(USER_ID, Some(100), "!hidden");
        let ctxt = parse_message(&h.parley, &message).await.unwrap().unwrap();
        assert_eq!(ctxt.command.as_ref().map(|c| c.name.as_str()), Some("missing"));
    }

    #[tokio::test]
    async fn patterns_come_first() {
        let h = harness();
        h.registry.register_command(noop_command("ping")).unwrap();
        h.registry
            .register_command(noop_command("issue").pattern(r"#(\d+)"))
            .unwrap();

        let message = message_from(USER_ID, Some(100), "!ping see #12");
        let ctxt = parse_message(&h.parley, &message).await.unwrap().unwrap();
        assert_eq!(ctxt.command.as_ref().map(|c| c.name.as_str()), Some("issue"));
        assert_eq!(
            ctxt.pattern_matches,
            Some(vec![Some("#12".to_owned()), Some("12".to_owned())])
        );
        assert!(ctxt.arg_string.is_none());
    }
}
