//! Message dispatch.
//!
//! [`handle_message`] is the entry point for every message and message edit the transport
//! receives. A message goes through, in order:
//!
//! - the eligibility checks (bot authors, pending prompts, no-op edits),
//! - the [`parser`], which resolves it to a [`DispatchContext`],
//! - the registered [`Inhibitor`]s,
//! - the enable flags of the command and its group,
//! - [`DispatchContext::run`], which performs the remaining checks and runs the command.
//!
//! Responses are tracked per trigger message, so that editing the trigger within the editable
//! window re-runs the command and rewrites the earlier responses in place.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use regex::Regex;
use tracing::{debug, error};

use self::awaiting::AwaitingLocks;
use self::context::DispatchContext;
use self::error::PreParseError;
use self::inhibitor::TInhibitor;
use self::parser::{build_command_pattern, parse_message};
use self::replies::{Replies, Reply};
use crate::command::errors::BlockReason;
use crate::events::DispatchEvent;
use crate::parley::{Parley, ThreadSafeParley};
use crate::transport::{IncomingMessage, SentMessage};

pub mod awaiting;
pub mod context;
pub mod error;
pub mod inhibitor;
pub mod parser;
pub mod replies;

/// Dispatch state shared by every message.
pub struct Dispatcher {
    inhibitors: RwLock<Vec<TInhibitor>>,
    pub awaiting: Arc<AwaitingLocks>,
    pub(crate) replies: Replies,
    /// Compiled invocation patterns, by prefix. The empty key is the mention-only pattern.
    command_patterns: Mutex<HashMap<String, Regex>>,
}

impl Dispatcher {
    pub fn new(editable_for: Duration) -> Self {
        Self {
            inhibitors: RwLock::new(vec![]),
            awaiting: Arc::new(AwaitingLocks::new()),
            replies: Replies::new(editable_for),
            command_patterns: Mutex::new(HashMap::new()),
        }
    }

    /// Inhibitors run in the order they were added.
    pub fn add_inhibitor(&self, inhibitor: TInhibitor) {
        self.inhibitors.write().unwrap_or_else(|e| e.into_inner()).push(inhibitor);
    }

    /// Returns whether the inhibitor was registered.
    pub fn remove_inhibitor(&self, inhibitor: &TInhibitor) -> bool {
        let mut inhibitors = self.inhibitors.write().unwrap_or_else(|e| e.into_inner());
        let before = inhibitors.len();
        inhibitors.retain(|i| !std::ptr::addr_eq(Arc::as_ptr(i), Arc::as_ptr(inhibitor)));
        inhibitors.len() != before
    }

    fn inhibitors(&self) -> Vec<TInhibitor> {
        self.inhibitors.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn command_pattern(&self, prefix: Option<&str>, bot_id: u64) -> anyhow::Result<Regex> {
        let key = prefix.unwrap_or_default();
        let mut patterns = self.command_patterns.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pattern) = patterns.get(key) {
            return Ok(pattern.clone());
        }

        let pattern = build_command_pattern(prefix, bot_id)?;
        patterns.insert(key.to_owned(), pattern.clone());
        Ok(pattern)
    }
}

/// Decides whether a message is considered for dispatch at all. `old` is the previous version of
/// an edited message.
pub fn check_eligibility(
    parley: &Parley,
    message: &IncomingMessage,
    old: Option<&IncomingMessage>,
) -> Result<(), PreParseError> {
    let author = message.author.id;
    let bot_id = parley.config.bot.id;

    if parley.config.bot.self_operated {
        if author != bot_id {
            return Err(PreParseError::NotSelf(author));
        }
    } else if message.author.bot || author == bot_id {
        return Err(PreParseError::UserIsBot(author));
    }

    if parley.dispatcher.awaiting.is_awaiting(author, message.channel_id) {
        return Err(PreParseError::AwaitingReply {
            author,
            channel: message.channel_id,
        });
    }

    if let Some(old) = old {
        if old.content == message.content {
            return Err(PreParseError::UnchangedEdit);
        }
        if message.edited_timestamp.is_none() {
            return Err(PreParseError::EditedMessageWithNoTimestamp);
        }
    }

    Ok(())
}

async fn delete_responses<'a>(parley: &Parley, responses: impl IntoIterator<Item = &'a SentMessage>) {
    let results = join_all(responses.into_iter().map(|m| async move {
        (m.id, parley.transport.delete(m).await)
    }))
    .await;

    for (id, result) in results {
        if let Err(e) = result {
            debug!("failed to delete response {id}: {e}");
        }
    }
}

async fn run_context(parley: &Parley, ctxt: &DispatchContext) -> anyhow::Result<()> {
    for inhibitor in parley.dispatcher.inhibitors() {
        let Some(inhibition) = inhibitor.inhibit(ctxt).await? else {
            continue;
        };

        debug!("message {} inhibited: {}", ctxt.message.id, inhibition.reason);
        parley.metrics_handler.add_block(&inhibition.reason);
        parley.emit(DispatchEvent::CommandBlocked {
            command: ctxt.command.as_ref().map(|c| c.name.clone()),
            message_id: ctxt.message.id,
            reason: BlockReason::Inhibited(inhibition.reason.clone()),
        });
        if let Some(response) = &inhibition.response {
            ctxt.reply(response).await?;
        }
        return Ok(());
    }

    let Some(command) = &ctxt.command else {
        parley.emit(DispatchEvent::UnknownCommand {
            message_id: ctxt.message.id,
            content: ctxt.message.content.clone(),
        });
        return Ok(());
    };

    if !command.is_enabled_in(parley, ctxt.message.guild_id).await? {
        debug!("command {} is disabled for message {}", command.name, ctxt.message.id);
        if command.unknown {
            parley.emit(DispatchEvent::UnknownCommand {
                message_id: ctxt.message.id,
                content: ctxt.message.content.clone(),
            });
        } else {
            ctxt.reply(&format!("The `{}` command is disabled.", command.name)).await?;
        }
        return Ok(());
    }

    ctxt.run().await
}

async fn dispatch_message(
    parley: &ThreadSafeParley,
    message: IncomingMessage,
    old: Option<IncomingMessage>,
) -> anyhow::Result<()> {
    if let Err(reason) = check_eligibility(parley, &message, old.as_ref()) {
        debug!("not dispatching message {}: {reason}", message.id);
        return Ok(());
    }

    // edits outside the editable window are dispatched like new messages
    let previous = old.and_then(|_| parley.dispatcher.replies.get(message.id));

    let Some(ctxt) = parse_message(parley, &message).await? else {
        if let Some(previous) = previous {
            debug!("message {} is no longer a command, removing its responses", message.id);
            delete_responses(parley, previous.responses.values().flatten()).await;
            parley.dispatcher.replies.remove(message.id);
        }
        return Ok(());
    };

    if let Some(previous) = &previous {
        ctxt.seed_responses(previous.responses.clone());
    }

    let outcome = run_context(parley, &ctxt).await;

    let (leftovers, responses) = ctxt.finalize();
    delete_responses(parley, &leftovers).await;
    parley.dispatcher.replies.insert(message.id, Reply {
        responses,
        created: previous.map_or_else(Instant::now, |p| p.created),
    });

    outcome
}

/// Handles a new message, or an edit when `old` holds the previous version.
///
/// Never fails: errors are logged and published as [`DispatchEvent::Error`].
pub async fn handle_message(parley: ThreadSafeParley, message: IncomingMessage, old: Option<IncomingMessage>) {
    parley.metrics_handler.add_message();
    let id = message.id;

    if let Err(e) = dispatch_message(&parley, message, old).await {
        error!("failed to dispatch message {id}: {e:?}");
        parley.metrics_handler.add_error();
        parley.emit(DispatchEvent::Error {
            message_id: Some(id),
            error: format!("{e:#}"),
        });
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::broadcast::Receiver;

    use super::inhibitor::{inhibitor_fn, BlacklistInhibitor, Inhibition};
    use super::*;
    use crate::command::arguments::value::{ArgValue, CommandArgs};
    use crate::command::arguments::ArgumentBuilder;
    use crate::command::errors::FriendlyError;
    use crate::command::CommandHandler;
    use crate::test_util::{
        edited, harness, message_from, noop_command, Harness, DM_CHANNEL, GUILD_CHANNEL, GUILD_ID, OWNER_ID,
        USER_ID,
    };

    struct Add;

    #[async_trait]
    impl CommandHandler for Add {
        async fn run(&self, ctxt: &DispatchContext, args: CommandArgs, _: bool) -> anyhow::Result<()> {
            let total: f64 = args
                .get("numbers")
                .and_then(|v| v.as_list())
                .unwrap_or_default()
                .iter()
                .filter_map(|v| v.as_f64())
                .sum();
            ctxt.say(&total.to_string()).await?;
            Ok(())
        }
    }

    /// Says its argument string, or the first capture group when triggered by a pattern.
    struct Echo;

    #[async_trait]
    impl CommandHandler for Echo {
        async fn run(&self, ctxt: &DispatchContext, args: CommandArgs, _: bool) -> anyhow::Result<()> {
            let content = match args {
                CommandArgs::Single(s) => s,
                CommandArgs::Pattern(matches) => matches.get(1).cloned().flatten().unwrap_or_default(),
                other => format!("{other:?}"),
            };
            ctxt.say(&content).await?;
            Ok(())
        }
    }

    struct Fails(bool);

    #[async_trait]
    impl CommandHandler for Fails {
        async fn run(&self, _: &DispatchContext, _: CommandArgs, _: bool) -> anyhow::Result<()> {
            if self.0 {
                Err(FriendlyError::new("That can't be done here.").into())
            } else {
                anyhow::bail!("boom")
            }
        }
    }

    fn register(h: &Harness) {
        h.registry
            .register_command(
                noop_command("add")
                    .args([ArgumentBuilder::new("numbers")
                        .label("number")
                        .prompt("What numbers would you like to add?")
                        .kind("float")
                        .infinite()])
                    .handler(Add),
            )
            .unwrap();
        h.registry
            .register_command(noop_command("echo").handler(Echo))
            .unwrap();
        h.registry
            .register_command(
                noop_command("ping")
                    .throttling(1, Duration::from_secs(10))
                    .handler(Echo),
            )
            .unwrap();
        h.registry
            .register_command(
                noop_command("repeat")
                    .args([ArgumentBuilder::new("times").prompt("How many times?").kind("integer")])
                    .args_prompt_limit(0),
            )
            .unwrap();
    }

    fn drain(events: &mut Receiver<DispatchEvent>) -> Vec<DispatchEvent> {
        std::iter::from_fn(|| events.try_recv().ok()).collect()
    }

    async fn send(h: &Harness, content: &str) -> IncomingMessage {
        let message = message_from(USER_ID, None, content);
        handle_message(h.parley.clone(), message.clone(), None).await;
        message
    }

    #[tokio::test]
    async fn runs_with_provided_arguments() {
        let h = harness();
        register(&h);
        let mut events = h.parley.subscribe();

        send(&h, "!add 2 3").await;
        assert_eq!(h.transport.contents(), vec!["5"]);
        assert!(drain(&mut events).iter().any(|e| matches!(
            e,
            DispatchEvent::CommandRun { command, from_pattern: false, .. } if command == "add"
        )));
        assert_eq!(h.parley.metrics_handler.commands.with_label_values(&["add"]).get(), 1);
    }

    #[tokio::test]
    async fn prompts_for_missing_arguments() {
        let h = harness();
        register(&h);
        h.transport.push_answers(&["4", "x", "6", "finish"]);

        send(&h, "!add").await;
        let contents = h.transport.contents();
        assert!(contents[0].starts_with("What numbers would you like to add?"));
        assert_eq!(contents.last().map(String::as_str), Some("10"));
        assert!(!h.parley.dispatcher.awaiting.is_awaiting(USER_ID, DM_CHANNEL));
    }

    #[tokio::test]
    async fn cancelling_a_prompt() {
        let h = harness();
        register(&h);
        let mut events = h.parley.subscribe();
        h.transport.push_answers(&["cancel"]);

        send(&h, "!add").await;
        assert_eq!(h.transport.contents().last().map(String::as_str), Some("Cancelled command."));
        assert!(drain(&mut events).iter().any(|e| matches!(
            e,
            DispatchEvent::CommandCancelled { reason: crate::command::arguments::Cancellation::User, .. }
        )));
    }

    #[tokio::test]
    async fn invalid_usage_without_prompts() {
        let h = harness();
        register(&h);

        send(&h, "!repeat lots").await;
        assert_eq!(h.transport.contents(), vec![
            "Invalid command usage. The `repeat` command's accepted format is: `repeat\u{a0}<times>`. Use `help\u{a0}repeat` for more information."
        ]);
    }

    #[tokio::test]
    async fn throttles_users_but_not_owners() {
        let h = harness();
        register(&h);

        send(&h, "!ping one").await;
        send(&h, "!ping two").await;
        let contents = h.transport.contents();
        assert_eq!(contents[0], "one");
        assert!(contents[1].starts_with("You may not use the `ping` command again for another "));

        for content in ["!ping a", "!ping b"] {
            handle_message(h.parley.clone(), message_from(OWNER_ID, None, content), None).await;
        }
        assert_eq!(&h.transport.contents()[2..], ["a", "b"]);
    }

    #[tokio::test]
    async fn edits_rerun_and_rewrite_responses() {
        let h = harness();
        register(&h);

        let original = message_from(USER_ID, Some(GUILD_ID), "!echo one");
        handle_message(h.parley.clone(), original.clone(), None).await;
        handle_message(h.parley.clone(), edited(&original, "!echo two"), Some(original.clone())).await;

        let messages = h.transport.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "two");
        assert_eq!(messages[0].edits, 1);

        // unchanged content is not a new invocation
        handle_message(h.parley.clone(), edited(&original, "!echo two"), Some(edited(&original, "!echo two"))).await;
        assert_eq!(h.transport.messages()[0].edits, 1);

        // no longer a command: the responses go away
        handle_message(h.parley.clone(), edited(&original, "never mind"), Some(edited(&original, "!echo two"))).await;
        assert!(h.transport.contents().is_empty());
    }

    #[tokio::test]
    async fn ignores_bots_and_pending_prompts() {
        let h = harness();
        register(&h);

        let mut from_bot = message_from(USER_ID, None, "!echo hi");
        from_bot.author.bot = true;
        handle_message(h.parley.clone(), from_bot, None).await;

        let guard = h.parley.dispatcher.awaiting.acquire(USER_ID, DM_CHANNEL).await;
        send(&h, "!echo hi").await;
        drop(guard);

        assert_eq!(h.transport.sent_count(), 0);
        send(&h, "!echo hi").await;
        assert_eq!(h.transport.contents(), vec!["hi"]);
    }

    #[tokio::test]
    async fn inhibitors_veto_dispatch() {
        let h = harness();
        register(&h);
        let mut events = h.parley.subscribe();

        let blacklist: TInhibitor = Arc::new(BlacklistInhibitor::new([USER_ID]));
        h.parley.dispatcher.add_inhibitor(blacklist.clone());
        send(&h, "!echo hi").await;
        assert_eq!(h.transport.sent_count(), 0);
        assert!(drain(&mut events).iter().any(|e| matches!(
            e,
            DispatchEvent::CommandBlocked { reason: BlockReason::Inhibited(reason), .. } if reason == "blacklist"
        )));

        assert!(h.parley.dispatcher.remove_inhibitor(&blacklist));
        assert!(!h.parley.dispatcher.remove_inhibitor(&blacklist));

        h.parley.dispatcher.add_inhibitor(inhibitor_fn(|ctxt| {
            ctxt.message
                .content
                .contains("secret")
                .then(|| Inhibition::new("secrets").with_response("Not here."))
        }));
        send(&h, "!echo secret").await;
        send(&h, "!echo public").await;
        assert_eq!(h.transport.contents(), vec!["Not here.", "public"]);
    }

    #[tokio::test]
    async fn disabled_commands() {
        let h = harness();
        register(&h);
        let echo = h.registry.resolve_command("echo").unwrap();
        echo.set_enabled_in(&h.parley, None, false).await.unwrap();

        send(&h, "!echo hi").await;
        assert_eq!(h.transport.contents(), vec!["The `echo` command is disabled."]);
    }

    #[tokio::test]
    async fn unknown_commands() {
        let h = harness();
        register(&h);
        let mut events = h.parley.subscribe();

        send(&h, "!nothing").await;
        assert_eq!(h.transport.sent_count(), 0);
        assert!(drain(&mut events)
            .iter()
            .any(|e| matches!(e, DispatchEvent::UnknownCommand { content, .. } if content == "!nothing")));

        h.registry
            .register_command(noop_command("fallback").unknown().handler(Echo))
            .unwrap();
        send(&h, "!nothing at all").await;
        assert_eq!(h.transport.contents(), vec!["nothing at all"]);
    }

    #[tokio::test]
    async fn command_errors() {
        let h = harness();
        register(&h);
        h.registry
            .register_command(noop_command("friendly").handler(Fails(true)))
            .unwrap();
        h.registry
            .register_command(noop_command("broken").handler(Fails(false)))
            .unwrap();
        let mut events = h.parley.subscribe();

        send(&h, "!friendly").await;
        send(&h, "!broken").await;
        let contents = h.transport.contents();
        assert_eq!(contents[0], "That can't be done here.");
        assert!(contents[1].starts_with("An error occurred while running the command: `boom`"));
        assert!(contents[1].ends_with(&format!("Please contact <@{OWNER_ID}>.")));

        let errors = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, DispatchEvent::CommandError { .. }))
            .count();
        assert_eq!(errors, 2);
        assert_eq!(h.parley.metrics_handler.command_errors.get(), 2);
    }

    #[tokio::test]
    async fn pattern_commands() {
        let h = harness();
        register(&h);
        h.registry
            .register_command(noop_command("issue").pattern(r"#(\d+)").no_default_handling().handler(Echo))
            .unwrap();

        send(&h, "see #42 please").await;
        send(&h, "!issue 42").await;
        assert_eq!(h.transport.contents(), vec!["42"]);
    }

    #[tokio::test]
    async fn guild_replies_mention_the_author() {
        let h = harness();
        register(&h);
        h.registry
            .register_command(noop_command("serveronly").guild_only().handler(Echo))
            .unwrap();

        send(&h, "!serveronly").await;
        assert_eq!(h.transport.contents(), vec![
            "The `serveronly` command must be used in a server channel."
        ]);

        let message = message_from(USER_ID, Some(GUILD_ID), "!ping");
        handle_message(h.parley.clone(), message, None).await;
        let message = message_from(USER_ID, Some(GUILD_ID), "!ping");
        handle_message(h.parley.clone(), message, None).await;
        assert!(h.transport.contents()[2].starts_with(&format!("<@{USER_ID}>, You may not use")));
    }

    /// Says its `text` argument in brackets.
    struct Say;

    #[async_trait]
    impl CommandHandler for Say {
        async fn run(&self, ctxt: &DispatchContext, args: CommandArgs, _: bool) -> anyhow::Result<()> {
            let text = args.get("text").and_then(ArgValue::as_str).unwrap_or_default();
            ctxt.say(&format!("[{text}]")).await?;
            Ok(())
        }
    }

    fn text_command(name: &str, default: &str) -> crate::command::builder::CommandBuilder {
        noop_command(name)
            .args([ArgumentBuilder::new("text")
                .prompt("What should I say?")
                .kind("string")
                .default_value(ArgValue::String(default.to_owned()))])
            .handler(Say)
    }

    #[tokio::test]
    async fn string_arguments_are_trimmed_and_unquoted() {
        let h = harness();
        h.registry.register_command(text_command("say", "DEFAULT")).unwrap();

        send(&h, "!say hello").await;
        send(&h, "!say \"hi there\"").await;
        send(&h, "!say ").await;
        send(&h, "!say    padded   ").await;
        assert_eq!(h.transport.contents(), vec!["[hello]", "[hi there]", "[DEFAULT]", "[padded]"]);
    }

    #[tokio::test]
    async fn optional_argument_uses_its_default_without_prompting() {
        let h = harness();
        h.registry.register_command(text_command("prefix", "")).unwrap();

        send(&h, "!prefix").await;
        assert_eq!(h.transport.contents(), vec!["[]"]);

        handle_message(h.parley.clone(), message_from(USER_ID, Some(GUILD_ID), "!prefix ?"), None).await;
        let contents = h.transport.contents();
        assert_eq!(contents.len(), 2);
        assert!(contents[1].ends_with("[?]"));
    }

    /// A string type whose validation waits for a permit, to hold invocations mid-collection.
    struct Gated(Arc<tokio::sync::Semaphore>);

    #[async_trait]
    impl crate::command::arguments::types::ArgumentType for Gated {
        fn id(&self) -> &str {
            "gated"
        }

        async fn validate(
            &self,
            _: &str,
            _: &DispatchContext,
            _: &IncomingMessage,
            _: &crate::command::arguments::Argument,
        ) -> anyhow::Result<crate::command::arguments::types::Validation> {
            let _permit = self.0.acquire().await?;
            Ok(crate::command::arguments::types::Validation::Valid)
        }

        async fn parse(
            &self,
            value: &str,
            _: &DispatchContext,
            _: &IncomingMessage,
            _: &crate::command::arguments::Argument,
        ) -> anyhow::Result<ArgValue> {
            Ok(ArgValue::String(value.to_owned()))
        }
    }

    #[tokio::test]
    async fn concurrent_invocations_share_the_throttle() {
        let h = harness();
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        h.registry.register_type(Arc::new(Gated(gate.clone()))).unwrap();
        h.registry
            .register_command(
                noop_command("slow")
                    .throttling(1, Duration::from_secs(10))
                    .args([ArgumentBuilder::new("text").prompt("?").kind("gated")])
                    .handler(Say),
            )
            .unwrap();

        let first = tokio::spawn(handle_message(
            h.parley.clone(),
            message_from(USER_ID, Some(GUILD_ID), "!slow one"),
            None,
        ));
        while !h.parley.dispatcher.awaiting.is_awaiting(USER_ID, GUILD_CHANNEL) {
            tokio::task::yield_now().await;
        }

        gate.add_permits(2);
        send(&h, "!slow two").await;
        first.await.unwrap();

        let contents = h.transport.contents();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents.iter().filter(|c| c.contains("You may not use the `slow` command")).count(), 1);
        assert_eq!(contents.iter().filter(|c| c.ends_with(']')).count(), 1);
    }
}
