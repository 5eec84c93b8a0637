//! Types that resolve to registry members.

use std::sync::Arc;

use async_trait::async_trait;

use super::entity::ambiguity_notice;
use super::{ArgumentType, Validation};
use crate::command::arguments::value::ArgValue;
use crate::command::arguments::Argument;
use crate::command::group::CommandGroup;
use crate::command::Command;
use crate::dispatch::context::DispatchContext;
use crate::transport::IncomingMessage;

fn single<T>(found: Vec<Arc<T>>, label: &str, name_of: impl Fn(&Arc<T>) -> &str) -> Validation {
    match found.len() {
        0 => Validation::Invalid,
        1 => Validation::Valid,
        _ => ambiguity_notice(&found, label, name_of),
    }
}

pub struct CommandType;

#[async_trait]
impl ArgumentType for CommandType {
    fn id(&self) -> &str {
        "command"
    }

    async fn validate(
        &self,
        value: &str,
        ctxt: &DispatchContext,
        _: &IncomingMessage,
        _: &Argument,
    ) -> anyhow::Result<Validation> {
        let found = ctxt.parley.registry.find_commands(value, false);
        Ok(single(found, "commands", |c| c.name.as_str()))
    }

    async fn parse(
        &self,
        value: &str,
        ctxt: &DispatchContext,
        _: &IncomingMessage,
        _: &Argument,
    ) -> anyhow::Result<ArgValue> {
        match &ctxt.parley.registry.find_commands(value, false)[..] {
            [command] => Ok(ArgValue::Command(command.clone())),
            _ => anyhow::bail!("{value} does not name exactly one command"),
        }
    }
}

pub struct GroupType;

#[async_trait]
impl ArgumentType for GroupType {
    fn id(&self) -> &str {
        "group"
    }

    async fn validate(
        &self,
        value: &str,
        ctxt: &DispatchContext,
        _: &IncomingMessage,
        _: &Argument,
    ) -> anyhow::Result<Validation> {
        let found: Vec<Arc<CommandGroup>> = ctxt.parley.registry.find_groups(value, false);
        Ok(single(found, "groups", |g| g.name.as_str()))
    }

    async fn parse(
        &self,
        value: &str,
        ctxt: &DispatchContext,
        _: &IncomingMessage,
        _: &Argument,
    ) -> anyhow::Result<ArgValue> {
        match &ctxt.parley.registry.find_groups(value, false)[..] {
            [group] => Ok(ArgValue::Group(group.clone())),
            _ => anyhow::bail!("{value} does not name exactly one group"),
        }
    }
}
