use async_trait::async_trait;
use parley_common::util::{channel_mention_to_id, role_mention_to_id, user_mention_to_id};
use parley_string_fmt::disambiguation;

use super::{ArgumentType, Validation};
use crate::command::arguments::value::ArgValue;
use crate::command::arguments::Argument;
use crate::dispatch::context::DispatchContext;
use crate::transport::{Entity, EntityKind, EntityQuery, IncomingMessage};

/// Past this many candidates, listing them is no longer useful.
const MAX_DISAMBIGUATION: usize = 15;

/// Outcome of resolving user input against the entities the transport knows about.
pub(crate) enum Resolved<T> {
    One(T),
    None,
    Ambiguous(Vec<T>),
}

/// Narrows a search result: a single hit wins, otherwise a single exact (case-insensitive) name
/// match wins, otherwise the caller must disambiguate.
pub(crate) fn narrow<T>(mut found: Vec<T>, query: &str, name_of: impl Fn(&T) -> &str) -> Resolved<T> {
    match found.len() {
        0 => Resolved::None,
        1 => Resolved::One(found.remove(0)),
        _ => {
            let query = query.to_lowercase();
            let exact = found
                .iter()
                .enumerate()
                .filter(|(_, item)| name_of(item).to_lowercase() == query)
                .map(|(i, _)| i)
                .collect::<Vec<_>>();

            if let [i] = exact[..] {
                Resolved::One(found.swap_remove(i))
            } else {
                Resolved::Ambiguous(found)
            }
        },
    }
}

/// Renders the notice for an ambiguous search.
pub(crate) fn ambiguity_notice<T>(found: &[T], label: &str, name_of: impl Fn(&T) -> &str) -> Validation {
    if found.len() > MAX_DISAMBIGUATION {
        Validation::InvalidWith(format!("Multiple {label} found. Please be more specific."))
    } else {
        Validation::InvalidWith(disambiguation(found.iter().map(name_of), label))
    }
}

/// Users, channels and roles, referenced by mention, raw ID or name.
pub struct EntityType {
    id: &'static str,
    kind: EntityKind,
    mention_to_id: fn(&str) -> Option<u64>,
}
impl EntityType {
    pub fn user() -> Self {
        Self {
            id: "user",
            kind: EntityKind::User,
            mention_to_id: user_mention_to_id,
        }
    }

    pub fn channel() -> Self {
        Self {
            id: "channel",
            kind: EntityKind::Channel,
            mention_to_id: channel_mention_to_id,
        }
    }

    pub fn role() -> Self {
        Self {
            id: "role",
            kind: EntityKind::Role,
            mention_to_id: role_mention_to_id,
        }
    }

    async fn resolve(&self, value: &str, ctxt: &DispatchContext) -> anyhow::Result<Resolved<Entity>> {
        let transport = &ctxt.parley.transport;
        let guild = ctxt.message.guild_id;

        if let Some(id) = (self.mention_to_id)(value) {
            let found = transport.lookup_entities(self.kind, guild, &EntityQuery::Id(id)).await?;
            return Ok(match found.into_iter().next() {
                Some(entity) => Resolved::One(entity),
                None => Resolved::None,
            });
        }

        let found = transport
            .lookup_entities(self.kind, guild, &EntityQuery::Name(value.to_owned()))
            .await?;
        Ok(narrow(found, value, |e| e.name.as_str()))
    }
}

#[async_trait]
impl ArgumentType for EntityType {
    fn id(&self) -> &str {
        self.id
    }

    async fn validate(
        &self,
        value: &str,
        ctxt: &DispatchContext,
        _: &IncomingMessage,
        _: &Argument,
    ) -> anyhow::Result<Validation> {
        Ok(match self.resolve(value, ctxt).await? {
            Resolved::One(_) => Validation::Valid,
            Resolved::None => Validation::Invalid,
            Resolved::Ambiguous(found) => ambiguity_notice(&found, &self.kind.to_string(), |e| e.name.as_str()),
        })
    }

    async fn parse(
        &self,
        value: &str,
        ctxt: &DispatchContext,
        _: &IncomingMessage,
        _: &Argument,
    ) -> anyhow::Result<ArgValue> {
        match self.resolve(value, ctxt).await? {
            Resolved::One(entity) => Ok(ArgValue::Entity(entity)),
            _ => anyhow::bail!("{value} does not resolve to exactly one of {}", self.kind),
        }
    }
}
