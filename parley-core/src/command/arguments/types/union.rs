use async_trait::async_trait;

use super::{ArgumentType, TArgumentType, Validation};
use crate::command::arguments::value::ArgValue;
use crate::command::arguments::Argument;
use crate::dispatch::context::DispatchContext;
use crate::transport::IncomingMessage;

/// A union of types, tried in priority order. The first member that accepts a value is the one
/// that parses it.
pub struct OneOf {
    id: String,
    types: Vec<TArgumentType>,
}
impl OneOf {
    pub fn new(types: Vec<TArgumentType>) -> Self {
        let id = types.iter().map(|t| t.id()).collect::<Vec<_>>().join("|");
        Self { id, types }
    }

    pub fn types(&self) -> &[TArgumentType] {
        &self.types
    }
}

#[async_trait]
impl ArgumentType for OneOf {
    fn id(&self) -> &str {
        &self.id
    }

    async fn validate(
        &self,
        value: &str,
        ctxt: &DispatchContext,
        message: &IncomingMessage,
        arg: &Argument,
    ) -> anyhow::Result<Validation> {
        let mut explanations = Vec::new();

        for kind in &self.types {
            match kind.validate(value, ctxt, message, arg).await? {
                Validation::Valid => return Ok(Validation::Valid),
                Validation::InvalidWith(explanation) => explanations.push(explanation),
                Validation::Invalid => {},
            }
        }

        Ok(Validation::with_message(explanations.join("\n")))
    }

    async fn parse(
        &self,
        value: &str,
        ctxt: &DispatchContext,
        message: &IncomingMessage,
        arg: &Argument,
    ) -> anyhow::Result<ArgValue> {
        for kind in &self.types {
            if kind.validate(value, ctxt, message, arg).await?.is_valid() {
                return kind.parse(value, ctxt, message, arg).await;
            }
        }

        anyhow::bail!("no member of {} accepts {value:?}", self.id)
    }

    fn is_empty(&self, value: &str) -> bool {
        self.types.iter().all(|t| t.is_empty(value))
    }
}
