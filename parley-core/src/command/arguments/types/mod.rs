//! Argument types: stateless validators/parsers identified by a lowercase id.

use std::sync::Arc;

use async_trait::async_trait;

use super::value::ArgValue;
use super::Argument;
use crate::dispatch::context::DispatchContext;
use crate::transport::IncomingMessage;

pub mod catalog;
pub mod entity;
pub mod primitive;
pub mod union;

pub use catalog::{CommandType, GroupType};
pub use entity::EntityType;
pub use primitive::{BooleanType, FloatType, IntegerType, StringType};
pub use union::OneOf;

/// Outcome of validating one raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    /// Invalid, and the generic "please try again" notice applies.
    Invalid,
    /// Invalid, with a specific explanation shown to the user verbatim.
    InvalidWith(String),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// An empty explanation is no explanation.
    pub fn with_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.is_empty() { Self::Invalid } else { Self::InvalidWith(message) }
    }
}

impl From<bool> for Validation {
    fn from(valid: bool) -> Self {
        if valid { Self::Valid } else { Self::Invalid }
    }
}

pub type TArgumentType = Arc<dyn ArgumentType>;

/// A kind of argument value.
///
/// `validate` and `parse` receive the dispatch context of the triggering message and the message
/// the value came from (the trigger itself, or the most recent prompt answer).
#[async_trait]
pub trait ArgumentType: Send + Sync {
    fn id(&self) -> &str;

    async fn validate(
        &self,
        value: &str,
        ctxt: &DispatchContext,
        message: &IncomingMessage,
        arg: &Argument,
    ) -> anyhow::Result<Validation>;

    async fn parse(
        &self,
        value: &str,
        ctxt: &DispatchContext,
        message: &IncomingMessage,
        arg: &Argument,
    ) -> anyhow::Result<ArgValue>;

    fn is_empty(&self, value: &str) -> bool {
        value.is_empty()
    }
}

/// Every type the registry knows without being told.
pub fn default_types() -> Vec<TArgumentType> {
    vec![
        Arc::new(StringType),
        Arc::new(IntegerType),
        Arc::new(FloatType),
        Arc::new(BooleanType),
        Arc::new(EntityType::user()),
        Arc::new(EntityType::channel()),
        Arc::new(EntityType::role()),
        Arc::new(CommandType),
        Arc::new(GroupType),
    ]
}
