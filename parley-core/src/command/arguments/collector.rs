use std::collections::HashMap;

use tracing::debug;

use super::value::ArgValue;
use super::{Argument, Cancellation};
use crate::command::errors::RegistrationError;
use crate::dispatch::context::DispatchContext;
use crate::transport::{IncomingMessage, SentMessage};

/// Obtains a command's arguments in declaration order.
pub struct ArgumentCollector {
    pub args: Vec<Argument>,
    /// Re-prompt cap applied to every argument. `None` is unlimited.
    pub prompt_limit: Option<u32>,
}

#[derive(Debug)]
pub struct ArgumentCollectorResult {
    /// Every argument's value by key, or `None` if collection was cancelled.
    pub values: Option<HashMap<String, ArgValue>>,
    pub cancelled: Option<Cancellation>,
    pub prompts: Vec<SentMessage>,
    pub answers: Vec<IncomingMessage>,
}

impl ArgumentCollector {
    pub fn new(args: Vec<Argument>, prompt_limit: Option<u32>) -> Result<Self, RegistrationError> {
        let mut has_infinite = false;
        let mut has_optional = false;

        for (i, arg) in args.iter().enumerate() {
            if has_infinite {
                return Err(RegistrationError::ArgumentOrder(
                    "No other argument may come after an infinite argument.".to_owned(),
                ));
            }
            if has_optional && !arg.is_optional() {
                return Err(RegistrationError::ArgumentOrder(
                    "Required arguments may not come after optional arguments.".to_owned(),
                ));
            }
            if args[..i].iter().any(|other| other.key == arg.key) {
                return Err(RegistrationError::InvalidInfo(format!(
                    "argument key {} is used twice",
                    arg.key
                )));
            }

            has_infinite |= arg.infinite;
            has_optional |= arg.is_optional();
        }

        Ok(Self { args, prompt_limit })
    }

    /// How many provided values the arguments consume. `None` if the last one takes the rest.
    pub fn count(&self) -> Option<usize> {
        if self.args.last().is_some_and(|arg| arg.infinite) {
            None
        } else {
            Some(self.args.len())
        }
    }

    /// Runs every argument's obtain loop, feeding each its provided value (the infinite argument
    /// gets the remaining tail). The author+channel pair is marked as awaiting for the whole
    /// collection.
    pub async fn obtain(&self, ctxt: &DispatchContext, provided: &[String]) -> anyhow::Result<ArgumentCollectorResult> {
        let _awaiting = ctxt
            .parley
            .dispatcher
            .awaiting
            .acquire(ctxt.message.author.id, ctxt.message.channel_id)
            .await;

        let mut values = HashMap::new();
        let mut prompts = Vec::new();
        let mut answers = Vec::new();

        for (i, arg) in self.args.iter().enumerate() {
            let slice = if arg.infinite {
                provided.get(i..).unwrap_or_default()
            } else {
                provided.get(i..=i).unwrap_or_default()
            };

            let result = arg.obtain(ctxt, slice, self.prompt_limit).await?;
            prompts.extend(result.prompts);
            answers.extend(result.answers);

            if let Some(reason) = result.cancelled {
                debug!("collector: {} cancelled ({reason})", arg.key);
                return Ok(ArgumentCollectorResult {
                    values: None,
                    cancelled: Some(reason),
                    prompts,
                    answers,
                });
            }
            if let Some(value) = result.value {
                values.insert(arg.key.clone(), value);
            }
        }

        Ok(ArgumentCollectorResult {
            values: Some(values),
            cancelled: None,
            prompts,
            answers,
        })
    }
}
