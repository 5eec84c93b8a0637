//! Command arguments and the interactive loop that obtains them.
//!
//! An [`Argument`] wraps one [`ArgumentType`](types::ArgumentType) with constraints and knows how
//! to get a usable value out of the user: it validates whatever was supplied with the command and,
//! while that value is missing or invalid, prompts the author and waits for an answer. Every exit
//! of that loop is one of: a parsed value, or a [`Cancellation`].

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use parley_string_fmt::Markdown;
use tracing::debug;

use self::types::{OneOf, TArgumentType, Validation};
use self::value::ArgValue;
use super::errors::RegistrationError;
use super::registry::Registry;
use crate::dispatch::context::DispatchContext;
use crate::transport::{IncomingMessage, SentMessage};

pub mod collector;
pub mod split;
pub mod types;
pub mod value;

pub const DEFAULT_WAIT: Duration = Duration::from_secs(30);

/// Why obtaining arguments stopped without a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cancellation {
    /// The user answered `cancel` (or finished an infinite argument without entering anything).
    User,
    /// No answer arrived within the wait.
    Time,
    /// The user used up every allowed prompt.
    PromptLimit,
}
impl Display for Cancellation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Time => "time",
            Self::PromptLimit => "promptLimit",
        })
    }
}

pub type Validator = Arc<dyn Fn(&str, &DispatchContext, &IncomingMessage, &Argument) -> Validation + Send + Sync>;
pub type Parser =
    Arc<dyn Fn(&str, &DispatchContext, &IncomingMessage, &Argument) -> anyhow::Result<ArgValue> + Send + Sync>;
pub type EmptyChecker = Arc<dyn Fn(&str) -> bool + Send + Sync>;
pub type DefaultProducer = Arc<dyn Fn(&DispatchContext, &Argument) -> ArgValue + Send + Sync>;

/// Makes an argument optional.
#[derive(Clone)]
pub enum ArgDefault {
    Value(ArgValue),
    /// Computed per invocation.
    Producer(DefaultProducer),
}

pub struct Argument {
    /// Unique within a collector. Values are returned under this key.
    pub key: String,
    /// How the argument is referred to in notices. Defaults to the key.
    pub label: String,
    pub prompt: String,
    pub kind: Option<TArgumentType>,
    /// Inclusive bound: a number for numeric types, a length for strings.
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Allowed values, lowercased.
    pub one_of: Option<Vec<String>>,
    pub default: Option<ArgDefault>,
    pub infinite: bool,
    /// How long to wait for each prompt answer. `None` waits indefinitely.
    pub wait: Option<Duration>,
    /// Replaces any invalid-value notice.
    pub error: Option<String>,
    validator: Option<Validator>,
    parser: Option<Parser>,
    empty_checker: Option<EmptyChecker>,
}

#[derive(Debug)]
pub struct ArgumentResult {
    pub value: Option<ArgValue>,
    pub cancelled: Option<Cancellation>,
    pub prompts: Vec<SentMessage>,
    pub answers: Vec<IncomingMessage>,
}
impl ArgumentResult {
    fn value(value: ArgValue, prompts: Vec<SentMessage>, answers: Vec<IncomingMessage>) -> Self {
        Self {
            value: Some(value),
            cancelled: None,
            prompts,
            answers,
        }
    }

    fn cancelled(reason: Cancellation, prompts: Vec<SentMessage>, answers: Vec<IncomingMessage>) -> Self {
        Self {
            value: None,
            cancelled: Some(reason),
            prompts,
            answers,
        }
    }
}

fn exceeds(prompts: usize, limit: Option<u32>) -> bool {
    limit.is_some_and(|limit| prompts >= limit as usize)
}

impl Argument {
    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }

    pub fn is_empty(&self, value: &str) -> bool {
        match (&self.empty_checker, &self.kind) {
            (Some(checker), _) => checker(value),
            (None, Some(kind)) => kind.is_empty(value),
            (None, None) => value.is_empty(),
        }
    }

    /// Validates `value` with the custom validator if there is one, else with the type.
    /// `message` is the message the value came from.
    pub async fn validate(
        &self,
        value: &str,
        ctxt: &DispatchContext,
        message: &IncomingMessage,
    ) -> anyhow::Result<Validation> {
        let validation = match (&self.validator, &self.kind) {
            (Some(validator), _) => validator(value, ctxt, message, self),
            (None, Some(kind)) => kind.validate(value, ctxt, message, self).await?,
            (None, None) => anyhow::bail!("argument {} has neither a type nor a validator", self.key),
        };

        Ok(match (validation, &self.error) {
            (Validation::Valid, _) => Validation::Valid,
            (_, Some(error)) => Validation::with_message(error.clone()),
            (invalid, None) => invalid,
        })
    }

    pub async fn parse(&self, value: &str, ctxt: &DispatchContext, message: &IncomingMessage) -> anyhow::Result<ArgValue> {
        match (&self.parser, &self.kind) {
            (Some(parser), _) => parser(value, ctxt, message, self),
            (None, Some(kind)) => kind.parse(value, ctxt, message, self).await,
            (None, None) => anyhow::bail!("argument {} has neither a type nor a parser", self.key),
        }
    }

    fn default_value(&self, ctxt: &DispatchContext) -> Option<ArgValue> {
        self.default.as_ref().map(|default| match default {
            ArgDefault::Value(value) => value.clone(),
            ArgDefault::Producer(produce) => produce(ctxt, self),
        })
    }

    fn timeout_notice(&self, suffix: &str) -> String {
        match self.wait {
            Some(wait) => format!(
                " The command will automatically be cancelled in {} seconds{suffix}.",
                wait.as_secs()
            ),
            None => String::new(),
        }
    }

    /// Obtains a value for this argument.
    ///
    /// `provided` holds the values supplied with the command: at most one for an ordinary
    /// argument, the whole remaining tail for an infinite one. `prompt_limit` caps how many times
    /// the user is re-prompted (per value, for infinite arguments).
    pub async fn obtain(
        &self,
        ctxt: &DispatchContext,
        provided: &[String],
        prompt_limit: Option<u32>,
    ) -> anyhow::Result<ArgumentResult> {
        let empty = if self.infinite {
            provided.is_empty()
        } else {
            provided.first().is_none_or(|value| self.is_empty(value))
        };

        if empty {
            if let Some(value) = self.default_value(ctxt) {
                return Ok(ArgumentResult::value(value, vec![], vec![]));
            }
        }

        if self.infinite {
            self.obtain_infinite(ctxt, provided, prompt_limit).await
        } else {
            self.obtain_single(ctxt, provided.first().map(String::as_str), prompt_limit)
                .await
        }
    }

    async fn obtain_single(
        &self,
        ctxt: &DispatchContext,
        provided: Option<&str>,
        prompt_limit: Option<u32>,
    ) -> anyhow::Result<ArgumentResult> {
        let mut prompts = Vec::new();
        let mut answers: Vec<IncomingMessage> = Vec::new();

        let mut value = provided.unwrap_or_default().to_owned();
        let mut empty = provided.is_none_or(|value| self.is_empty(value));
        let mut validation = if empty {
            Validation::Invalid
        } else {
            self.validate(&value, ctxt, &ctxt.message).await?
        };

        while !validation.is_valid() {
            if exceeds(prompts.len(), prompt_limit) {
                return Ok(ArgumentResult::cancelled(Cancellation::PromptLimit, prompts, answers));
            }

            let notice = match (&validation, empty) {
                (_, true) => self.prompt.clone(),
                (Validation::InvalidWith(explanation), false) => explanation.clone(),
                _ => format!("You provided an invalid {}. Please try again.", self.label),
            };
            prompts.push(
                ctxt.prompt(&format!(
                    "{notice}\nRespond with `cancel` to cancel the command.{}",
                    self.timeout_notice("")
                ))
                .await?,
            );

            let Some(answer) = ctxt.await_reply(self.wait).await? else {
                debug!("argument {}: no answer in time", self.key);
                return Ok(ArgumentResult::cancelled(Cancellation::Time, prompts, answers));
            };
            value = answer.content.clone();

            if value.eq_ignore_ascii_case("cancel") {
                answers.push(answer);
                return Ok(ArgumentResult::cancelled(Cancellation::User, prompts, answers));
            }

            empty = self.is_empty(&value);
            validation = if empty {
                Validation::Invalid
            } else {
                self.validate(&value, ctxt, &answer).await?
            };
            answers.push(answer);
        }

        let source = answers.last().unwrap_or(&ctxt.message);
        let parsed = self.parse(&value, ctxt, source).await?;
        Ok(ArgumentResult::value(parsed, prompts, answers))
    }

    async fn obtain_infinite(
        &self,
        ctxt: &DispatchContext,
        provided: &[String],
        prompt_limit: Option<u32>,
    ) -> anyhow::Result<ArgumentResult> {
        let mut results = Vec::new();
        let mut prompts = Vec::new();
        let mut answers: Vec<IncomingMessage> = Vec::new();
        let mut current = 0;

        loop {
            let mut value = provided.get(current).cloned();
            let mut validation = match &value {
                Some(value) => self.validate(value, ctxt, &ctxt.message).await?,
                None => Validation::Invalid,
            };
            let mut attempts = 0;

            while !validation.is_valid() {
                attempts += 1;
                if prompt_limit.is_some_and(|limit| attempts > limit) {
                    return Ok(ArgumentResult::cancelled(Cancellation::PromptLimit, prompts, answers));
                }

                if let Some(invalid) = &value {
                    let notice = match &validation {
                        Validation::InvalidWith(explanation) => explanation.clone(),
                        _ => format!(
                            "You provided an invalid {}, \"{}\". Please try again.",
                            self.label,
                            invalid.echo()
                        ),
                    };
                    prompts.push(
                        ctxt.prompt(&format!(
                            "{notice}\nRespond with `cancel` to cancel the command, or `finish` to finish entry up to this point.{}",
                            self.timeout_notice("")
                        ))
                        .await?,
                    );
                } else if results.is_empty() {
                    prompts.push(
                        ctxt.prompt(&format!(
                            "{}\nRespond with `cancel` to cancel the command, or `finish` to finish entry.{}",
                            self.prompt,
                            self.timeout_notice(", unless you respond")
                        ))
                        .await?,
                    );
                }

                let Some(answer) = ctxt.await_reply(self.wait).await? else {
                    debug!("argument {}: no answer in time", self.key);
                    return Ok(ArgumentResult::cancelled(Cancellation::Time, prompts, answers));
                };
                let content = answer.content.clone();
                validation = if content.eq_ignore_ascii_case("finish") || content.eq_ignore_ascii_case("cancel") {
                    Validation::Invalid
                } else {
                    self.validate(&content, ctxt, &answer).await?
                };
                answers.push(answer);

                if content.eq_ignore_ascii_case("finish") {
                    return Ok(if !results.is_empty() {
                        ArgumentResult::value(ArgValue::List(results), prompts, answers)
                    } else if let Some(default) = self.default_value(ctxt) {
                        ArgumentResult::value(default, prompts, answers)
                    } else {
                        ArgumentResult::cancelled(Cancellation::User, prompts, answers)
                    });
                }
                if content.eq_ignore_ascii_case("cancel") {
                    return Ok(ArgumentResult::cancelled(Cancellation::User, prompts, answers));
                }

                value = Some(content);
            }

            if let Some(value) = value {
                let source = answers.last().unwrap_or(&ctxt.message);
                results.push(self.parse(&value, ctxt, source).await?);
            }

            if !provided.is_empty() {
                current += 1;
                if current == provided.len() {
                    return Ok(ArgumentResult::value(ArgValue::List(results), prompts, answers));
                }
            }
        }
    }
}

enum KindSpec {
    None,
    One(String),
    Union(Vec<String>),
}

/// Describes an [`Argument`]. Types are looked up when the argument is built.
pub struct ArgumentBuilder {
    key: String,
    label: Option<String>,
    prompt: Option<String>,
    kind: KindSpec,
    min: Option<f64>,
    max: Option<f64>,
    one_of: Option<Vec<String>>,
    default: Option<ArgDefault>,
    infinite: bool,
    wait: Duration,
    error: Option<String>,
    validator: Option<Validator>,
    parser: Option<Parser>,
    empty_checker: Option<EmptyChecker>,
}

impl ArgumentBuilder {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: None,
            prompt: None,
            kind: KindSpec::None,
            min: None,
            max: None,
            one_of: None,
            default: None,
            infinite: false,
            wait: DEFAULT_WAIT,
            error: None,
            validator: None,
            parser: None,
            empty_checker: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn kind(mut self, id: impl Into<String>) -> Self {
        self.kind = KindSpec::One(id.into());
        self
    }

    /// Accepts a value any of the given types accept, preferring earlier types.
    pub fn union<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kind = KindSpec::Union(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn one_of<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.one_of = Some(options.into_iter().map(|o| o.as_ref().to_lowercase()).collect());
        self
    }

    pub fn default_value(mut self, value: ArgValue) -> Self {
        self.default = Some(ArgDefault::Value(value));
        self
    }

    pub fn default_with<F>(mut self, produce: F) -> Self
    where
        F: Fn(&DispatchContext, &Argument) -> ArgValue + Send + Sync + 'static,
    {
        self.default = Some(ArgDefault::Producer(Arc::new(produce)));
        self
    }

    pub fn infinite(mut self) -> Self {
        self.infinite = true;
        self
    }

    /// A zero wait means waiting indefinitely.
    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn validator<F>(mut self, validate: F) -> Self
    where
        F: Fn(&str, &DispatchContext, &IncomingMessage, &Argument) -> Validation + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validate));
        self
    }

    pub fn parser<F>(mut self, parse: F) -> Self
    where
        F: Fn(&str, &DispatchContext, &IncomingMessage, &Argument) -> anyhow::Result<ArgValue> + Send + Sync + 'static,
    {
        self.parser = Some(Arc::new(parse));
        self
    }

    pub fn empty_checker<F>(mut self, is_empty: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.empty_checker = Some(Arc::new(is_empty));
        self
    }

    pub fn build(self, registry: &Registry) -> Result<Argument, RegistrationError> {
        if self.key.is_empty() {
            return Err(RegistrationError::InvalidInfo("argument key must not be empty".to_owned()));
        }
        if matches!(&self.label, Some(label) if label.is_empty()) {
            return Err(RegistrationError::InvalidInfo(format!(
                "argument {} has an empty label",
                self.key
            )));
        }
        let Some(prompt) = self.prompt else {
            return Err(RegistrationError::InvalidInfo(format!(
                "argument {} has no prompt",
                self.key
            )));
        };

        let resolve = |id: &str| {
            registry
                .resolve_type(id)
                .ok_or_else(|| RegistrationError::UnknownType(id.to_owned()))
        };
        let kind = match self.kind {
            KindSpec::None => None,
            KindSpec::One(id) => Some(resolve(&id)?),
            KindSpec::Union(ids) => {
                let types = ids.iter().map(|id| resolve(id)).collect::<Result<Vec<_>, _>>()?;
                Some(Arc::new(OneOf::new(types)) as TArgumentType)
            },
        };

        if kind.is_none() && (self.validator.is_none() || self.parser.is_none()) {
            return Err(RegistrationError::InvalidInfo(format!(
                "argument {} needs a type, or both a validator and a parser",
                self.key
            )));
        }

        Ok(Argument {
            label: self.label.unwrap_or_else(|| self.key.clone()),
            key: self.key,
            prompt,
            kind,
            min: self.min,
            max: self.max,
            one_of: self.one_of,
            default: self.default,
            infinite: self.infinite,
            wait: (!self.wait.is_zero()).then_some(self.wait),
            error: self.error,
            validator: self.validator,
            parser: self.parser,
            empty_checker: self.empty_checker,
        })
    }
}
