use async_trait::async_trait;

use super::{ArgumentType, Validation};
use crate::command::arguments::value::ArgValue;
use crate::command::arguments::Argument;
use crate::dispatch::context::DispatchContext;
use crate::transport::IncomingMessage;

fn one_of_notice(options: &[String]) -> String {
    let options = options.iter().map(|o| format!("`{o}`")).collect::<Vec<_>>().join(", ");
    format!("Please enter one of the following options: {options}")
}

/// Checks `oneOf`, then the numeric bounds. Shared by the integer and float types.
fn check_number(n: f64, rendered: &str, arg: &Argument) -> Validation {
    if let Some(options) = &arg.one_of {
        if !options.iter().any(|o| o == rendered) {
            return Validation::InvalidWith(one_of_notice(options));
        }
    }
    if let Some(min) = arg.min {
        if n < min {
            return Validation::InvalidWith(format!("Please enter a number above or exactly {min}."));
        }
    }
    if let Some(max) = arg.max {
        if n > max {
            return Validation::InvalidWith(format!("Please enter a number below or exactly {max}."));
        }
    }
    Validation::Valid
}

pub struct StringType;

#[async_trait]
impl ArgumentType for StringType {
    fn id(&self) -> &str {
        "string"
    }

    async fn validate(
        &self,
        value: &str,
        _: &DispatchContext,
        _: &IncomingMessage,
        arg: &Argument,
    ) -> anyhow::Result<Validation> {
        if let Some(options) = &arg.one_of {
            if !options.contains(&value.to_lowercase()) {
                return Ok(Validation::InvalidWith(one_of_notice(options)));
            }
        }

        let length = value.chars().count() as f64;
        if let Some(min) = arg.min {
            if length < min {
                return Ok(Validation::InvalidWith(format!(
                    "Please keep the {} above or exactly {min} characters.",
                    arg.label
                )));
            }
        }
        if let Some(max) = arg.max {
            if length > max {
                return Ok(Validation::InvalidWith(format!(
                    "Please keep the {} below or exactly {max} characters.",
                    arg.label
                )));
            }
        }

        Ok(Validation::Valid)
    }

    async fn parse(&self, value: &str, _: &DispatchContext, _: &IncomingMessage, _: &Argument) -> anyhow::Result<ArgValue> {
        Ok(ArgValue::String(value.to_owned()))
    }
}

pub struct IntegerType;

#[async_trait]
impl ArgumentType for IntegerType {
    fn id(&self) -> &str {
        "integer"
    }

    async fn validate(
        &self,
        value: &str,
        _: &DispatchContext,
        _: &IncomingMessage,
        arg: &Argument,
    ) -> anyhow::Result<Validation> {
        let Ok(int) = value.trim().parse::<i64>() else {
            return Ok(Validation::Invalid);
        };
        Ok(check_number(int as f64, &int.to_string(), arg))
    }

    async fn parse(&self, value: &str, _: &DispatchContext, _: &IncomingMessage, _: &Argument) -> anyhow::Result<ArgValue> {
        Ok(ArgValue::Integer(value.trim().parse()?))
    }
}

pub struct FloatType;

#[async_trait]
impl ArgumentType for FloatType {
    fn id(&self) -> &str {
        "float"
    }

    async fn validate(
        &self,
        value: &str,
        _: &DispatchContext,
        _: &IncomingMessage,
        arg: &Argument,
    ) -> anyhow::Result<Validation> {
        match value.trim().parse::<f64>() {
            Ok(float) if float.is_finite() => Ok(check_number(float, &float.to_string(), arg)),
            _ => Ok(Validation::Invalid),
        }
    }

    async fn parse(&self, value: &str, _: &DispatchContext, _: &IncomingMessage, _: &Argument) -> anyhow::Result<ArgValue> {
        Ok(ArgValue::Float(value.trim().parse()?))
    }
}

const TRUTHY: &[&str] = &["true", "t", "yes", "y", "on", "enable", "enabled", "1", "+"];
const FALSY: &[&str] = &["false", "f", "no", "n", "off", "disable", "disabled", "0", "-"];

pub struct BooleanType;

#[async_trait]
impl ArgumentType for BooleanType {
    fn id(&self) -> &str {
        "boolean"
    }

    async fn validate(
        &self,
        value: &str,
        _: &DispatchContext,
        _: &IncomingMessage,
        _: &Argument,
    ) -> anyhow::Result<Validation> {
        let lc = value.to_lowercase();
        Ok(Validation::from(TRUTHY.contains(&&*lc) || FALSY.contains(&&*lc)))
    }

    async fn parse(&self, value: &str, _: &DispatchContext, _: &IncomingMessage, _: &Argument) -> anyhow::Result<ArgValue> {
        let lc = value.to_lowercase();
        if TRUTHY.contains(&&*lc) {
            Ok(ArgValue::Boolean(true))
        } else if FALSY.contains(&&*lc) {
            Ok(ArgValue::Boolean(false))
        } else {
            anyhow::bail!("unknown boolean value: {value}")
        }
    }
}
