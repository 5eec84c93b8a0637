use std::collections::HashMap;
use std::sync::Arc;

use crate::command::Command;
use crate::command::group::CommandGroup;
use crate::transport::Entity;

/// A parsed argument value.
#[derive(Clone, Debug)]
pub enum ArgValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Entity(Entity),
    Command(Arc<Command>),
    Group(Arc<CommandGroup>),
    /// The values collected for an infinite argument.
    List(Vec<ArgValue>),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        if let Self::String(s) = self { Some(s) } else { None }
    }

    pub fn as_i64(&self) -> Option<i64> {
        if let Self::Integer(i) = self { Some(*i) } else { None }
    }

    /// Integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Self::Boolean(b) = self { Some(*b) } else { None }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        if let Self::Entity(e) = self { Some(e) } else { None }
    }

    pub fn as_command(&self) -> Option<&Arc<Command>> {
        if let Self::Command(c) = self { Some(c) } else { None }
    }

    pub fn as_group(&self) -> Option<&Arc<CommandGroup>> {
        if let Self::Group(g) = self { Some(g) } else { None }
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        if let Self::List(l) = self { Some(l) } else { None }
    }
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Entity(a), Self::Entity(b)) => a == b,
            (Self::Command(a), Self::Command(b)) => a.name == b.name,
            (Self::Group(a), Self::Group(b)) => a.id == b.id,
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

/// What a command body receives as its arguments.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandArgs {
    /// Values obtained by the command's argument collector, keyed by argument key.
    Collected(HashMap<String, ArgValue>),
    /// Capture groups of the trigger pattern that matched. Index 0 is the whole match.
    Pattern(Vec<Option<String>>),
    /// The whole argument string, trimmed and unquoted.
    Single(String),
    Multiple(Vec<String>),
}

impl CommandArgs {
    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        if let Self::Collected(values) = self { values.get(key) } else { None }
    }
}
