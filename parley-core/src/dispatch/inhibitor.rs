//! Predicates that can veto a dispatch before the command runs.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::context::DispatchContext;
use crate::transport::UserId;

/// A vetoed dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inhibition {
    pub reason: String,
    /// Sent in place of running the command.
    pub response: Option<String>,
}

impl Inhibition {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            response: None,
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }
}

#[async_trait]
pub trait Inhibitor: Send + Sync {
    async fn inhibit(&self, ctxt: &DispatchContext) -> anyhow::Result<Option<Inhibition>>;
}

pub type TInhibitor = Arc<dyn Inhibitor>;

struct FnInhibitor<F>(F);

#[async_trait]
impl<F> Inhibitor for FnInhibitor<F>
where
    F: Fn(&DispatchContext) -> Option<Inhibition> + Send + Sync,
{
    async fn inhibit(&self, ctxt: &DispatchContext) -> anyhow::Result<Option<Inhibition>> {
        Ok((self.0)(ctxt))
    }
}

/// Wraps a synchronous predicate as an inhibitor.
pub fn inhibitor_fn<F>(predicate: F) -> TInhibitor
where
    F: Fn(&DispatchContext) -> Option<Inhibition> + Send + Sync + 'static,
{
    Arc::new(FnInhibitor(predicate))
}

/// Ignores every message from blacklisted users.
#[derive(Default)]
pub struct BlacklistInhibitor {
    users: RwLock<HashSet<UserId>>,
}

impl BlacklistInhibitor {
    pub fn new(users: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().collect()),
        }
    }

    pub fn add(&self, user: UserId) -> bool {
        self.users.write().unwrap_or_else(|e| e.into_inner()).insert(user)
    }

    pub fn remove(&self, user: UserId) -> bool {
        self.users.write().unwrap_or_else(|e| e.into_inner()).remove(&user)
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.users.read().unwrap_or_else(|e| e.into_inner()).contains(&user)
    }
}

#[async_trait]
impl Inhibitor for BlacklistInhibitor {
    async fn inhibit(&self, ctxt: &DispatchContext) -> anyhow::Result<Option<Inhibition>> {
        Ok(self
            .contains(ctxt.message.author.id)
            .then(|| Inhibition::new("blacklist")))
    }
}
