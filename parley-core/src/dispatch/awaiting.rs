//! Per author+channel exclusion while arguments are being collected.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::transport::{ChannelId, UserId};

type Key = (UserId, ChannelId);

/// The set of author+channel pairs with a prompt cycle in progress.
///
/// Messages from a pair that is awaiting are not dispatched: they are answers to a prompt, not new
/// commands.
#[derive(Default)]
pub struct AwaitingLocks {
    locks: Mutex<HashMap<Key, Arc<AsyncMutex<()>>>>,
}

impl AwaitingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the pair as awaiting until the returned guard is dropped.
    pub async fn acquire(self: &Arc<Self>, author: UserId, channel: ChannelId) -> AwaitingGuard {
        let key = (author, channel);
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key)
            .or_default()
            .clone();

        AwaitingGuard {
            guard: Some(lock.lock_owned().await),
            locks: self.clone(),
            key,
        }
    }

    pub fn is_awaiting(&self, author: UserId, channel: ChannelId) -> bool {
        self.locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(author, channel))
            .is_some_and(|lock| lock.try_lock().is_err())
    }
}

pub struct AwaitingGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<AwaitingLocks>,
    key: Key,
}

impl Drop for AwaitingGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = self.locks.locks.lock().unwrap_or_else(|e| e.into_inner());
        // only the map itself still references the lock: nobody else is waiting on it
        if locks.get(&self.key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn released_on_drop() {
        let locks = Arc::new(AwaitingLocks::new());
        let guard = locks.acquire(1, 2).await;

        assert!(locks.is_awaiting(1, 2));
        assert!(!locks.is_awaiting(1, 3));
        assert!(!locks.is_awaiting(2, 2));

        drop(guard);
        assert!(!locks.is_awaiting(1, 2));
        assert!(locks.locks.lock().unwrap().is_empty());
    }

    async fn failing_collection(locks: Arc<AwaitingLocks>) -> anyhow::Result<()> {
        let _guard = locks.acquire(1, 2).await;
        anyhow::bail!("collector failed")
    }

    #[tokio::test]
    async fn released_when_task_fails() {
        let locks = Arc::new(AwaitingLocks::new());

        let result = tokio::spawn(failing_collection(locks.clone())).await.unwrap();
        assert!(result.is_err());
        assert!(!locks.is_awaiting(1, 2));
    }
}
