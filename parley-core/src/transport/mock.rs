use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    Author, ChannelId, Destination, Entity, EntityKind, EntityQuery, GuildId, IncomingMessage, SentMessage, Transport,
    UserId,
};

#[derive(Clone, Debug)]
pub struct MockMessage {
    pub id: u64,
    pub destination: Destination,
    pub content: String,
    pub edits: usize,
    pub deleted: bool,
}

/// Records everything sent through it and answers prompts from a script.
pub struct MockTransport {
    next_id: AtomicU64,
    pub log: Mutex<Vec<MockMessage>>,
    answers: Mutex<VecDeque<String>>,
    pub client_missing: Mutex<Vec<String>>,
    pub user_missing: Mutex<Vec<String>>,
    pub entities: Mutex<Vec<Entity>>,
}
impl MockTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1000),
            log: Mutex::new(vec![]),
            answers: Mutex::new(VecDeque::new()),
            client_missing: Mutex::new(vec![]),
            user_missing: Mutex::new(vec![]),
            entities: Mutex::new(vec![]),
        }
    }

    pub fn push_answers(&self, answers: &[&str]) {
        self.answers
            .lock()
            .unwrap()
            .extend(answers.iter().map(|a| (*a).to_owned()));
    }

    /// Current content of every message that has not been deleted, oldest first.
    pub fn contents(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|m| !m.deleted)
            .map(|m| m.content.clone())
            .collect()
    }

    pub fn messages(&self) -> Vec<MockMessage> {
        self.log.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, destination: Destination, content: &str) -> anyhow::Result<SentMessage> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(MockMessage {
            id,
            destination,
            content: content.to_owned(),
            edits: 0,
            deleted: false,
        });
        Ok(SentMessage { id, destination })
    }

    async fn edit(&self, message: &SentMessage, content: &str) -> anyhow::Result<()> {
        let mut log = self.log.lock().unwrap();
        let entry = log
            .iter_mut()
            .find(|m| m.id == message.id && !m.deleted)
            .ok_or_else(|| anyhow::anyhow!("unknown message {}", message.id))?;
        entry.content = content.to_owned();
        entry.edits += 1;
        Ok(())
    }

    async fn delete(&self, message: &SentMessage) -> anyhow::Result<()> {
        let mut log = self.log.lock().unwrap();
        if let Some(entry) = log.iter_mut().find(|m| m.id == message.id) {
            entry.deleted = true;
        }
        Ok(())
    }

    async fn await_reply(
        &self,
        author: UserId,
        channel: ChannelId,
        wait: Option<Duration>,
    ) -> anyhow::Result<Option<IncomingMessage>> {
        let answer = self.answers.lock().unwrap().pop_front();
        match answer {
            Some(content) => Ok(Some(IncomingMessage {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                author: Author {
                    id: author,
                    name: "tester".to_owned(),
                    bot: false,
                },
                channel_id: channel,
                guild_id: None,
                content,
                nsfw: false,
                edited_timestamp: None,
            })),
            None => {
                if let Some(wait) = wait {
                    tokio::time::sleep(wait).await;
                }
                Ok(None)
            },
        }
    }

    async fn missing_permissions(
        &self,
        _channel: ChannelId,
        user: Option<UserId>,
        required: &[String],
    ) -> anyhow::Result<Vec<String>> {
        let missing = match user {
            Some(_) => self.user_missing.lock().unwrap().clone(),
            None => self.client_missing.lock().unwrap().clone(),
        };
        Ok(required.iter().filter(|p| missing.contains(p)).cloned().collect())
    }

    async fn lookup_entities(
        &self,
        kind: EntityKind,
        _guild: Option<GuildId>,
        query: &EntityQuery,
    ) -> anyhow::Result<Vec<Entity>> {
        let entities = self.entities.lock().unwrap();
        Ok(entities
            .iter()
            .filter(|e| e.kind == kind)
            .filter(|e| match query {
                EntityQuery::Id(id) => e.id == *id,
                EntityQuery::Name(name) => e.name.to_lowercase().contains(&name.to_lowercase()),
            })
            .cloned()
            .collect())
    }
}
