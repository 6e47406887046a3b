//! UI-agnostic conversation types
//!
//! These structures are shared by every front end that drives a
//! [`Pipeline`](crate::pipeline::Pipeline) and don't depend on any specific UI
//! framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-conversation sequence number, strictly increasing in append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// Who a message is attributed to. Only drives rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Error,
}

/// An uploaded file as shown in the conversation. The payload itself is never kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "file")]
pub struct FileDescriptor {
    pub name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    File(FileDescriptor),
}

impl Content {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text.as_str()),
            Content::File(_) => None,
        }
    }
}

/// A single entry in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: Content,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(id: MessageId, role: Role, content: Content) -> Self {
        Self {
            id,
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    pub fn user_text(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, Role::User, Content::Text(text.into()))
    }

    pub fn user_file(id: MessageId, file: FileDescriptor) -> Self {
        Self::new(id, Role::User, Content::File(file))
    }

    pub fn assistant(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, Role::Assistant, Content::Text(text.into()))
    }

    pub fn error(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, Role::Error, Content::Text(text.into()))
    }
}

/// Ordered, append-only list of messages. Insertion order is display order.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    next_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub(crate) fn push_with(&mut self, build: impl FnOnce(MessageId) -> Message) -> &Message {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(build(id));
        &self.messages[self.messages.len() - 1]
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
