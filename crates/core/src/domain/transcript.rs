use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::command::Intent;
use crate::domain::record::RecordId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    System,
    Success,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub related_intent: Option<Intent>,
    pub related_record_id: Option<RecordId>,
}

/// Append-only ordered log of one chat session.
///
/// Messages are never mutated or removed, and the order of appends is the
/// order of display. The vector is private so the only write path is the
/// `push_*` methods.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionTranscript {
    messages: Vec<Message>,
}

impl SessionTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> &Message {
        self.push(MessageRole::User, text.into(), None, None)
    }

    pub fn push_system(&mut self, text: impl Into<String>) -> &Message {
        self.push(MessageRole::System, text.into(), None, None)
    }

    pub fn push_success(
        &mut self,
        text: impl Into<String>,
        intent: Intent,
        record_id: RecordId,
    ) -> &Message {
        self.push(MessageRole::Success, text.into(), Some(intent), Some(record_id))
    }

    fn push(
        &mut self,
        role: MessageRole,
        text: String,
        related_intent: Option<Intent>,
        related_record_id: Option<RecordId>,
    ) -> &Message {
        self.messages.push(Message {
            id: MessageId(Uuid::new_v4()),
            role,
            text,
            timestamp: Utc::now(),
            related_intent,
            related_record_id,
        });
        self.messages.last().expect("just pushed")
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}
