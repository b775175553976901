//! Ordered chat log addressed by generated message ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

use crate::markdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Who a chat message is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Assistant,
}

/// A single entry in the chat log.
///
/// User content is plain text. Assistant content is an HTML fragment produced
/// by [`markdown::convert_markdown_to_html`] or placeholder markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub content: String,
    pub rendered_at: SystemTime,
}

impl Message {
    pub fn is_loading(&self) -> bool {
        self.sender == Sender::Assistant && markdown::is_loading(&self.content)
    }
}

#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    next_id: u64,
    scroll_requested: bool,
}

impl MessageLog {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the end of the log and return its id.
    pub fn append(&mut self, sender: Sender, content: impl Into<String>) -> MessageId {
        self.next_id += 1;
        let id = MessageId(self.next_id);
        self.messages.push(Message {
            id,
            sender,
            content: content.into(),
            rendered_at: SystemTime::now(),
        });
        self.scroll_requested = true;
        id
    }

    /// Swap the content of an existing message in place.
    ///
    /// Returns false when the id is no longer in the log.
    pub fn replace(&mut self, id: MessageId, content: impl Into<String>) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content = content.into();
                message.rendered_at = SystemTime::now();
                self.scroll_requested = true;
                true
            }
            None => false,
        }
    }

    /// Remove a message. A missing id is a no-op.
    pub fn remove(&mut self, id: MessageId) -> Option<Message> {
        let idx = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(idx))
    }

    #[cfg(test)]
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    #[cfg(test)]
    pub fn loading_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_loading()).count()
    }

    /// Drop every message. Ids keep counting up, so none is ever reused.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.scroll_requested = true;
    }

    /// Consume the pending scroll-to-latest request set by the last mutation.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }
}
