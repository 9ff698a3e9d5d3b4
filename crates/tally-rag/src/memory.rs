//! Bounded conversation history.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message.
    User,
    /// Assistant response.
    Assistant,
}

/// A message in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID.
    id: Uuid,

    /// Message role.
    role: MessageRole,

    /// Message content.
    content: String,

    /// When the message was created.
    created_at: Timestamp,
}

impl Message {
    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role: MessageRole::User,
            content: content.into(),
            created_at: Timestamp::now(),
        }
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role: MessageRole::Assistant,
            content: content.into(),
            created_at: Timestamp::now(),
        }
    }

    /// Returns the message ID.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the message role.
    pub fn role(&self) -> MessageRole {
        self.role
    }

    /// Returns the message content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns when the message was created.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

/// Ordered, bounded conversation log.
///
/// Append-only except for the hard cap: once `max_history` is exceeded the
/// oldest messages are silently dropped (a sliding window, not
/// summarization). After any mutation `len() <= max_history` holds.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    messages: Vec<Message>,
    max_history: usize,
}

impl ConversationMemory {
    /// Creates a memory holding at most `max_history` messages.
    pub fn new(max_history: usize) -> Self {
        Self {
            messages: Vec::with_capacity(max_history),
            max_history,
        }
    }

    /// Appends a user message.
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    /// Appends an assistant message.
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    /// Returns the current messages, oldest first.
    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages currently stored.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the history is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Renders the last `limit` messages (or all, when `None`) as prompt
    /// context, one `Role: content` line per message.
    pub fn context_string(&self, limit: Option<usize>) -> String {
        let start = match limit {
            Some(limit) if limit < self.messages.len() => self.messages.len() - limit,
            _ => 0,
        };

        self.messages[start..]
            .iter()
            .map(|message| {
                let role = match message.role() {
                    MessageRole::User => "User",
                    MessageRole::Assistant => "Assistant",
                };
                format!("{role}: {}", message.content())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Clears the conversation history.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);

        if self.messages.len() > self.max_history {
            let excess = self.messages.len() - self.max_history;
            self.messages.drain(0..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_memory_is_empty() {
        let memory = ConversationMemory::new(10);
        assert!(memory.is_empty());
        assert_eq!(memory.len(), 0);
    }

    #[test]
    fn messages_keep_their_role_and_order() {
        let mut memory = ConversationMemory::new(10);
        memory.add_user_message("What was the 2022 revenue?");
        memory.add_assistant_message("Revenue was $10 million.");

        let history = memory.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role(), MessageRole::User);
        assert_eq!(history[1].role(), MessageRole::Assistant);
    }

    #[test]
    fn memory_never_exceeds_max_history() {
        let mut memory = ConversationMemory::new(4);

        for i in 0..10 {
            memory.add_user_message(format!("message {i}"));
            assert!(memory.len() <= 4);
        }
    }

    #[test]
    fn eviction_drops_the_oldest_first() {
        let mut memory = ConversationMemory::new(3);

        for i in 0..5 {
            memory.add_user_message(format!("message {i}"));
        }

        let contents: Vec<&str> = memory.history().iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["message 2", "message 3", "message 4"]);
    }

    #[test]
    fn context_string_renders_roles() {
        let mut memory = ConversationMemory::new(10);
        memory.add_user_message("hello");
        memory.add_assistant_message("hi there");

        assert_eq!(memory.context_string(None), "User: hello\nAssistant: hi there");
    }

    #[test]
    fn context_string_honors_the_window() {
        let mut memory = ConversationMemory::new(10);
        for i in 0..6 {
            memory.add_user_message(format!("message {i}"));
        }

        let context = memory.context_string(Some(2));
        assert_eq!(context, "User: message 4\nUser: message 5");

        // A window larger than the history includes everything.
        assert_eq!(memory.context_string(Some(100)), memory.context_string(None));
    }

    #[test]
    fn clear_resets_history() {
        let mut memory = ConversationMemory::new(10);
        memory.add_user_message("hello");
        memory.clear();
        assert!(memory.is_empty());
    }
}
