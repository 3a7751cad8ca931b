//! Shared conversation context.
//!
//! Every persona reads the same ordered, role-tagged message sequence and
//! some append to it. History is append-only with exactly one exception: the
//! first system message can be atomically replaced to inject late-arriving
//! personalized content (e.g. a candidate profile parsed after the session
//! started). The replacement is copy-then-swap; readers never observe a
//! half-written edit.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// System-generated instruction.
    System,
    /// Message from the candidate.
    User,
    /// Message from an AI persona.
    Assistant,
}

/// A single message in the shared conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender.
    pub role: ChatRole,
    /// The content of the message.
    pub content: String,
    /// Timestamp when the message was created (ISO 8601 format).
    pub timestamp: String,
}

impl ChatMessage {
    /// Creates a message stamped with the current time.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Convenience constructor for a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    /// Convenience constructor for a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Convenience constructor for an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// The mutable shared state every persona reads.
///
/// Readers take cheap `Arc` snapshots and may lag behind concurrent appends;
/// that is acceptable because history only ever grows. Writers serialize on
/// the inner lock, so there are no torn updates.
#[derive(Default)]
pub struct ConversationContext {
    messages: RwLock<Arc<Vec<ChatMessage>>>,
}

impl ConversationContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context seeded with a system prompt.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: RwLock::new(Arc::new(vec![ChatMessage::system(prompt)])),
        }
    }

    /// Appends a message to the history.
    pub async fn append(&self, message: ChatMessage) {
        let mut guard = self.messages.write().await;
        let mut next = (**guard).clone();
        next.push(message);
        *guard = Arc::new(next);
    }

    /// Returns an immutable snapshot of the history.
    ///
    /// The snapshot is stable: later appends produce a new `Arc` and never
    /// touch the vector a reader already holds.
    pub async fn snapshot(&self) -> Arc<Vec<ChatMessage>> {
        self.messages.read().await.clone()
    }

    /// Number of messages currently in the history.
    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Whether the history is empty.
    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }

    /// Atomically replaces the first system message.
    ///
    /// This is the single permitted deviation from append-only history. The
    /// edit is made on a private copy and the shared reference is swapped in
    /// one step. If no system message exists yet, the new one is inserted at
    /// the front.
    pub async fn replace_system_prompt(&self, content: impl Into<String>) {
        let content = content.into();
        let mut guard = self.messages.write().await;
        let mut next = (**guard).clone();
        match next.iter_mut().find(|m| m.role == ChatRole::System) {
            Some(first_system) => {
                first_system.content = content;
                first_system.timestamp = chrono::Utc::now().to_rfc3339();
            }
            None => next.insert(0, ChatMessage::system(content)),
        }
        *guard = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_preserves_order() {
        let ctx = ConversationContext::new();
        ctx.append(ChatMessage::user("one")).await;
        ctx.append(ChatMessage::assistant("two")).await;
        ctx.append(ChatMessage::user("three")).await;

        let snapshot = ctx.snapshot().await;
        let contents: Vec<&str> = snapshot.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_snapshot_is_stable_across_appends() {
        let ctx = ConversationContext::with_system_prompt("base");
        let before = ctx.snapshot().await;

        ctx.append(ChatMessage::user("later")).await;

        assert_eq!(before.len(), 1);
        assert_eq!(ctx.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn test_replace_system_prompt_swaps_first_system_only() {
        let ctx = ConversationContext::with_system_prompt("generic instructions");
        ctx.append(ChatMessage::user("hello")).await;
        ctx.append(ChatMessage::system("crisis interruption")).await;

        let before = ctx.snapshot().await;
        ctx.replace_system_prompt("personalized instructions").await;
        let after = ctx.snapshot().await;

        // Old snapshot untouched.
        assert_eq!(before[0].content, "generic instructions");
        // New snapshot: first system replaced, later system message intact.
        assert_eq!(after[0].content, "personalized instructions");
        assert_eq!(after[2].content, "crisis interruption");
        assert_eq!(after.len(), 3);
    }

    #[tokio::test]
    async fn test_replace_system_prompt_inserts_when_missing() {
        let ctx = ConversationContext::new();
        ctx.append(ChatMessage::user("hello")).await;

        ctx.replace_system_prompt("late system prompt").await;

        let snapshot = ctx.snapshot().await;
        assert_eq!(snapshot[0].role, ChatRole::System);
        assert_eq!(snapshot[0].content, "late system prompt");
        assert_eq!(snapshot[1].content, "hello");
    }
}
