//! Message and Conversation domain types.
//!
//! The chat session owns a `Conversation`; every routed turn is a
//! `ConversationTurn` cut from it: the raw utterance plus two bounded
//! trailing windows. The router never persists either.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (patient)
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }
}

/// An ordered sequence of messages in one chat session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    /// Ordered messages, most recent last
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to the conversation.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Render the trailing `turns` user/assistant messages, one per line,
    /// as `Patient: ...` / `Assistant: ...`. System messages are skipped.
    pub fn window(&self, turns: usize) -> String {
        let visible: Vec<&Message> = self
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .collect();
        let start = visible.len().saturating_sub(turns);

        visible[start..]
            .iter()
            .map(|m| {
                let speaker = match m.role {
                    Role::User => "Patient",
                    _ => "Assistant",
                };
                format!("{speaker}: {}", m.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Join the trailing `turns` user-authored messages with single spaces.
    pub fn user_window(&self, turns: usize) -> String {
        let user: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect();
        let start = user.len().saturating_sub(turns);
        user[start..].join(" ")
    }

    /// Cut a turn for `user_message` from the history *before* it is pushed.
    pub fn turn(&self, user_message: impl Into<String>, turns: usize) -> ConversationTurn {
        ConversationTurn {
            user_message: user_message.into(),
            conversation_window: self.window(turns),
            user_only_window: self.user_window(turns),
        }
    }
}

/// The immutable input of one routing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// The raw text of the current user message
    pub user_message: String,

    /// Trailing prior turns (assistant and user), most recent last
    #[serde(default)]
    pub conversation_window: String,

    /// Trailing prior user-authored text only
    #[serde(default)]
    pub user_only_window: String,
}

impl ConversationTurn {
    pub fn new(
        user_message: impl Into<String>,
        conversation_window: impl Into<String>,
        user_only_window: impl Into<String>,
    ) -> Self {
        Self {
            user_message: user_message.into(),
            conversation_window: conversation_window.into(),
            user_only_window: user_only_window.into(),
        }
    }

    /// The text the symptom gate inspects: the user-only window (or the full
    /// window when no user-only text is available) followed by the current
    /// message.
    pub fn symptom_evidence(&self) -> String {
        let window = if self.user_only_window.trim().is_empty() {
            &self.conversation_window
        } else {
            &self.user_only_window
        };
        append_unless_trailing(window, &self.user_message, " ")
    }

    /// The dialogue so far, ending with the current message as a
    /// `Patient:` line. Symptom extraction reads this.
    pub fn dialogue(&self) -> String {
        if self.conversation_window.trim_end().ends_with(self.user_message.trim()) {
            return self.conversation_window.clone();
        }
        append_unless_trailing(
            &self.conversation_window,
            &format!("Patient: {}", self.user_message.trim()),
            "\n",
        )
    }
}

/// `window` followed by `tail`, unless the window already ends with it.
/// Callers may hand over windows that include the current message or not.
fn append_unless_trailing(window: &str, tail: &str, sep: &str) -> String {
    let window = window.trim_end();
    let tail = tail.trim();
    if tail.is_empty() || window.ends_with(tail) {
        window.to_string()
    } else if window.is_empty() {
        tail.to_string()
    } else {
        format!("{window}{sep}{tail}")
    }
}
