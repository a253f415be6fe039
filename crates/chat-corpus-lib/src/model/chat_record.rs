//! Two-role training records and the inference result line.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// One fine-tuning example: exactly a user entry followed by an assistant entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub messages: Vec<ChatMessage>,
}

impl ChatRecord {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            messages: vec![
                ChatMessage {
                    role: Role::User,
                    content: user.into(),
                },
                ChatMessage {
                    role: Role::Assistant,
                    content: assistant.into(),
                },
            ],
        }
    }

    /// Content of the first user entry, used as the inference prompt.
    pub fn user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Prompt and generated answer, one line of the inference output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceRecord {
    pub input: String,
    pub modeling_output: String,
}
