use serde::{Deserialize, Serialize};

/// One question plus the answer-like messages collected after it.
///
/// Only turns with a non-empty `assistant` list leave the segmenter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub user: Vec<String>,
    pub assistant: Vec<String>,
}

impl Turn {
    /// Start a turn from the message that opened it.
    pub fn open(question: impl Into<String>) -> Self {
        Self {
            user: vec![question.into()],
            assistant: Vec::new(),
        }
    }

    pub fn has_answers(&self) -> bool {
        !self.assistant.is_empty()
    }
}
