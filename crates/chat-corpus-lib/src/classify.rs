//! Question / answer classification over trimmed message text.
//!
//! Both predicates are pure functions of the text and the rule tables held
//! by [`QuestionRules`]. Swap the tables to classify a different community
//! or language without touching the segmenter.

use serde::{Deserialize, Serialize};

/// Rule tables for [`QuestionRules::is_question`] and
/// [`QuestionRules::is_answer_like`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionRules {
    /// Sentence endings that mark an interrogative.
    pub endings: Vec<String>,
    /// Phrases expressing confusion or a request for help, matched anywhere.
    pub intent_phrases: Vec<String>,
    /// Minimum trimmed length, in characters, for an answer-like message.
    pub min_answer_chars: usize,
}

impl Default for QuestionRules {
    fn default() -> Self {
        Self {
            endings: to_strings(&[
                "나요", "인가요", "되나요", "할까요", "어디", "어떻게", "왜", "뭐", "무엇",
            ]),
            intent_phrases: to_strings(&[
                "모르겠",
                "헷갈",
                "이해가 안",
                "알려주",
                "어떻게 해야",
                "추천",
            ]),
            min_answer_chars: 5,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl QuestionRules {
    /// True when the trimmed text contains `?`, ends with an interrogative
    /// ending, or contains an intent phrase.
    pub fn is_question(&self, text: &str) -> bool {
        let text = text.trim();
        if text.contains('?') {
            return true;
        }
        if self.endings.iter().any(|e| text.ends_with(e.as_str())) {
            return true;
        }
        self.intent_phrases.iter().any(|p| text.contains(p.as_str()))
    }

    /// True when the trimmed text is long enough and is not a question.
    pub fn is_answer_like(&self, text: &str) -> bool {
        let text = text.trim();
        if text.chars().count() < self.min_answer_chars {
            return false;
        }
        !self.is_question(text)
    }
}
