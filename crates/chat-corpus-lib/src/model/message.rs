// The cached timestamp is skipped by serde so the persisted shape stays
// `{date, speaker, time, content}`; it is re-derived after every load.
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::temporal::parse_timestamp;

/// A single chat utterance parsed from the raw export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// `YYYY-MM-DD` of the nearest preceding date separator, if any was seen.
    pub date: Option<String>,
    pub speaker: String,
    /// 24-hour `HH:MM`.
    pub time: String,
    /// Message text; continuation lines are joined with `\n`.
    pub content: String,
    #[serde(skip)]
    pub timestamp: Option<NaiveDateTime>,
}

impl Message {
    pub fn new(
        date: Option<String>,
        speaker: impl Into<String>,
        time: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            date,
            speaker: speaker.into(),
            time: time.into(),
            content: content.into(),
            timestamp: None,
        }
    }

    /// Compute and cache the combined date/time instant.
    ///
    /// Leaves `timestamp` as `None` when the date is missing or either part
    /// fails to parse.
    pub fn derive_timestamp(&mut self) -> Option<NaiveDateTime> {
        self.timestamp = self
            .date
            .as_deref()
            .and_then(|date| parse_timestamp(date, &self.time));
        self.timestamp
    }
}

/// Derive the cached timestamp of every message in place.
pub fn derive_timestamps(messages: &mut [Message]) {
    for msg in messages.iter_mut() {
        msg.derive_timestamp();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_without_timestamp_in_key_order() {
        let mut msg = Message::new(Some("2025-01-02".into()), "민수", "13:05", "안녕하세요");
        msg.derive_timestamp();
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"date":"2025-01-02","speaker":"민수","time":"13:05","content":"안녕하세요"}"#
        );
    }

    #[test]
    fn missing_date_leaves_timestamp_empty() {
        let mut msg = Message::new(None, "a", "09:00", "text");
        assert!(msg.derive_timestamp().is_none());
    }

    #[test]
    fn null_date_round_trips_from_json() {
        let msg: Message =
            serde_json::from_str(r#"{"date":null,"speaker":"a","time":"09:00","content":"x"}"#)
                .unwrap();
        assert_eq!(msg.date, None);
        assert_eq!(msg.timestamp, None);
    }
}
