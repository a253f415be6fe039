//! Corpus formatting: sanitized turns → two-role chat records.

use serde::Serialize;

use crate::model::{chat_record::ChatRecord, turn::Turn};
use crate::sanitize::Sanitizer;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FormatStats {
    pub turns_seen: usize,
    pub records_emitted: usize,
    pub dropped_empty_user: usize,
    pub dropped_empty_assistant: usize,
}

#[derive(Debug, Default)]
pub struct FormatOutput {
    pub records: Vec<ChatRecord>,
    pub stats: FormatStats,
}

/// Sanitize each text and join the non-empty results with a single space.
fn clean_join(texts: &[String], sanitizer: &Sanitizer) -> String {
    texts
        .iter()
        .map(|t| sanitizer.sanitize(t))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Why a turn produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    EmptyUser,
    EmptyAssistant,
}

/// Convert one turn, or say which side came out empty after cleaning.
pub fn try_format_turn(turn: &Turn, sanitizer: &Sanitizer) -> Result<ChatRecord, DropReason> {
    let user = clean_join(&turn.user, sanitizer);
    if user.is_empty() {
        return Err(DropReason::EmptyUser);
    }
    let assistant = clean_join(&turn.assistant, sanitizer);
    if assistant.is_empty() {
        return Err(DropReason::EmptyAssistant);
    }
    Ok(ChatRecord::new(user, assistant))
}

/// Convert one turn; `None` when either side is empty after cleaning.
pub fn format_turn(turn: &Turn, sanitizer: &Sanitizer) -> Option<ChatRecord> {
    try_format_turn(turn, sanitizer).ok()
}

pub fn format_corpus(turns: &[Turn], sanitizer: &Sanitizer) -> FormatOutput {
    let mut out = FormatOutput::default();
    for turn in turns {
        out.stats.turns_seen = out.stats.turns_seen.saturating_add(1);
        match try_format_turn(turn, sanitizer) {
            Ok(record) => {
                out.records.push(record);
                out.stats.records_emitted = out.stats.records_emitted.saturating_add(1);
            }
            Err(DropReason::EmptyUser) => {
                out.stats.dropped_empty_user = out.stats.dropped_empty_user.saturating_add(1);
            }
            Err(DropReason::EmptyAssistant) => {
                out.stats.dropped_empty_assistant =
                    out.stats.dropped_empty_assistant.saturating_add(1);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::chat_record::Role;
    use crate::sanitize::SanitizerConfig;

    fn sanitizer() -> Sanitizer {
        Sanitizer::new(&SanitizerConfig::default()).unwrap()
    }

    fn turn(user: &[&str], assistant: &[&str]) -> Turn {
        Turn {
            user: user.iter().map(|s| s.to_string()).collect(),
            assistant: assistant.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn joins_cleaned_messages_with_single_space() {
        let rec = format_turn(
            &turn(&["맛집 추천해 주세요 ㅎㅎ"], &["시장 안 국밥집이요!", "https://spam", "저는 빵집 추천 😋"]),
            &sanitizer(),
        )
        .unwrap();
        assert_eq!(rec.messages[0].role, Role::User);
        assert_eq!(rec.messages[0].content, "맛집 추천해 주세요");
        assert_eq!(rec.messages[1].role, Role::Assistant);
        assert_eq!(rec.messages[1].content, "시장 안 국밥집이요! 저는 빵집 추천");
    }

    #[test]
    fn drops_turn_when_user_side_is_empty() {
        let t = turn(&["https://example.com 이거 뭐예요?"], &["그냥 광고 링크예요"]);
        assert!(format_turn(&t, &sanitizer()).is_none());
        let out = format_corpus(&[t], &sanitizer());
        assert!(out.records.is_empty());
        assert_eq!(out.stats.dropped_empty_user, 1);
    }

    #[test]
    fn drops_turn_when_assistant_side_is_empty() {
        let t = turn(&["환전 어디서 해요?"], &["유로 환전 여기서!", "👍👍"]);
        let out = format_corpus(&[t], &sanitizer());
        assert!(out.records.is_empty());
        assert_eq!(out.stats.dropped_empty_assistant, 1);
    }

    #[test]
    fn emoji_only_answer_drops_the_turn() {
        let t = turn(&["질문?"], &["\u{2764}\u{FE0F}"]);
        assert!(format_turn(&t, &sanitizer()).is_none());
        assert_eq!(
            try_format_turn(&t, &sanitizer()),
            Err(DropReason::EmptyAssistant)
        );
    }

    #[test]
    fn drop_reason_prefers_user_side() {
        let t = turn(&["https://a.b"], &["👍"]);
        assert_eq!(try_format_turn(&t, &sanitizer()), Err(DropReason::EmptyUser));
        let out = format_corpus(&[t], &sanitizer());
        assert_eq!(out.stats.dropped_empty_user, 1);
        assert_eq!(out.stats.dropped_empty_assistant, 0);
    }

    #[test]
    fn corpus_keeps_turn_order() {
        let out = format_corpus(
            &[turn(&["첫 질문?"], &["첫 대답입니다"]), turn(&["둘째 질문?"], &["둘째 대답입니다"])],
            &sanitizer(),
        );
        assert_eq!(out.stats.records_emitted, 2);
        assert_eq!(out.records[0].user_content(), Some("첫 질문?"));
        assert_eq!(out.records[1].user_content(), Some("둘째 질문?"));
    }
}
