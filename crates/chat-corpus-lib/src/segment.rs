//! Turn segmentation: group a chronological message stream into
//! question → answers turns.
//!
//! The scan uses two cursors and never moves backwards. The outer cursor
//! searches for a question with a usable timestamp; the inner cursor collects
//! answer-like messages until the window is exceeded, another question shows
//! up, or the stream ends. The outer cursor then resumes *at* the message
//! that stopped the inner scan, so that message can open the next turn.

use serde::Serialize;
use tracing::debug;

use crate::classify::QuestionRules;
use crate::model::{message::Message, turn::Turn};
use crate::temporal::WindowConfig;

/// Counters describing a segmentation run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentStats {
    pub messages_seen: usize,
    pub questions_opened: usize,
    pub turns_emitted: usize,
    /// Questions that collected no answer-like message and were discarded.
    pub questions_unanswered: usize,
    pub answers_collected: usize,
    /// Messages passed over by the inner scan because their timestamp is missing.
    pub untimed_skipped: usize,
}

#[derive(Debug, Default)]
pub struct SegmentOutput {
    pub turns: Vec<Turn>,
    pub stats: SegmentStats,
}

/// Why the inner scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    WindowExceeded,
    NextQuestion,
    EndOfStream,
}

/// Segment `messages` into turns.
///
/// Messages must already carry their derived timestamps
/// (see [`crate::model::message::derive_timestamps`]).
pub fn segment_turns(
    messages: &[Message],
    rules: &QuestionRules,
    window: &WindowConfig,
) -> SegmentOutput {
    let mut out = SegmentOutput::default();
    let stats = &mut out.stats;
    stats.messages_seen = messages.len();

    let n = messages.len();
    let mut i = 0;

    while i < n {
        let msg = &messages[i];
        let question_time = match msg.timestamp {
            Some(t) if rules.is_question(&msg.content) => t,
            _ => {
                i += 1;
                continue;
            }
        };

        stats.questions_opened = stats.questions_opened.saturating_add(1);
        let mut turn = Turn::open(msg.content.clone());

        let mut j = i + 1;
        let mut stop = Stop::EndOfStream;
        while j < n {
            let next = &messages[j];
            let Some(next_time) = next.timestamp else {
                stats.untimed_skipped = stats.untimed_skipped.saturating_add(1);
                j += 1;
                continue;
            };

            if window.exceeded(question_time, next_time) {
                stop = Stop::WindowExceeded;
                break;
            }
            if rules.is_question(&next.content) {
                stop = Stop::NextQuestion;
                break;
            }
            if rules.is_answer_like(&next.content) {
                turn.assistant.push(next.content.clone());
            }
            j += 1;
        }

        debug!(
            question_index = i,
            stop_index = j,
            answers = turn.assistant.len(),
            stop = ?stop,
            "closed turn window"
        );

        if turn.has_answers() {
            stats.answers_collected = stats.answers_collected.saturating_add(turn.assistant.len());
            stats.turns_emitted = stats.turns_emitted.saturating_add(1);
            out.turns.push(turn);
        } else {
            stats.questions_unanswered = stats.questions_unanswered.saturating_add(1);
        }

        // Resume at the stopping message, not after it.
        i = j;
    }

    out
}
