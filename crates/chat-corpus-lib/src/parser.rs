//! Raw chat-export parsing.
//!
//! Turns the line-oriented export into ordered [`Message`] records. Lines are
//! classified in a fixed order: date separator, system notice, message header,
//! continuation. Anything else is dropped silently.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CorpusError, Result};
use crate::model::message::Message;

/// Patterns and filter tables for the parser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Date separator; captures year, month, day. Searched anywhere in the line.
    pub date_pattern: String,
    /// Message header; captures speaker, meridiem, hour, minute, content.
    /// Matched at the start of the line.
    pub header_pattern: String,
    /// Meridiem marker for afternoon hours.
    pub pm_marker: String,
    /// Meridiem marker for morning hours.
    pub am_marker: String,
    /// Speaker name of the bot account whose messages are discarded.
    pub bot_speaker: String,
    /// Content tokens that stand in for a media attachment.
    pub media_placeholders: Vec<String>,
    /// Phrases that mark a join/leave system notice.
    pub system_phrases: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            date_pattern: r"-+\s*(\d{4})년\s*(\d{1,2})월\s*(\d{1,2})일".to_string(),
            header_pattern: r"^\[(.+?)\]\s*\[(오전|오후)\s*(\d{1,2}):(\d{2})\]\s*(.*)".to_string(),
            pm_marker: "오후".to_string(),
            am_marker: "오전".to_string(),
            bot_speaker: "오픈채팅봇".to_string(),
            media_placeholders: vec!["동영상".into(), "사진".into(), "이미지".into()],
            system_phrases: vec!["님이 들어왔습니다".into(), "님이 나갔습니다".into()],
        }
    }
}

/// Counters describing what the parser did with each line.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub lines_seen: usize,
    pub date_separators: usize,
    pub system_notices: usize,
    pub messages: usize,
    pub bot_dropped: usize,
    pub media_dropped: usize,
    pub continuation_lines: usize,
    pub orphan_lines: usize,
}

#[derive(Debug, Default)]
pub struct ParseOutput {
    pub messages: Vec<Message>,
    pub stats: ParseStats,
}

/// Compiled parser. Build once per config, reuse for any number of exports.
#[derive(Debug)]
pub struct ChatLogParser {
    date_re: Regex,
    header_re: Regex,
    config: ParserConfig,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| CorpusError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl ChatLogParser {
    pub fn new(config: &ParserConfig) -> Result<Self> {
        Ok(Self {
            date_re: compile(&config.date_pattern)?,
            header_re: compile(&config.header_pattern)?,
            config: config.clone(),
        })
    }

    fn is_system_line(&self, line: &str) -> bool {
        self.config
            .system_phrases
            .iter()
            .any(|p| line.contains(p.as_str()))
    }

    fn date_of(&self, line: &str) -> Option<String> {
        let caps = self.date_re.captures(line)?;
        let year = caps.get(1)?.as_str();
        let month: u32 = caps.get(2)?.as_str().parse().ok()?;
        let day: u32 = caps.get(3)?.as_str().parse().ok()?;
        Some(format!("{}-{:02}-{:02}", year, month, day))
    }

    /// Convert a 12-hour clock reading with meridiem marker to `HH:MM`.
    fn to_24h(&self, meridiem: &str, hour: u32, minute: &str) -> String {
        let mut hour = hour;
        if meridiem == self.config.pm_marker && hour != 12 {
            hour += 12;
        }
        if meridiem == self.config.am_marker && hour == 12 {
            hour = 0;
        }
        format!("{:02}:{}", hour, minute)
    }

    /// Parse a whole export into messages in document order.
    pub fn parse(&self, text: &str) -> ParseOutput {
        let mut out = ParseOutput::default();
        let stats = &mut out.stats;
        let mut current_date: Option<String> = None;
        // Index into `out.messages` of the message continuation lines attach to.
        let mut last: Option<usize> = None;

        for raw_line in text.lines() {
            stats.lines_seen = stats.lines_seen.saturating_add(1);
            let line = raw_line.trim_end();

            if let Some(date) = self.date_of(line) {
                stats.date_separators = stats.date_separators.saturating_add(1);
                current_date = Some(date);
                last = None;
                continue;
            }

            if self.is_system_line(line) {
                stats.system_notices = stats.system_notices.saturating_add(1);
                last = None;
                continue;
            }

            if let Some(caps) = self.header_re.captures(line) {
                let field = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");
                let speaker = field(1);
                let content = field(5);

                if speaker == self.config.bot_speaker {
                    stats.bot_dropped = stats.bot_dropped.saturating_add(1);
                    last = None;
                    continue;
                }
                if self
                    .config
                    .media_placeholders
                    .iter()
                    .any(|m| m.as_str() == content.trim())
                {
                    stats.media_dropped = stats.media_dropped.saturating_add(1);
                    last = None;
                    continue;
                }

                let hour: u32 = match field(3).parse() {
                    Ok(h) => h,
                    Err(_) => {
                        stats.orphan_lines = stats.orphan_lines.saturating_add(1);
                        last = None;
                        continue;
                    }
                };
                let time = self.to_24h(field(2), hour, field(4));

                out.messages
                    .push(Message::new(current_date.clone(), speaker, time, content));
                stats.messages = stats.messages.saturating_add(1);
                last = Some(out.messages.len() - 1);
                continue;
            }

            if line.trim().is_empty() {
                continue;
            }

            match last.and_then(|idx| out.messages.get_mut(idx)) {
                Some(msg) => {
                    msg.content.push('\n');
                    msg.content.push_str(line);
                    stats.continuation_lines = stats.continuation_lines.saturating_add(1);
                }
                None => {
                    debug!(line = %line, "dropping line outside any message");
                    stats.orphan_lines = stats.orphan_lines.saturating_add(1);
                }
            }
        }

        out
    }
}
