/*
chat-corpus/crates/chat-corpus-lib/src/temporal.rs

Time handling for turn segmentation: timestamp derivation from the
parser's `date`/`time` strings and the answer-window configuration.

Design notes:
- Timestamps are naive local date-times; the export carries no zone and
  every message in a log shares one.
- A timestamp that fails to parse is `None`, never an error. The
  segmenter decides what a missing timestamp means.
- The default window is six hours, matching the corpus built so far.
*/

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Default answer window: six hours.
pub const DEFAULT_MAX_WINDOW_SECONDS: u64 = 6 * 60 * 60;

/// Format of the combined `date time` string.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Combine a `YYYY-MM-DD` date and an `HH:MM` time into one instant.
///
/// Both parts are trimmed first. Returns `None` on any parse failure.
pub fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let joined = format!("{} {}", date.trim(), time.trim());
    NaiveDateTime::parse_from_str(&joined, TIMESTAMP_FORMAT).ok()
}

/// Configuration of the answer window used by the segmenter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Maximum elapsed seconds after a question during which later messages
    /// may still be collected as answers. Default: DEFAULT_MAX_WINDOW_SECONDS.
    pub max_window_seconds: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            max_window_seconds: DEFAULT_MAX_WINDOW_SECONDS,
        }
    }
}

impl WindowConfig {
    /// Build a window from a number of hours (fractional hours are allowed).
    pub fn from_hours(hours: f64) -> Self {
        let seconds = (hours.max(0.0) * 3600.0).round() as u64;
        WindowConfig {
            max_window_seconds: seconds,
        }
    }

    pub fn max_window(&self) -> Duration {
        // chrono durations top out at i64::MAX milliseconds.
        let secs = i64::try_from(self.max_window_seconds)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1000);
        Duration::seconds(secs)
    }

    /// True when `candidate` lies strictly more than the window after `question`.
    ///
    /// A candidate earlier than the question (clock went backwards in the
    /// export) never exceeds the window.
    pub fn exceeded(&self, question: NaiveDateTime, candidate: NaiveDateTime) -> bool {
        candidate - question > self.max_window()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(date: &str, time: &str) -> NaiveDateTime {
        parse_timestamp(date, time).unwrap()
    }

    #[test]
    fn parses_padded_date_and_time() {
        let t = ts(" 2025-03-09 ", "07:45 ");
        assert_eq!(t.to_string(), "2025-03-09 07:45:00");
    }

    #[test]
    fn rejects_malformed_parts() {
        assert!(parse_timestamp("2025-13-01", "10:00").is_none());
        assert!(parse_timestamp("2025-01-01", "25:00").is_none());
        assert!(parse_timestamp("", "10:00").is_none());
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let cfg = WindowConfig::default();
        let q = ts("2025-01-01", "10:00");
        assert!(!cfg.exceeded(q, ts("2025-01-01", "16:00")));
        assert!(cfg.exceeded(q, ts("2025-01-01", "16:01")));
    }

    #[test]
    fn earlier_candidate_never_exceeds() {
        let cfg = WindowConfig::from_hours(1.0);
        let q = ts("2025-01-02", "10:00");
        assert!(!cfg.exceeded(q, ts("2025-01-01", "10:00")));
    }

    #[test]
    fn window_spans_midnight() {
        let cfg = WindowConfig::default();
        let q = ts("2025-01-01", "22:00");
        assert!(!cfg.exceeded(q, ts("2025-01-02", "03:59")));
        assert!(cfg.exceeded(q, ts("2025-01-02", "04:01")));
    }

    #[test]
    fn from_hours_rounds_to_seconds() {
        assert_eq!(WindowConfig::from_hours(1.5).max_window_seconds, 5400);
        assert_eq!(WindowConfig::from_hours(-2.0).max_window_seconds, 0);
    }

    #[test]
    fn huge_window_never_exceeds() {
        let cfg = WindowConfig {
            max_window_seconds: u64::MAX,
        };
        let q = ts("2000-01-01", "00:00");
        assert!(!cfg.exceeded(q, ts("2999-12-31", "23:59")));
    }
}
