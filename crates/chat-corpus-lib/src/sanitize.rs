//! Per-message cleaning and anonymization.
//!
//! Steps, in order:
//! 1. drop the message if it mentions both a currency and an exchange keyword
//! 2. drop the message if it contains a URL
//! 3. mask phone numbers as `[PHONE]`
//! 4. mask e-mail addresses as `[EMAIL]`
//! 5. delete standalone Hangul consonant/vowel fragments (ㅋㅋ, ㅠㅠ, ...)
//! 6. delete every character that is not a letter, digit, `_`, whitespace or
//!    `,.!?` (combining marks, variation selectors and joiners go too)
//!    (the placeholders from steps 3–4 are kept intact)
//! 7. trim
//!
//! Deleting characters can join fragments into a new match (`010ㅋ1234ㅋ5678`),
//! so the steps are repeated until the text stops changing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CorpusError, Result};

pub const PHONE_PLACEHOLDER: &str = "[PHONE]";
pub const EMAIL_PLACEHOLDER: &str = "[EMAIL]";

const URL_PATTERN: &str = r"https?://";
const PHONE_PATTERN: &str = r"\d{2,3}[-\s]?\d{3,4}[-\s]?\d{4}";
const EMAIL_PATTERN: &str = r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";
const JAMO_PATTERN: &str = r"[ㄱ-ㅎㅏ-ㅣ]+";
// Not `\w`: the regex crate's `\w` also admits marks and joiners (U+FE0F, U+200D).
const DISALLOWED_PATTERN: &str = r"[^\p{L}\p{N}_\s,.!?]";

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(?:PHONE|EMAIL)\]").expect("placeholder pattern is valid"));

/// Keyword tables for the spam filter in step 1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    pub currency_keywords: Vec<String>,
    pub exchange_keywords: Vec<String>,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            currency_keywords: vec!["유로".to_string()],
            exchange_keywords: vec!["환전".to_string()],
        }
    }
}

#[derive(Debug)]
pub struct Sanitizer {
    config: SanitizerConfig,
    url_re: Regex,
    phone_re: Regex,
    email_re: Regex,
    jamo_re: Regex,
    disallowed_re: Regex,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| CorpusError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl Sanitizer {
    pub fn new(config: &SanitizerConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            url_re: compile(URL_PATTERN)?,
            phone_re: compile(PHONE_PATTERN)?,
            email_re: compile(EMAIL_PATTERN)?,
            jamo_re: compile(JAMO_PATTERN)?,
            disallowed_re: compile(DISALLOWED_PATTERN)?,
        })
    }

    fn is_exchange_spam(&self, text: &str) -> bool {
        let has = |words: &[String]| words.iter().any(|w| text.contains(w.as_str()));
        has(&self.config.currency_keywords) && has(&self.config.exchange_keywords)
    }

    /// Remove disallowed characters everywhere except inside placeholders.
    fn strip_disallowed(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for m in PLACEHOLDER_RE.find_iter(text) {
            out.push_str(&self.disallowed_re.replace_all(&text[cursor..m.start()], ""));
            out.push_str(m.as_str());
            cursor = m.end();
        }
        out.push_str(&self.disallowed_re.replace_all(&text[cursor..], ""));
        out
    }

    fn sanitize_once(&self, text: &str) -> String {
        if self.is_exchange_spam(text) || self.url_re.is_match(text) {
            return String::new();
        }

        let text = self.phone_re.replace_all(text, PHONE_PLACEHOLDER);
        let text = self.email_re.replace_all(&text, EMAIL_PLACEHOLDER);
        let text = self.jamo_re.replace_all(&text, "");
        let text = self.strip_disallowed(&text);
        text.trim().to_string()
    }

    /// Clean one message. An empty result means the message is suppressed.
    pub fn sanitize(&self, text: &str) -> String {
        let mut current = self.sanitize_once(text);
        loop {
            let next = self.sanitize_once(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }
}
