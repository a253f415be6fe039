//! Error types shared by the pipeline stages.

use std::path::PathBuf;

/// Errors that can occur while reading, writing or configuring a pipeline stage.
///
/// Bad data inside a file (unmatched lines, unparseable timestamps) is never an
/// error; it is dropped or skipped by the stage itself.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path} (line {line}): {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode JSON: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl CorpusError {
    /// True when the error is a missing stage input, which callers report and
    /// then stop the stage without failing.
    pub fn is_input_not_found(&self) -> bool {
        matches!(self, Self::InputNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, CorpusError>;
