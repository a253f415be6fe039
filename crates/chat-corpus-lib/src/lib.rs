//! Library entry point for the chat-log corpus pipeline.
//!
//! Turns a raw group-chat export into a supervised chat corpus:
//!
//! - `parser` reads the export line by line into [`Message`]s,
//! - `segment` pairs question messages with the answers that follow them,
//! - `sanitize` and `format` scrub PII and noise and emit [`ChatRecord`]s,
//! - `infer` runs a text-generation backend over the finished corpus.
//!
//! Every stage is a plain function over in-memory data; `pipeline` wires them
//! to the JSON/JSONL files that sit between stages.
//
// Public modules
pub mod classify;
pub mod config;
pub mod error;
pub mod format;
pub mod infer;
pub mod io;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod sanitize;
pub mod segment;
pub mod temporal;
pub mod utils;

// Re-export primary types for ergonomic use.
pub use classify::QuestionRules;
pub use config::{PathsConfig, PipelineConfig};
pub use error::{CorpusError, Result};
pub use format::{format_corpus, format_turn, try_format_turn, DropReason};
pub use infer::{probe, run_batch, Generator, ProgressCallback};
pub use model::{
    chat_record::{ChatMessage, ChatRecord, InferenceRecord, Role},
    message::Message,
    turn::Turn,
};
pub use parser::{ChatLogParser, ParserConfig};
pub use pipeline::{Pipeline, RunSummary};
pub use sanitize::{Sanitizer, SanitizerConfig};
pub use segment::segment_turns;
pub use temporal::WindowConfig;
