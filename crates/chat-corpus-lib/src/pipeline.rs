//! Stage runners: file in, file out, summary back.
//!
//! Each stage fully materializes its output before returning. A missing
//! input surfaces as [`crate::error::CorpusError::InputNotFound`] so the caller can report
//! it and stop without treating it as a crash.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::format::{format_corpus, FormatStats};
use crate::io::{read_export, read_jsonl, read_messages_json, write_jsonl, write_messages_json};
use crate::model::turn::Turn;
use crate::parser::{ChatLogParser, ParseStats};
use crate::sanitize::Sanitizer;
use crate::segment::{segment_turns, SegmentStats};

/// Combined summary of a full a→c run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub parse: ParseStats,
    pub segment: SegmentStats,
    pub format: FormatStats,
}

/// Compiled components for one configuration.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    parser: ChatLogParser,
    sanitizer: Sanitizer,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let parser = ChatLogParser::new(&config.parser)?;
        let sanitizer = Sanitizer::new(&config.sanitizer)?;
        Ok(Self {
            config,
            parser,
            sanitizer,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage a: raw export → messages JSON.
    pub fn parse_stage(&self, input: &Path, output: &Path) -> Result<ParseStats> {
        let text = read_export(input)?;
        let parsed = self.parser.parse(&text);
        write_messages_json(output, &parsed.messages)?;
        info!(
            input = %input.display(),
            output = %output.display(),
            messages = parsed.stats.messages,
            lines = parsed.stats.lines_seen,
            "parse stage complete"
        );
        Ok(parsed.stats)
    }

    /// Stage b: messages JSON → turns JSONL.
    pub fn turns_stage(&self, input: &Path, output: &Path) -> Result<SegmentStats> {
        let messages = read_messages_json(input)?;
        let segmented = segment_turns(&messages, &self.config.classifier, &self.config.window);
        write_jsonl(output, &segmented.turns)?;
        info!(
            input = %input.display(),
            output = %output.display(),
            turns = segmented.stats.turns_emitted,
            questions = segmented.stats.questions_opened,
            "turn stage complete"
        );
        Ok(segmented.stats)
    }

    /// Stage c: turns JSONL → chat-record JSONL.
    pub fn preprocess_stage(&self, input: &Path, output: &Path) -> Result<FormatStats> {
        let turns: Vec<Turn> = read_jsonl(input)?;
        let formatted = format_corpus(&turns, &self.sanitizer);
        write_jsonl(output, &formatted.records)?;
        info!(
            input = %input.display(),
            output = %output.display(),
            records = formatted.stats.records_emitted,
            dropped = formatted
                .stats
                .turns_seen
                .saturating_sub(formatted.stats.records_emitted),
            "preprocess stage complete"
        );
        Ok(formatted.stats)
    }

    /// Stages a→c using the configured paths.
    pub fn run_all(&self) -> Result<RunSummary> {
        let paths = &self.config.paths;
        Ok(RunSummary {
            parse: self.parse_stage(&paths.raw_export, &paths.messages)?,
            segment: self.turns_stage(&paths.messages, &paths.turns)?,
            format: self.preprocess_stage(&paths.turns, &paths.corpus)?,
        })
    }
}
