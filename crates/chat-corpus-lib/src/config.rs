//! Pipeline configuration.
//!
//! Every component takes its own section by reference; nothing is read from
//! process-wide state. A TOML file may override any subset of fields, the
//! rest fall back to the defaults below.
//!
//! ```toml
//! [paths]
//! raw_export = "data/raw/KakaoTalk_group.txt"
//!
//! [window]
//! max_window_seconds = 14400
//!
//! [inference]
//! backend = "command"
//! command = "ollama"
//! args = ["run", "llama3.1"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::QuestionRules;
use crate::error::{CorpusError, Result};
use crate::infer::InferenceConfig;
use crate::parser::ParserConfig;
use crate::sanitize::SanitizerConfig;
use crate::temporal::WindowConfig;

/// File locations for each stage boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub raw_export: PathBuf,
    pub messages: PathBuf,
    pub turns: PathBuf,
    pub corpus: PathBuf,
    pub inference_results: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_export: PathBuf::from("data/raw/chat_export.txt"),
            messages: PathBuf::from("data/processed/messages_raw.json"),
            turns: PathBuf::from("data/processed/chat_turns.jsonl"),
            corpus: PathBuf::from("data/processed/processed_data.jsonl"),
            inference_results: PathBuf::from("data/processed/modeling_results.jsonl"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub parser: ParserConfig,
    pub classifier: QuestionRules,
    pub window: WindowConfig,
    pub sanitizer: SanitizerConfig,
    pub inference: InferenceConfig,
}

impl PipelineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|source| CorpusError::Config {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load from `path`, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Err(CorpusError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| CorpusError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::Backend;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = PipelineConfig::from_toml_str("", Path::new("x.toml")).unwrap();
        assert_eq!(cfg, PipelineConfig::default());
    }

    #[test]
    fn partial_sections_override_only_named_fields() {
        let cfg = PipelineConfig::from_toml_str(
            r#"
            [paths]
            raw_export = "in.txt"

            [window]
            max_window_seconds = 3600

            [classifier]
            endings = ["까"]

            [inference]
            backend = "command"
            command = "ollama"
            args = ["run", "llama3.1"]
            "#,
            Path::new("x.toml"),
        )
        .unwrap();
        assert_eq!(cfg.paths.raw_export, PathBuf::from("in.txt"));
        assert_eq!(cfg.paths.turns, PathsConfig::default().turns);
        assert_eq!(cfg.window.max_window_seconds, 3600);
        assert_eq!(cfg.classifier.endings, vec!["까".to_string()]);
        assert_eq!(cfg.classifier.min_answer_chars, 5);
        assert_eq!(cfg.inference.backend, Backend::Command);
        assert_eq!(cfg.inference.args, vec!["run", "llama3.1"]);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = PipelineConfig::from_toml_str("[window\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, CorpusError::Config { .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = PipelineConfig::load(Some(Path::new("/definitely/missing.toml"))).unwrap_err();
        assert!(err.is_input_not_found());
    }

    #[test]
    fn no_path_means_defaults() {
        assert_eq!(PipelineConfig::load(None).unwrap(), PipelineConfig::default());
    }
}
