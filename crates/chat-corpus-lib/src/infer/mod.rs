/*
Inference collaborator for the finished corpus.

- `Generator` is the only seam: one prompt in, one generated string out.
- `HttpGenerator` talks to an OpenAI-compatible chat-completion endpoint
  (llama.cpp server, vLLM, TGI and friends all expose one).
- `CommandGenerator` pipes the prompt into a local program and reads stdout.

Batch inference is strictly sequential. The first failing call is logged
and ends the batch; everything produced before it is kept.
*/

mod command;
mod http;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::model::chat_record::{ChatRecord, InferenceRecord};

pub use command::CommandGenerator;
pub use http::HttpGenerator;

/// Progress callback type for long-running operations.
/// The callback receives a message describing the current step and a progress fraction (0.0..1.0).
pub type ProgressCallback = Arc<dyn Fn(String, f32) + Send + Sync>;

/// Prompt used by the probe when no corpus file is available.
pub const FALLBACK_PROBE_PROMPT: &str = "Hello, this is a basic sentence for model testing.";

/// Errors raised by a [`Generator`].
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with code {code}: {stderr}")]
    ExitCode {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// A text-generation model reachable with one blocking call per prompt.
pub trait Generator {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Generate a reply to a single user message.
    fn generate(&self, prompt: &str) -> std::result::Result<String, GenerateError>;
}

/// Which [`Generator`] implementation to build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Http,
    Command,
}

/// Inference settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub backend: Backend,
    /// Chat-completion URL for the HTTP backend.
    pub endpoint: String,
    /// Model identifier sent with every HTTP request.
    pub model: String,
    /// Environment variable holding a bearer token, if the endpoint needs one.
    pub api_key_env: Option<String>,
    /// Generation cap for batch inference.
    pub max_new_tokens: u32,
    /// Generation cap for the single-sample probe.
    pub probe_max_new_tokens: u32,
    /// HTTP request timeout.
    pub timeout_secs: u64,
    /// Program for the command backend.
    pub command: String,
    pub args: Vec<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Http,
            endpoint: "http://127.0.0.1:8080/v1/chat/completions".to_string(),
            model: "meta-llama/Llama-3.1-8B-Instruct".to_string(),
            api_key_env: Some("HF_TOKEN".to_string()),
            max_new_tokens: 512,
            probe_max_new_tokens: 256,
            timeout_secs: 300,
            command: String::new(),
            args: Vec::new(),
        }
    }
}

/// Build the configured generator with the given generation cap.
pub fn generator_from_config(
    config: &InferenceConfig,
    max_new_tokens: u32,
) -> std::result::Result<Box<dyn Generator>, GenerateError> {
    match config.backend {
        Backend::Http => Ok(Box::new(HttpGenerator::new(config, max_new_tokens)?)),
        Backend::Command => Ok(Box::new(CommandGenerator::new(
            config.command.clone(),
            config.args.clone(),
        ))),
    }
}

/// Run a single prompt through the generator, logging the exchange.
pub fn probe(
    prompt: &str,
    generator: &dyn Generator,
) -> std::result::Result<InferenceRecord, GenerateError> {
    info!(backend = generator.name(), chars = prompt.chars().count(), "probe started");
    let answer = generator.generate(prompt)?;
    debug!(answer = %answer, "probe answer");
    Ok(InferenceRecord {
        input: prompt.to_string(),
        modeling_output: answer,
    })
}

/// Where a batch stopped early.
#[derive(Debug)]
pub struct BatchFailure {
    /// Index of the record whose generation failed.
    pub index: usize,
    pub error: GenerateError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub completed: usize,
    /// Records without a user entry.
    pub skipped: usize,
    pub failure: Option<BatchFailure>,
}

/// Run the generator over every record in order, handing each result to `sink`.
///
/// A generation failure is logged and ends the batch (returned in
/// [`BatchOutcome::failure`]); a `sink` error is propagated.
pub fn run_batch<S>(
    records: &[ChatRecord],
    generator: &dyn Generator,
    mut sink: S,
    progress: Option<ProgressCallback>,
) -> Result<BatchOutcome>
where
    S: FnMut(InferenceRecord) -> Result<()>,
{
    let mut outcome = BatchOutcome::default();
    let total = records.len().max(1) as f32;
    info!(backend = generator.name(), records = records.len(), "inference batch started");

    for (index, record) in records.iter().enumerate() {
        let Some(prompt) = record.user_content() else {
            warn!(index, "record has no user entry; skipping");
            outcome.skipped += 1;
            continue;
        };

        match generator.generate(prompt) {
            Ok(answer) => {
                sink(InferenceRecord {
                    input: prompt.to_string(),
                    modeling_output: answer,
                })?;
                outcome.completed += 1;
            }
            Err(err) => {
                error!(index, error = %err, "generation failed; stopping batch");
                outcome.failure = Some(BatchFailure { index, error: err });
                break;
            }
        }

        if let Some(cb) = progress.as_ref() {
            cb(
                format!("{}/{}", index + 1, records.len()),
                (index + 1) as f32 / total,
            );
        }
    }

    info!(
        completed = outcome.completed,
        skipped = outcome.skipped,
        failed = outcome.failure.is_some(),
        "inference batch finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Mutex;

    /// Echoes the prompt, failing on the call numbered `fail_at`.
    struct StubGenerator {
        calls: Cell<usize>,
        fail_at: Option<usize>,
    }

    impl StubGenerator {
        fn new(fail_at: Option<usize>) -> Self {
            Self {
                calls: Cell::new(0),
                fail_at,
            }
        }
    }

    impl Generator for StubGenerator {
        fn name(&self) -> &str {
            "stub"
        }

        fn generate(&self, prompt: &str) -> std::result::Result<String, GenerateError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if Some(call) == self.fail_at {
                return Err(GenerateError::MalformedResponse("boom".into()));
            }
            Ok(format!("re: {}", prompt))
        }
    }

    fn records(n: usize) -> Vec<ChatRecord> {
        (0..n)
            .map(|i| ChatRecord::new(format!("q{}", i), format!("a{}", i)))
            .collect()
    }

    #[test]
    fn batch_collects_every_result_in_order() {
        let mut out = Vec::new();
        let outcome = run_batch(
            &records(3),
            &StubGenerator::new(None),
            |r| {
                out.push(r);
                Ok(())
            },
            None,
        )
        .unwrap();
        assert_eq!(outcome.completed, 3);
        assert!(outcome.failure.is_none());
        assert_eq!(out[2].input, "q2");
        assert_eq!(out[2].modeling_output, "re: q2");
    }

    #[test]
    fn failure_stops_batch_and_keeps_earlier_results() {
        let mut out = Vec::new();
        let outcome = run_batch(
            &records(4),
            &StubGenerator::new(Some(1)),
            |r| {
                out.push(r);
                Ok(())
            },
            None,
        )
        .unwrap();
        assert_eq!(outcome.completed, 1);
        assert_eq!(out.len(), 1);
        let failure = outcome.failure.unwrap();
        assert_eq!(failure.index, 1);
        assert!(matches!(failure.error, GenerateError::MalformedResponse(_)));
    }

    #[test]
    fn progress_reaches_completion() {
        let seen: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
        let cb: ProgressCallback = Arc::new({
            let seen = Arc::clone(&seen);
            move |_msg: String, fraction: f32| seen.lock().unwrap().push(fraction)
        });
        run_batch(&records(2), &StubGenerator::new(None), |_| Ok(()), Some(cb)).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!((seen[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn record_without_user_entry_is_skipped() {
        let empty = ChatRecord { messages: Vec::new() };
        let outcome = run_batch(&[empty], &StubGenerator::new(None), |_| Ok(()), None).unwrap();
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.completed, 0);
    }

    #[test]
    fn probe_wraps_single_answer() {
        let rec = probe(FALLBACK_PROBE_PROMPT, &StubGenerator::new(None)).unwrap();
        assert_eq!(rec.input, FALLBACK_PROBE_PROMPT);
        assert_eq!(rec.modeling_output, format!("re: {}", FALLBACK_PROBE_PROMPT));
    }

    #[test]
    fn probe_surfaces_generator_error() {
        assert!(probe("x", &StubGenerator::new(Some(0))).is_err());
    }

    #[test]
    fn inference_config_parses_backend_names() {
        let cfg: InferenceConfig = toml::from_str("backend = \"command\"\ncommand = \"ollama\"").unwrap();
        assert_eq!(cfg.backend, Backend::Command);
        assert_eq!(cfg.command, "ollama");
        assert_eq!(cfg.max_new_tokens, 512);
    }
}
