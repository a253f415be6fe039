//! CLI for the chat-corpus pipeline.
//!
//! Subcommands:
//!  - `parse`      : raw chat export → messages JSON.
//!  - `turns`      : messages JSON → question/answer turns (JSONL).
//!  - `preprocess` : turns → sanitized two-role chat records (JSONL).
//!  - `infer`      : run the configured generator over every chat record.
//!  - `probe`      : run a single prompt through the generator.
//!  - `run`        : `parse`, `turns` and `preprocess` in one go.
//!
//! Paths default to the `[paths]` section of the config file (or the built-in
//! layout under `data/`). A missing stage input is logged and the command
//! exits successfully without running anything further.
//!
//! Usage examples:
//!  cargo run -p chat-corpus -- run
//!  cargo run -p chat-corpus -- -c pipeline.toml turns --window-hours 4
//!  cargo run -p chat-corpus -- infer --limit 20

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{debug, error, warn};

use chat_corpus::infer::{generator_from_config, FALLBACK_PROBE_PROMPT};
use chat_corpus::io::{read_jsonl, JsonlWriter};
use chat_corpus::utils::logging;
use chat_corpus::{
    probe, run_batch, ChatRecord, CorpusError, Pipeline, PipelineConfig, ProgressCallback,
    WindowConfig,
};

/// CLI entrypoint.
#[derive(Parser)]
#[command(
    name = "chat-corpus",
    about = "Turn raw group-chat exports into a question/answer fine-tuning corpus",
    version
)]
struct Cli {
    /// Path to a TOML config file (defaults are used when omitted).
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Subcommands
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a raw chat export into messages JSON.
    Parse(StageArgs),

    /// Segment parsed messages into question/answer turns.
    Turns(TurnsArgs),

    /// Sanitize turns and emit chat records.
    Preprocess(StageArgs),

    /// Run batch inference over the chat records.
    Infer(InferArgs),

    /// Run one prompt through the inference backend.
    Probe(ProbeArgs),

    /// Run parse, turns and preprocess with the configured paths.
    Run(RunArgs),
}

/// Input/output overrides shared by the file-to-file stages.
#[derive(Args, Debug, Default)]
struct StageArgs {
    /// Stage input file (defaults to the configured path).
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Stage output file (defaults to the configured path).
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TurnsArgs {
    #[command(flatten)]
    io: StageArgs,

    /// Answer window in hours (fractional values allowed). Default: 6
    #[arg(long, value_name = "HOURS")]
    window_hours: Option<f64>,
}

#[derive(Args, Debug)]
struct InferArgs {
    #[command(flatten)]
    io: StageArgs,

    /// Only run the first N records (useful for smoke tests).
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args, Debug)]
struct ProbeArgs {
    /// Prompt to send. Without it the first record of `--input` is used.
    #[arg(short, long)]
    prompt: Option<String>,

    /// Chat-record file to take the prompt from (defaults to the corpus path).
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Answer window in hours used by the turn stage.
    #[arg(long, value_name = "HOURS")]
    window_hours: Option<f64>,

    /// Print the per-stage statistics as JSON instead of a one-line summary.
    #[arg(long)]
    json: bool,
}

/// Application entry point.
fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = PipelineConfig::load(cli.config.as_deref()).with_context(|| {
        format!(
            "loading config {}",
            cli.config
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        )
    })?;

    // Log total wall time however the command ends.
    let _timer = scopeguard::guard(Instant::now(), |start| {
        debug!(elapsed = ?start.elapsed(), "command finished");
    });

    match cli.command {
        Commands::Parse(args) => run_parse(config, args),
        Commands::Turns(args) => run_turns(config, args),
        Commands::Preprocess(args) => run_preprocess(config, args),
        Commands::Infer(args) => run_infer(&config, args),
        Commands::Probe(args) => run_probe(&config, args),
        Commands::Run(args) => run_all(config, args),
    }
}

/// Split a stage result into "done", "input missing" and real failures.
///
/// A missing input is reported with `error!` and turned into `Ok(None)` so the
/// command can stop quietly with exit status 0.
fn stage_outcome<T>(result: chat_corpus::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(CorpusError::InputNotFound { path }) => {
            error!(path = %path.display(), "input file not found; stopping");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn resolve(arg: Option<PathBuf>, default: &Path) -> PathBuf {
    arg.unwrap_or_else(|| default.to_path_buf())
}

fn apply_window_override(config: &mut PipelineConfig, hours: Option<f64>) -> Result<()> {
    if let Some(hours) = hours {
        if !hours.is_finite() || hours < 0.0 {
            return Err(anyhow::anyhow!(
                "--window-hours must be a non-negative number, got {}",
                hours
            ));
        }
        config.window = WindowConfig::from_hours(hours);
    }
    Ok(())
}

/// Run the `parse` subcommand.
fn run_parse(config: PipelineConfig, args: StageArgs) -> Result<()> {
    let input = resolve(args.input, &config.paths.raw_export);
    let output = resolve(args.output, &config.paths.messages);
    let pipeline = Pipeline::new(config).context("compiling parser patterns")?;

    let Some(stats) = stage_outcome(pipeline.parse_stage(&input, &output))
        .with_context(|| format!("parsing {}", input.display()))?
    else {
        return Ok(());
    };
    println!(
        "parse: {} messages from {} lines (bot={} media={} system={} orphan={}) -> {}",
        stats.messages,
        stats.lines_seen,
        stats.bot_dropped,
        stats.media_dropped,
        stats.system_notices,
        stats.orphan_lines,
        output.display()
    );
    Ok(())
}

/// Run the `turns` subcommand.
fn run_turns(mut config: PipelineConfig, args: TurnsArgs) -> Result<()> {
    apply_window_override(&mut config, args.window_hours)?;
    let input = resolve(args.io.input, &config.paths.messages);
    let output = resolve(args.io.output, &config.paths.turns);
    let pipeline = Pipeline::new(config).context("building pipeline")?;

    let Some(stats) = stage_outcome(pipeline.turns_stage(&input, &output))
        .with_context(|| format!("segmenting {}", input.display()))?
    else {
        return Ok(());
    };
    println!(
        "turns: {} turns from {} messages (questions={} unanswered={}) -> {}",
        stats.turns_emitted,
        stats.messages_seen,
        stats.questions_opened,
        stats.questions_unanswered,
        output.display()
    );
    Ok(())
}

/// Run the `preprocess` subcommand.
fn run_preprocess(config: PipelineConfig, args: StageArgs) -> Result<()> {
    let input = resolve(args.input, &config.paths.turns);
    let output = resolve(args.output, &config.paths.corpus);
    let pipeline = Pipeline::new(config).context("compiling sanitizer patterns")?;

    let Some(stats) = stage_outcome(pipeline.preprocess_stage(&input, &output))
        .with_context(|| format!("preprocessing {}", input.display()))?
    else {
        return Ok(());
    };
    println!(
        "preprocess: {} records from {} turns (empty user={} empty assistant={}) -> {}",
        stats.records_emitted,
        stats.turns_seen,
        stats.dropped_empty_user,
        stats.dropped_empty_assistant,
        output.display()
    );
    Ok(())
}

/// Run the `run` subcommand: stages a→c with the configured paths.
fn run_all(mut config: PipelineConfig, args: RunArgs) -> Result<()> {
    apply_window_override(&mut config, args.window_hours)?;
    let pipeline = Pipeline::new(config).context("building pipeline")?;

    let Some(summary) = stage_outcome(pipeline.run_all()).context("running pipeline")? else {
        return Ok(());
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    let paths = &pipeline.config().paths;
    println!(
        "run: {} messages -> {} turns -> {} records ({})",
        summary.parse.messages,
        summary.segment.turns_emitted,
        summary.format.records_emitted,
        paths.corpus.display()
    );
    Ok(())
}

/// Build a progress bar and a callback that drives it.
#[cfg(feature = "progress")]
fn progress_bar(total: usize) -> (indicatif::ProgressBar, ProgressCallback) {
    use indicatif::{ProgressBar, ProgressStyle};
    use std::sync::Arc;

    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.set_message("Generating...");

    let cb: ProgressCallback = Arc::new({
        let bar = bar.clone();
        move |msg: String, fraction: f32| {
            bar.set_message(msg);
            bar.set_position((fraction * total as f32).floor() as u64);
        }
    });
    (bar, cb)
}

/// Run the `infer` subcommand.
fn run_infer(config: &PipelineConfig, args: InferArgs) -> Result<()> {
    let input = resolve(args.io.input, &config.paths.corpus);
    let output = resolve(args.io.output, &config.paths.inference_results);

    let Some(records) = stage_outcome(read_jsonl::<ChatRecord>(&input))
        .with_context(|| format!("reading chat records from {}", input.display()))?
    else {
        return Ok(());
    };
    let records = match args.limit {
        Some(n) => &records[..n.min(records.len())],
        None => &records[..],
    };

    let generator = generator_from_config(&config.inference, config.inference.max_new_tokens)
        .context("building inference backend")?;
    let mut writer = JsonlWriter::create(&output)
        .with_context(|| format!("creating {}", output.display()))?;

    #[cfg(feature = "progress")]
    let (bar, progress) = {
        let (bar, cb) = progress_bar(records.len());
        (bar, Some(cb))
    };
    #[cfg(not(feature = "progress"))]
    let progress: Option<ProgressCallback> = None;

    let outcome = run_batch(
        records,
        generator.as_ref(),
        |record| writer.append(&record),
        progress,
    )
    .with_context(|| format!("writing inference results to {}", output.display()))?;

    #[cfg(feature = "progress")]
    bar.finish_with_message(format!("{} generated", outcome.completed));

    println!(
        "infer: {} generated, {} skipped of {} records -> {}",
        outcome.completed,
        outcome.skipped,
        records.len(),
        output.display()
    );
    if let Some(failure) = outcome.failure {
        println!(
            "infer: stopped at record {} ({})",
            failure.index, failure.error
        );
    }
    Ok(())
}

/// Pick the probe prompt: explicit flag, else the first corpus record, else a
/// fixed sentence.
fn probe_prompt(config: &PipelineConfig, args: &ProbeArgs) -> Result<String> {
    if let Some(prompt) = &args.prompt {
        return Ok(prompt.clone());
    }
    let input = args
        .input
        .clone()
        .unwrap_or_else(|| config.paths.corpus.clone());
    match read_jsonl::<ChatRecord>(&input) {
        Ok(records) => {
            match records
                .first()
                .and_then(|r| r.user_content())
                .filter(|p| !p.is_empty())
            {
                Some(prompt) => Ok(prompt.to_string()),
                None => {
                    warn!(path = %input.display(), "no usable record; using fallback prompt");
                    Ok(FALLBACK_PROBE_PROMPT.to_string())
                }
            }
        }
        Err(err) if err.is_input_not_found() => {
            warn!(path = %input.display(), "corpus not found; using fallback prompt");
            Ok(FALLBACK_PROBE_PROMPT.to_string())
        }
        Err(err) => Err(err).with_context(|| format!("reading {}", input.display())),
    }
}

/// Run the `probe` subcommand.
fn run_probe(config: &PipelineConfig, args: ProbeArgs) -> Result<()> {
    let prompt = probe_prompt(config, &args)?;
    let generator =
        generator_from_config(&config.inference, config.inference.probe_max_new_tokens)
            .context("building inference backend")?;

    match probe(&prompt, generator.as_ref()) {
        Ok(record) => {
            println!("Input: {}", record.input);
            println!("Output: {}", record.modeling_output);
        }
        Err(err) => {
            error!(backend = generator.name(), error = %err, "probe failed");
            println!("probe: failed ({})", err);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "chat-corpus",
            "turns",
            "--window-hours",
            "1.5",
            "-vv",
            "-c",
            "p.toml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("p.toml")));
        match cli.command {
            Commands::Turns(args) => assert_eq!(args.window_hours, Some(1.5)),
            _ => panic!("expected turns"),
        }
    }

    #[test]
    fn window_override_rejects_negative_hours() {
        let mut cfg = PipelineConfig::default();
        assert!(apply_window_override(&mut cfg, Some(-1.0)).is_err());
        apply_window_override(&mut cfg, Some(2.0)).unwrap();
        assert_eq!(cfg.window.max_window_seconds, 7200);
    }

    #[test]
    fn missing_input_is_not_a_failure() {
        let res: chat_corpus::Result<()> = Err(CorpusError::InputNotFound {
            path: PathBuf::from("nope.txt"),
        });
        assert!(stage_outcome(res).unwrap().is_none());
    }

    #[test]
    fn probe_prompt_falls_back_without_corpus() {
        let args = ProbeArgs {
            prompt: None,
            input: Some(PathBuf::from("/definitely/missing.jsonl")),
        };
        let prompt = probe_prompt(&PipelineConfig::default(), &args).unwrap();
        assert_eq!(prompt, FALLBACK_PROBE_PROMPT);
    }
}
