//! CLI command definitions and handlers

use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::cli::settings::{load_settings, resolve_arg, resolve_output_path};
use crate::core::agent::{AnalysisOutcome, VideoAgent};
use crate::core::config::{AgentConfig, DEFAULT_MODEL};
use crate::core::poller::PollProgress;
use crate::core::prompts::{Task, TaskKind};

/// Options shared by every analysis command
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Gemini model ID (default: gemini-3-flash)
    #[arg(long)]
    pub model: Option<String>,

    /// Save output to a file or directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to settings file
    #[arg(short, long = "config", default_value = "config.yaml")]
    pub config: PathBuf,
}

/// Commands for the video analyzer
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a summary of the video
    Summarize {
        /// Path to the video file
        video_path: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Ask a question about the video
    Ask {
        /// Path to the video file
        video_path: Option<PathBuf>,

        /// Question about the video
        question: Option<String>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Detect events in the video
    Events {
        /// Path to the video file
        video_path: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Transcribe and diarize the video audio
    Transcribe {
        /// Path to the video file
        video_path: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

impl Commands {
    /// Split into task kind, positional inputs and shared options
    pub fn into_parts(self) -> (TaskKind, Option<PathBuf>, Option<String>, CommonArgs) {
        match self {
            Commands::Summarize { video_path, common } => (TaskKind::Summarize, video_path, None, common),
            Commands::Ask {
                video_path,
                question,
                common,
            } => (TaskKind::Ask, video_path, question, common),
            Commands::Events { video_path, common } => (TaskKind::DetectEvents, video_path, None, common),
            Commands::Transcribe { video_path, common } => {
                (TaskKind::TranscribeDiarize, video_path, None, common)
            }
        }
    }
}

/// Fully resolved inputs for one run
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Task with its question, if any
    pub task: Task,
    /// Local video to upload
    pub video_path: PathBuf,
    /// Model name before alias resolution
    pub model: String,
    /// Where to save the result text
    pub output: Option<PathBuf>,
}

/// Merge CLI values with the settings file and defaults
pub fn resolve_invocation(
    kind: TaskKind,
    video_path: Option<PathBuf>,
    question: Option<String>,
    common: &CommonArgs,
) -> anyhow::Result<Invocation> {
    let settings = load_settings(&common.config);

    let video_path = resolve_arg(video_path, settings.video_path, None)
        .ok_or_else(|| anyhow::anyhow!("Missing argument 'video_path'."))?;

    let question = resolve_arg(question, settings.question, None);
    if kind == TaskKind::Ask && question.as_deref().map_or(true, |q| q.trim().is_empty()) {
        anyhow::bail!("Missing argument 'question'.");
    }
    let task = Task::new(kind, question.as_deref())?;

    let model = resolve_arg(
        common.model.clone(),
        settings.model,
        Some(DEFAULT_MODEL.to_string()),
    )
    .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let output = resolve_arg(common.output.clone(), settings.output, None);
    let output = resolve_output_path(output.as_deref(), &video_path);

    Ok(Invocation {
        task,
        video_path,
        model,
        output,
    })
}

/// Handle one analysis command end to end
pub async fn handle_task(
    kind: TaskKind,
    video_path: Option<PathBuf>,
    question: Option<String>,
    common: CommonArgs,
) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use tracing::{error, info};

    let invocation = resolve_invocation(kind, video_path, question, &common)?;

    info!("Starting task: {}", kind);
    info!("Input: {}", invocation.video_path.display());
    info!("Model: {}", invocation.model);
    if let Some(output) = &invocation.output {
        info!("Output: {}", output.display());
    }

    let config = AgentConfig::from_env()?.with_model(&invocation.model);
    let agent = VideoAgent::from_config(&config)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("Uploading video...");

    let observer = |p: &PollProgress| {
        pb.set_message(format!(
            "Gemini is processing video... (poll {}, {:.0}s)",
            p.attempt,
            p.elapsed.as_secs_f64()
        ));
    };

    let start_time = Instant::now();
    let result = agent
        .run_task(&invocation.video_path, &invocation.task, Some(&observer))
        .await;
    pb.finish_and_clear();

    match result {
        Ok(outcome) => {
            display_outcome(&outcome, invocation.output.as_deref());
            Ok(())
        }
        Err(e) => {
            let elapsed = start_time.elapsed();
            error!("Error during {} ({}): {}", kind, e.kind(), e);
            Err(anyhow::Error::new(e).context(format!(
                "{} failed after {:.2}s",
                kind,
                elapsed.as_secs_f64()
            )))
        }
    }
}

/// Print the result, optionally save it, then print the usage table
pub fn display_outcome(outcome: &AnalysisOutcome, output: Option<&Path>) {
    let title = outcome.task.title();
    println!("\n{}", title);
    println!("{}", "─".repeat(title.chars().count().max(40)));
    println!("{}", outcome.text);

    if let Some(path) = output {
        match save_output(path, &outcome.text) {
            Ok(()) => println!("\n✅ Output saved to: {}", path.display()),
            Err(e) => eprintln!("\n❌ Failed to save output: {}", e),
        }
    }

    println!("\n📊 Token Usage & Cost ({})", outcome.model_id);
    for (metric, value) in usage_rows(outcome) {
        println!("   {:<15} {:>14}", metric, value);
    }
}

/// Write text to `path`, creating parent directories
pub fn save_output(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, text)
}

/// Rows of the usage table, already formatted
pub fn usage_rows(outcome: &AnalysisOutcome) -> Vec<(&'static str, String)> {
    let usage = &outcome.usage;
    vec![
        ("Input Tokens", with_thousands(usage.prompt_tokens)),
        ("Output Tokens", with_thousands(usage.completion_tokens)),
        ("Total Tokens", with_thousands(usage.total_tokens)),
        ("Estimated Cost", format!("${:.4}", usage.estimated_cost)),
        ("Execution Time", format!("{:.2}s", outcome.elapsed.as_secs_f64())),
    ]
}

fn with_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
