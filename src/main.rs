//! Main entry point for the Video Analyzer CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use video_analyzer::cli::commands::{self, Commands};

/// Video Analyzer - ask Gemini about a video file
#[derive(Parser, Debug)]
#[command(name = "video-analyzer", version, about, long_about = None)]
struct Args {
    /// API key for Gemini (optional, defaults to GOOGLE_API_KEY env var)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// `--verbose` always means debug; otherwise `RUST_LOG`, else info
fn log_filter(verbose: bool, rust_log: Option<String>) -> EnvFilter {
    if verbose {
        return EnvFilter::new("video_analyzer=debug");
    }
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("video_analyzer=info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(log_filter(args.verbose, std::env::var("RUST_LOG").ok()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Override config with CLI args if provided
    if let Some(api_key) = args.api_key {
        std::env::set_var("GOOGLE_API_KEY", api_key);
    }

    // Execute command
    match args.command {
        Some(command) => {
            let (kind, video_path, question, common) = command.into_parts();
            commands::handle_task(kind, video_path, question, common).await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_verbose_overrides_rust_log() {
        let filter = log_filter(true, Some("warn".to_string()));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_rust_log_used_without_verbose() {
        let filter = log_filter(false, Some("warn".to_string()));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));

        let filter = log_filter(false, None);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_verbose_flag_parses_after_subcommand() {
        let args = Args::try_parse_from(["video-analyzer", "summarize", "clip.mp4", "-v"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Some(Commands::Summarize { .. })));
    }
}
