//! Optional YAML settings file and argument resolution

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Values a `config.yaml` may provide for any subcommand
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Default video when none is given on the command line
    pub video_path: Option<PathBuf>,
    /// Default model
    pub model: Option<String>,
    /// Output file or directory
    pub output: Option<PathBuf>,
    /// Default question for `ask`
    pub question: Option<String>,
}

/// Find a settings file
///
/// Absolute paths must exist as given; relative paths are tried as given,
/// then against the current directory and each of its ancestors.
pub fn locate_settings(path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        return path.exists().then(|| path.to_path_buf());
    }

    if path.exists() {
        return Some(path.to_path_buf());
    }

    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .map(|dir| dir.join(path))
        .find(|candidate| candidate.exists())
}

/// Load settings, treating a missing or broken file as empty
pub fn load_settings(path: &Path) -> Settings {
    let Some(found) = locate_settings(path) else {
        debug!("No settings file found for {}", path.display());
        return Settings::default();
    };

    let parsed = std::fs::read_to_string(&found)
        .map_err(|e| e.to_string())
        .and_then(|content| {
            if content.trim().is_empty() {
                return Ok(Settings::default());
            }
            serde_yaml::from_str::<Settings>(&content).map_err(|e| e.to_string())
        });

    match parsed {
        Ok(settings) => {
            debug!("Loaded settings from {}", found.display());
            settings
        }
        Err(e) => {
            warn!("Failed to load config from {}: {}", found.display(), e);
            Settings::default()
        }
    }
}

/// CLI value, else settings value, else default
pub fn resolve_arg<T>(cli: Option<T>, from_file: Option<T>, default: Option<T>) -> Option<T> {
    cli.or(from_file).or(default)
}

/// Where to write the result text, if anywhere
///
/// A directory (existing, or non-existent without an extension) gets
/// `<video stem>.md` appended.
pub fn resolve_output_path(output: Option<&Path>, video_path: &Path) -> Option<PathBuf> {
    let output = output?;

    let looks_like_dir = output.is_dir() || (!output.exists() && output.extension().is_none());
    if looks_like_dir {
        let stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        return Some(output.join(format!("{}.md", stem)));
    }

    Some(output.to_path_buf())
}
