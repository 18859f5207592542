//! Fixed analysis tasks and their prompt templates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::errors::{AnalysisError, Result};

/// Prompt for [`TaskKind::Summarize`]
pub const SUMMARY_PROMPT: &str = "Provide a concise but comprehensive summary of this video. Highlight the key events and their timestamps.";

/// Prefix placed before the user's question
pub const QUESTION_LEAD_IN: &str = "Based on this video, please answer the following question: ";

/// Prompt for [`TaskKind::DetectEvents`]
pub const EVENTS_PROMPT: &str = "Identify and list all significant events or actions in this video with their corresponding timestamps. Format the output as a bulleted list.";

/// Prompt for [`TaskKind::TranscribeDiarize`]
pub const TRANSCRIBE_PROMPT: &str = "Transcribe the audio from this video. \
Identify different speakers and label them accordingly. \
Format the output strictly as followed: '[timestamp] Speaker: <content>'. \
For example: '[00:15] Speaker 1: Hello world.'";

/// Task identifiers, without their arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Concise summary
    Summarize,
    /// Free-form question
    Ask,
    /// Timestamped event list
    DetectEvents,
    /// Transcript with speaker labels
    TranscribeDiarize,
}

impl TaskKind {
    /// Every task, in menu order
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Summarize,
        TaskKind::Ask,
        TaskKind::DetectEvents,
        TaskKind::TranscribeDiarize,
    ];

    /// Human title for output panels
    pub fn title(&self) -> &'static str {
        match self {
            TaskKind::Summarize => "Video Summary",
            TaskKind::Ask => "Answer",
            TaskKind::DetectEvents => "Detected Events",
            TaskKind::TranscribeDiarize => "Diarized Transcript",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Summarize => write!(f, "summarize"),
            TaskKind::Ask => write!(f, "ask"),
            TaskKind::DetectEvents => write!(f, "detect_events"),
            TaskKind::TranscribeDiarize => write!(f, "transcribe_diarize"),
        }
    }
}

impl FromStr for TaskKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summarize" | "summary" => Ok(TaskKind::Summarize),
            "ask" => Ok(TaskKind::Ask),
            "detect_events" | "events" => Ok(TaskKind::DetectEvents),
            "transcribe_diarize" | "transcribe" => Ok(TaskKind::TranscribeDiarize),
            other => Err(AnalysisError::InvalidTask {
                message: format!("unknown task: {:?}", other),
            }),
        }
    }
}

/// A validated task, ready to render into a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Concise summary
    Summarize,
    /// Free-form question, never blank
    Ask { question: String },
    /// Timestamped event list
    DetectEvents,
    /// Transcript with speaker labels
    TranscribeDiarize,
}

impl Task {
    /// Build a task from its identifier and optional question
    ///
    /// `Ask` needs a non-blank question; the other tasks ignore it.
    pub fn new(kind: TaskKind, question: Option<&str>) -> Result<Self> {
        match kind {
            TaskKind::Summarize => Ok(Task::Summarize),
            TaskKind::DetectEvents => Ok(Task::DetectEvents),
            TaskKind::TranscribeDiarize => Ok(Task::TranscribeDiarize),
            TaskKind::Ask => Self::ask(question.unwrap_or_default()),
        }
    }

    /// Ask task; blank questions are `InvalidTask`
    pub fn ask(question: impl Into<String>) -> Result<Self> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(AnalysisError::InvalidTask {
                message: "the ask task requires a non-empty question".to_string(),
            });
        }
        Ok(Task::Ask { question })
    }

    /// Parse an identifier string such as `"events"` plus optional question
    pub fn parse(identifier: &str, question: Option<&str>) -> Result<Self> {
        Self::new(identifier.parse()?, question)
    }

    /// Kind without the question
    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Summarize => TaskKind::Summarize,
            Task::Ask { .. } => TaskKind::Ask,
            Task::DetectEvents => TaskKind::DetectEvents,
            Task::TranscribeDiarize => TaskKind::TranscribeDiarize,
        }
    }

    /// The literal prompt sent alongside the video
    pub fn prompt(&self) -> String {
        match self {
            Task::Summarize => SUMMARY_PROMPT.to_string(),
            Task::Ask { question } => format!("{}{}", QUESTION_LEAD_IN, question),
            Task::DetectEvents => EVENTS_PROMPT.to_string(),
            Task::TranscribeDiarize => TRANSCRIBE_PROMPT.to_string(),
        }
    }
}
