use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
}

// Errors raised by a single verification run. None of these escape
// `VerificationPipeline::process_video`; they end up in the error envelope.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage} failed on {}: {source}", path.display())]
    Storage {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to start {program}: {source}")]
    ProcessSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Frame extraction exited with {}: {stderr}", describe_exit(*code))]
    ExtractionFailed { code: Option<i32>, stderr: String },
    #[error("{stage} timed out")]
    Timeout { stage: Stage },
    #[error("Failed to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("{stage} request failed: {source}")]
    Http {
        stage: Stage,
        #[source]
        source: reqwest::Error,
    },
    #[error("{stage} responded with HTTP {status}: {body}")]
    RemoteStatus {
        stage: Stage,
        status: u16,
        body: String,
    },
    #[error("{stage} returned a malformed response: {source}")]
    MalformedResponse {
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },
    #[error("{stage} failed: {message}")]
    Stage { stage: Stage, message: String },
}

impl PipelineError {
    pub fn storage(stage: Stage, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Storage {
            stage,
            path: path.into(),
            source,
        }
    }

    /// The stage the error is attributed to, when one is known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Storage { stage, .. }
            | PipelineError::Timeout { stage }
            | PipelineError::Http { stage, .. }
            | PipelineError::RemoteStatus { stage, .. }
            | PipelineError::MalformedResponse { stage, .. }
            | PipelineError::Stage { stage, .. } => Some(*stage),
            PipelineError::ProcessSpawn { .. } | PipelineError::ExtractionFailed { .. } => {
                Some(Stage::Extraction)
            }
            PipelineError::Manifest(_) => Some(Stage::Manifest),
        }
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}
