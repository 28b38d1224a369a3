use serde_json::json;

use crate::error::PipelineError;

/// Terminal result of one verification run.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Analysis accepted the manifest; holds the finalization response.
    Finalized(String),
    /// Analysis did not accept the manifest; holds its response verbatim.
    Rejected(String),
    Failed(PipelineError),
}

impl PipelineOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, PipelineOutcome::Failed(_))
    }

    /// The string handed back to the caller.
    pub fn into_response(self) -> String {
        match self {
            PipelineOutcome::Finalized(body) | PipelineOutcome::Rejected(body) => body,
            PipelineOutcome::Failed(err) => error_envelope(&err),
        }
    }
}

pub fn error_envelope(err: &PipelineError) -> String {
    json!({
        "status": "error",
        "message": format!("Pipeline Error: {}", err),
    })
    .to_string()
}
