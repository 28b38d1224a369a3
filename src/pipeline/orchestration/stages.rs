use std::path::Path;

use async_trait::async_trait;

use crate::error::PipelineError;

/// Scores a manifest and returns the raw response body.
#[async_trait]
pub trait AnalysisStage: Send + Sync {
    async fn analyze(&self, manifest_path: &Path) -> Result<String, PipelineError>;
}

/// Receives an accepted analysis body verbatim and returns its own raw response.
#[async_trait]
pub trait FinalizationStage: Send + Sync {
    async fn finalize(&self, analysis_body: &str) -> Result<String, PipelineError>;
}
