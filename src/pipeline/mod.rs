pub mod context;
pub mod orchestration;

use std::fmt;

pub use context::{RunContext, RunMetrics};
pub use orchestration::{
    AnalysisStage, AnalysisVerdict, FinalizationStage, PipelineOutcome, VerificationPipeline,
    VerificationPipelineBuilder,
};

/// The steps of a verification run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Layout,
    Persist,
    Extraction,
    Manifest,
    Analysis,
    Finalization,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Layout => "Layout",
            Stage::Persist => "Persist",
            Stage::Extraction => "Extraction",
            Stage::Manifest => "Manifest",
            Stage::Analysis => "Analysis",
            Stage::Finalization => "Finalization",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
