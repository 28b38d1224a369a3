pub mod outcome;
pub mod service;
pub mod stages;
pub mod verdict;
pub mod verification_pipeline;

pub use outcome::{PipelineOutcome, error_envelope};
pub use stages::{AnalysisStage, FinalizationStage};
pub use verdict::{AnalysisReport, AnalysisVerdict};
pub use verification_pipeline::{VerificationPipeline, VerificationPipelineBuilder};
