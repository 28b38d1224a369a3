pub mod config;
pub mod error;
pub mod extraction;
pub mod manifest;
pub mod pipeline;
pub mod remote;
pub mod storage;

pub use config::Settings;
pub use error::{AppError, PipelineError};
pub use pipeline::{PipelineOutcome, Stage, VerificationPipeline};
pub use storage::Upload;
