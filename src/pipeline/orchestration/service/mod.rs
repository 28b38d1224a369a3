pub mod stage_service;

pub use stage_service::{AnalysisService, FinalizationService, call_stage};
