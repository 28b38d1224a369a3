pub mod metrics;
pub mod run_context;
pub mod state;

pub use metrics::RunMetrics;
pub use run_context::RunContext;
pub use state::{Extracted, Manifested, Persisted, ProcessingState, Received};
