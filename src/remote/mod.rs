pub mod http;

pub use http::{HttpAnalysisClient, HttpFinalizationClient};
