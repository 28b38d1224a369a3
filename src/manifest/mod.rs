pub mod builder;
pub mod record;

pub use builder::{ManifestBuilder, ManifestSummary};
pub use record::FrameRecord;
