use crate::extraction::ExtractedFrames;
use crate::manifest::ManifestSummary;
use crate::storage::{PersistedUpload, Upload};

// Markers to track how far a run has progressed
pub struct Received {
    pub(super) upload: Upload,
}

pub struct Persisted {
    pub(super) upload: PersistedUpload,
}

pub struct Extracted {
    pub(super) upload: PersistedUpload,
    pub(super) frames: ExtractedFrames,
}

pub struct Manifested {
    pub(super) upload: PersistedUpload,
    pub(super) manifest: ManifestSummary,
}

pub trait ProcessingState: 'static {
    fn state_name() -> &'static str;
}

impl ProcessingState for Received {
    fn state_name() -> &'static str {
        "Received"
    }
}

impl ProcessingState for Persisted {
    fn state_name() -> &'static str {
        "Persisted"
    }
}

impl ProcessingState for Extracted {
    fn state_name() -> &'static str {
        "Extracted"
    }
}

impl ProcessingState for Manifested {
    fn state_name() -> &'static str {
        "Manifested"
    }
}
