use std::time::{Duration, Instant};

use tracing::debug;
use uuid::Uuid;

use super::metrics::RunMetrics;
use super::state::{Extracted, Manifested, Persisted, ProcessingState, Received};
use crate::extraction::ExtractedFrames;
use crate::manifest::ManifestSummary;
use crate::pipeline::Stage;
use crate::storage::{PersistedUpload, Upload};

// RunContext with compile-time tracking of the stage a run has reached
pub struct RunContext<S> {
    run_id: Uuid,
    wallet: String,
    screen_color: String,
    metrics: RunMetrics,
    run_start: Instant,
    stage_start: Instant,
    state: S,
}

impl<S: ProcessingState> RunContext<S> {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    pub fn screen_color(&self) -> &str {
        &self.screen_color
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    pub fn elapsed(&self) -> Duration {
        self.run_start.elapsed()
    }

    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }

    fn advance<T: ProcessingState>(mut self, stage: Stage, state: T) -> RunContext<T> {
        self.metrics.record(stage, self.stage_start.elapsed());
        debug!(
            run_id = %self.run_id,
            "{} -> {} after {:?}",
            S::state_name(),
            T::state_name(),
            self.stage_start.elapsed()
        );
        RunContext {
            run_id: self.run_id,
            wallet: self.wallet,
            screen_color: self.screen_color,
            metrics: self.metrics,
            run_start: self.run_start,
            stage_start: Instant::now(),
            state,
        }
    }
}

impl RunContext<Received> {
    pub fn new(run_id: Uuid, upload: Upload) -> Self {
        let now = Instant::now();
        Self {
            run_id,
            wallet: upload.wallet.clone(),
            screen_color: upload.screen_color.clone(),
            metrics: RunMetrics::new(),
            run_start: now,
            stage_start: now,
            state: Received { upload },
        }
    }

    pub fn upload(&self) -> &Upload {
        &self.state.upload
    }

    /// The upload bytes are dropped once they are on disk.
    pub fn into_persisted(self, upload: PersistedUpload) -> RunContext<Persisted> {
        self.advance(Stage::Persist, Persisted { upload })
    }
}

impl RunContext<Persisted> {
    pub fn persisted(&self) -> &PersistedUpload {
        &self.state.upload
    }

    pub fn into_extracted(self, frames: ExtractedFrames) -> RunContext<Extracted> {
        let upload = self.state.upload.clone();
        self.advance(Stage::Extraction, Extracted { upload, frames })
    }
}

impl RunContext<Extracted> {
    pub fn persisted(&self) -> &PersistedUpload {
        &self.state.upload
    }

    pub fn frames(&self) -> &ExtractedFrames {
        &self.state.frames
    }

    pub fn into_manifested(self, manifest: ManifestSummary) -> RunContext<Manifested> {
        let upload = self.state.upload.clone();
        self.advance(Stage::Manifest, Manifested { upload, manifest })
    }
}

impl RunContext<Manifested> {
    pub fn persisted(&self) -> &PersistedUpload {
        &self.state.upload
    }

    pub fn manifest(&self) -> &ManifestSummary {
        &self.state.manifest
    }

    /// Record a remote stage that ran after the manifest was written.
    pub fn record_remote(&mut self, stage: Stage) {
        self.metrics.record(stage, self.stage_start.elapsed());
        self.stage_start = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn persisted() -> PersistedUpload {
        PersistedUpload {
            path: PathBuf::from("Video/uploads/1_clip.mp4"),
            file_name: "1_clip.mp4".to_string(),
        }
    }

    #[test]
    fn context_carries_metadata_through_states() {
        let upload = Upload::new(b"bytes".to_vec(), "clip.mp4", "0xwallet", "GREEN");
        let ctx = RunContext::new(Uuid::new_v4(), upload);
        assert_eq!(ctx.state_name(), "Received");
        assert_eq!(ctx.upload().original_name, "clip.mp4");

        let ctx = ctx.into_persisted(persisted());
        assert_eq!(ctx.state_name(), "Persisted");

        let ctx = ctx.into_extracted(ExtractedFrames::default());
        assert_eq!(ctx.frames().count(), 0);

        let mut ctx = ctx.into_manifested(ManifestSummary {
            path: PathBuf::from("Video/manifests/1_clip.mp4_data.json"),
            frame_count: 0,
            orphaned: 0,
        });
        ctx.record_remote(Stage::Analysis);

        assert_eq!(ctx.state_name(), "Manifested");
        assert_eq!(ctx.wallet(), "0xwallet");
        assert_eq!(ctx.screen_color(), "GREEN");
        assert_eq!(ctx.persisted().file_name, "1_clip.mp4");
        let stages: Vec<Stage> = ctx.metrics().stages().iter().map(|(s, _)| *s).collect();
        assert_eq!(
            stages,
            vec![Stage::Persist, Stage::Extraction, Stage::Manifest, Stage::Analysis]
        );
    }
}
