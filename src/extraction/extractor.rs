use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument};

use super::process::ProcessRunner;
use crate::error::PipelineError;
use crate::pipeline::Stage;

const FRAME_PREFIX: &str = "frame_";
pub const FRAME_EXTENSION: &str = "jpg";
const OUTPUT_SCALE: &str = "scale=640:-1";
const SAMPLE_RATE: &str = "5";
const QUALITY: &str = "2";

/// Frames produced by one extraction, in extraction order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFrames {
    pub dir: PathBuf,
    pub frames: Vec<PathBuf>,
}

impl ExtractedFrames {
    pub fn count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// File name of the frame at a 1-based extraction index.
pub fn frame_file_name(index: usize) -> String {
    format!("{}{:03}.{}", FRAME_PREFIX, index, FRAME_EXTENSION)
}

/// Drives the external frame-extraction executable.
#[derive(Clone)]
pub struct FrameExtractor {
    program: String,
    runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
}

impl FrameExtractor {
    pub fn new(program: impl Into<String>, runner: Arc<dyn ProcessRunner>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            runner,
            timeout,
        }
    }

    pub fn arguments(video_path: &Path, frames_dir: &Path) -> Vec<OsString> {
        let pattern = frames_dir.join(format!("{}%03d.{}", FRAME_PREFIX, FRAME_EXTENSION));
        vec![
            "-i".into(),
            video_path.as_os_str().to_owned(),
            "-vf".into(),
            OUTPUT_SCALE.into(),
            "-r".into(),
            SAMPLE_RATE.into(),
            "-q:v".into(),
            QUALITY.into(),
            pattern.into_os_string(),
        ]
    }

    /// Extract frames from `video_path` into `frames_dir` and return them in order.
    ///
    /// A non-zero exit is fatal, even if some frames were written.
    #[instrument(skip(self), fields(program = %self.program))]
    pub async fn extract(
        &self,
        video_path: &Path,
        frames_dir: &Path,
    ) -> Result<ExtractedFrames, PipelineError> {
        let args = Self::arguments(video_path, frames_dir);
        let exit = self.runner.run(&self.program, &args, self.timeout).await?;

        if !exit.is_success() {
            return Err(PipelineError::ExtractionFailed {
                code: exit.code,
                stderr: exit.stderr,
            });
        }
        if !exit.stderr.is_empty() {
            debug!("Extractor stderr: {}", exit.stderr);
        }

        let frames = collect_frames(frames_dir).await?;
        info!("Extracted {} frames into {}", frames.count(), frames_dir.display());
        Ok(frames)
    }
}

/// Walk `frame_001.jpg`, `frame_002.jpg`, ... until the first missing index.
pub async fn collect_frames(frames_dir: &Path) -> Result<ExtractedFrames, PipelineError> {
    let mut frames = Vec::new();
    for index in 1.. {
        let path = frames_dir.join(frame_file_name(index));
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => frames.push(path),
            Ok(_) => break,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
            Err(e) => return Err(PipelineError::storage(Stage::Extraction, &path, e)),
        }
    }
    Ok(ExtractedFrames {
        dir: frames_dir.to_path_buf(),
        frames,
    })
}
