use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::pipeline::Stage;

const UPLOADS_DIR: &str = "uploads";
const FRAMES_DIR: &str = "frames";
const MANIFESTS_DIR: &str = "manifests";

/// The working directory tree: uploads, extracted frames and manifests.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
    uploads: PathBuf,
    frames: PathBuf,
    manifests: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            uploads: root.join(UPLOADS_DIR),
            frames: root.join(FRAMES_DIR),
            manifests: root.join(MANIFESTS_DIR),
            root,
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads
    }

    pub fn frames_dir(&self) -> &Path {
        &self.frames
    }

    pub fn manifests_dir(&self) -> &Path {
        &self.manifests
    }

    /// Create the three working directories if they are missing.
    ///
    /// Idempotent. Existing directories are left untouched.
    pub async fn ensure(&self) -> Result<(), PipelineError> {
        for dir in [&self.uploads, &self.frames, &self.manifests] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| PipelineError::storage(Stage::Layout, dir, e))?;
        }
        debug!("Storage layout ready under {}", self.root.display());
        Ok(())
    }

    /// Frames directory for one run. With isolation the run gets its own
    /// subdirectory keyed by the persisted upload name.
    pub async fn run_frames_dir(&self, run_key: &str, isolate: bool) -> Result<PathBuf, PipelineError> {
        if !isolate {
            return Ok(self.frames.clone());
        }
        let dir = self.frames.join(run_key);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PipelineError::storage(Stage::Extraction, &dir, e))?;
        Ok(dir)
    }

    /// Remove a per-run frames directory once it has been emptied.
    /// The shared frames directory is never removed.
    pub async fn release_run_frames_dir(&self, dir: &Path) {
        if dir == self.frames.as_path() {
            return;
        }
        if let Err(e) = tokio::fs::remove_dir(dir).await {
            warn!("Failed to remove frames directory {}: {}", dir.display(), e);
        }
    }

    pub fn manifest_path(&self, video_file_name: &str) -> PathBuf {
        self.manifests.join(format!("{}_data.json", video_file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn ensure_creates_all_directories() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::new(dir.path().join("Video"));

        layout.ensure().await.unwrap();

        assert!(layout.uploads_dir().is_dir());
        assert!(layout.frames_dir().is_dir());
        assert!(layout.manifests_dir().is_dir());
    }

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.ensure().await.unwrap();
        std::fs::write(layout.uploads_dir().join("keep.mp4"), b"x").unwrap();

        layout.ensure().await.unwrap();

        assert!(layout.uploads_dir().join("keep.mp4").exists());
    }

    #[tokio::test]
    async fn ensure_fails_when_root_is_a_file() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let layout = StorageLayout::new(&blocker);

        let err = layout.ensure().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Storage {
                stage: Stage::Layout,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn isolated_run_dir_is_nested_and_released() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.ensure().await.unwrap();

        let run_dir = layout.run_frames_dir("1700000000000_clip.mp4", true).await.unwrap();
        assert_eq!(run_dir, layout.frames_dir().join("1700000000000_clip.mp4"));
        assert!(run_dir.is_dir());

        layout.release_run_frames_dir(&run_dir).await;
        assert!(!run_dir.exists());
        assert!(layout.frames_dir().is_dir());
    }

    #[tokio::test]
    async fn shared_frames_dir_is_never_released() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.ensure().await.unwrap();

        let shared = layout.run_frames_dir("ignored", false).await.unwrap();
        layout.release_run_frames_dir(&shared).await;

        assert!(shared.is_dir());
    }

    #[test]
    fn manifest_path_uses_video_file_name() {
        let layout = StorageLayout::new("Video");
        assert_eq!(
            layout.manifest_path("1700000000000_clip.mp4"),
            PathBuf::from("Video/manifests/1700000000000_clip.mp4_data.json")
        );
    }
}
