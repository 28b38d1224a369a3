use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use super::record::FrameRecord;
use crate::error::PipelineError;
use crate::extraction::ExtractedFrames;
use crate::extraction::extractor::FRAME_EXTENSION;
use crate::pipeline::Stage;
use crate::storage::StorageLayout;

/// Result of writing a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSummary {
    pub path: PathBuf,
    pub frame_count: usize,
    /// Frame files that could not be deleted and were left behind.
    pub orphaned: usize,
}

/// Turns extracted frames into a manifest file, consuming the frames.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    layout: StorageLayout,
}

impl ManifestBuilder {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// Encode every frame in order, delete each one after encoding and write
    /// `<video_file_name>_data.json` into the manifests directory.
    ///
    /// Zero frames produce an empty manifest. Failing to delete a frame is
    /// logged and counted but does not stop the build.
    #[instrument(skip(self, frames), fields(frames = frames.count()))]
    pub async fn build(
        &self,
        wallet: &str,
        screen_color: &str,
        video_file_name: &str,
        frames: &ExtractedFrames,
    ) -> Result<ManifestSummary, PipelineError> {
        let mut records = Vec::with_capacity(frames.count());
        let mut orphaned = 0;

        for path in &frames.frames {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| PipelineError::storage(Stage::Manifest, path, e))?;
            records.push(FrameRecord::encode(&bytes, wallet, screen_color));

            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!("Failed to delete frame {}: {}", path.display(), e);
                orphaned += 1;
            }
        }

        orphaned += discard_frames(&frames.dir).await;

        let manifest_path = self.layout.manifest_path(video_file_name);
        let document = serde_json::to_vec(&records)?;
        tokio::fs::write(&manifest_path, document)
            .await
            .map_err(|e| PipelineError::storage(Stage::Manifest, &manifest_path, e))?;

        info!(
            "Wrote manifest {} with {} frames",
            manifest_path.display(),
            records.len()
        );

        Ok(ManifestSummary {
            path: manifest_path,
            frame_count: records.len(),
            orphaned,
        })
    }
}

/// Delete every frame file left in `dir`, returning how many could not be removed.
///
/// Catches frames written past a numbering gap and leftovers of a failed run.
pub async fn discard_frames(dir: &Path) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to scan frames directory {}: {}", dir.display(), e);
            return 0;
        }
    };

    let mut orphaned = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to scan frames directory {}: {}", dir.display(), e);
                break;
            }
        };
        let path = entry.path();
        let is_frame = path.extension().and_then(|e| e.to_str()) == Some(FRAME_EXTENSION);
        // Links count as frames too; only directories are skipped.
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(true);
        if !is_frame || is_dir {
            continue;
        }

        warn!("Removing leftover frame {}", path.display());
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Failed to delete frame {}: {}", path.display(), e);
            orphaned += 1;
        }
    }
    orphaned
}
