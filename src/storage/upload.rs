use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::StorageLayout;
use crate::error::PipelineError;
use crate::pipeline::Stage;

const FALLBACK_NAME: &str = "upload";

static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// A video handed over by the upload boundary, with its per-video metadata.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub original_name: String,
    pub wallet: String,
    pub screen_color: String,
}

impl Upload {
    pub fn new(
        bytes: impl Into<Vec<u8>>,
        original_name: impl Into<String>,
        wallet: impl Into<String>,
        screen_color: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            original_name: original_name.into(),
            wallet: wallet.into(),
            screen_color: screen_color.into(),
        }
    }
}

/// The upload as written to the uploads directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedUpload {
    pub path: PathBuf,
    pub file_name: String,
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        sanitized
    }
}

// Wall-clock millis, bumped so no two calls in this process share a stamp.
fn next_stamp() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::Relaxed)
        {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}

pub fn persisted_file_name(original_name: &str) -> String {
    format!("{}_{}", next_stamp(), sanitize_file_name(original_name))
}

impl StorageLayout {
    /// Write the upload bytes under a fresh timestamped name.
    /// An existing file is never overwritten.
    pub async fn persist_upload(&self, upload: &Upload) -> Result<PersistedUpload, PipelineError> {
        let file_name = persisted_file_name(&upload.original_name);
        let path = self.uploads_dir().join(&file_name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| PipelineError::storage(Stage::Persist, &path, e))?;
        file.write_all(&upload.bytes)
            .await
            .map_err(|e| PipelineError::storage(Stage::Persist, &path, e))?;
        file.flush()
            .await
            .map_err(|e| PipelineError::storage(Stage::Persist, &path, e))?;

        info!("Saved upload ({} bytes) to {}", upload.bytes.len(), path.display());
        Ok(PersistedUpload { path, file_name })
    }
}
