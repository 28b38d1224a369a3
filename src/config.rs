use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::AppError;

const ENV_PREFIX: &str = "PRISM";

/// Runtime settings for a verification pipeline.
///
/// Values are layered: built-in defaults, then an optional settings file,
/// then `PRISM__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the uploads / frames / manifests tree.
    pub working_root: PathBuf,
    pub analysis_endpoint: String,
    pub finalization_endpoint: String,
    pub finalization_credential: String,
    pub credential_header: String,
    /// Frame-extraction executable, resolved through `PATH` when not absolute.
    pub extractor_program: String,
    pub extraction_timeout_secs: u64,
    pub analysis_timeout_secs: u64,
    pub finalization_timeout_secs: u64,
    /// Give every run its own frames directory.
    pub isolate_runs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            working_root: PathBuf::from("Video"),
            analysis_endpoint: "http://localhost:8000/process-file".to_string(),
            finalization_endpoint: "http://localhost:8080/api/verify/human?force=true".to_string(),
            finalization_credential: "prism-python-secret".to_string(),
            credential_header: "X-API-KEY".to_string(),
            extractor_program: "ffmpeg".to_string(),
            extraction_timeout_secs: 300,
            analysis_timeout_secs: 120,
            finalization_timeout_secs: 60,
            isolate_runs: true,
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional file and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        validate_endpoint("analysis_endpoint", &self.analysis_endpoint)?;
        validate_endpoint("finalization_endpoint", &self.finalization_endpoint)?;

        if self.finalization_credential.trim().is_empty() {
            return Err(AppError::InvalidConfig(
                "finalization_credential must not be empty".to_string(),
            ));
        }

        if reqwest::header::HeaderName::from_bytes(self.credential_header.as_bytes()).is_err() {
            return Err(AppError::InvalidConfig(format!(
                "credential_header '{}' is not a valid header name",
                self.credential_header
            )));
        }

        if self.extractor_program.trim().is_empty() {
            return Err(AppError::InvalidConfig(
                "extractor_program must not be empty".to_string(),
            ));
        }

        if self.extraction_timeout_secs == 0
            || self.analysis_timeout_secs == 0
            || self.finalization_timeout_secs == 0
        {
            return Err(AppError::InvalidConfig(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn finalization_timeout(&self) -> Duration {
        Duration::from_secs(self.finalization_timeout_secs)
    }
}

fn validate_endpoint(key: &str, value: &str) -> Result<(), AppError> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| AppError::InvalidConfig(format!("{} '{}' is not a URL: {}", key, value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::InvalidConfig(format!(
            "{} must use http or https, got '{}'",
            key, other
        ))),
    }
}
