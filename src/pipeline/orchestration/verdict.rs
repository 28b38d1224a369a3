use serde::Deserialize;
use serde_json::Value;

use crate::error::PipelineError;
use crate::pipeline::Stage;

const ACCEPTED_STATUS: &str = "verified";
const MISSING_STATUS: &str = "failed";

/// How the analysis stage judged a manifest. Both variants keep the raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisVerdict {
    Accepted(String),
    Rejected(String),
}

impl AnalysisVerdict {
    /// Classify a raw analysis body by its `status` field.
    ///
    /// A missing or non-string status counts as `"failed"`. Only a
    /// case-insensitive `"verified"` is accepted.
    pub fn classify(body: String) -> Result<Self, PipelineError> {
        let value: Value =
            serde_json::from_str(&body).map_err(|source| PipelineError::MalformedResponse {
                stage: Stage::Analysis,
                source,
            })?;

        if status_of(&value).eq_ignore_ascii_case(ACCEPTED_STATUS) {
            Ok(AnalysisVerdict::Accepted(body))
        } else {
            Ok(AnalysisVerdict::Rejected(body))
        }
    }

    pub fn body(&self) -> &str {
        match self {
            AnalysisVerdict::Accepted(body) | AnalysisVerdict::Rejected(body) => body,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, AnalysisVerdict::Accepted(_))
    }
}

fn status_of(value: &Value) -> &str {
    value
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or(MISSING_STATUS)
}

/// Lenient view of the fields the analysis service usually reports.
/// Only used for logging; the raw body is what gets forwarded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisReport {
    pub status: Option<String>,
    pub wallet: Option<String>,
    pub session_id: Option<String>,
    pub confidence_score: Option<f64>,
    pub eye_score: Option<f64>,
    pub skin_score: Option<f64>,
    pub pulse_score: Option<f64>,
    pub flash_score: Option<f64>,
}

impl AnalysisReport {
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}
