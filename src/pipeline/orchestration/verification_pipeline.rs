use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::outcome::PipelineOutcome;
use super::service::{AnalysisService, FinalizationService, call_stage};
use super::stages::{AnalysisStage, FinalizationStage};
use super::verdict::{AnalysisReport, AnalysisVerdict};
use crate::config::Settings;
use crate::error::{AppError, PipelineError};
use crate::extraction::{FrameExtractor, ProcessRunner, SystemProcessRunner};
use crate::manifest::ManifestBuilder;
use crate::manifest::builder::discard_frames;
use crate::pipeline::Stage;
use crate::pipeline::context::RunContext;
use crate::remote::{HttpAnalysisClient, HttpFinalizationClient};
use crate::storage::{StorageLayout, Upload};

/// Turns one uploaded video into one verification outcome.
///
/// Each run is strictly sequential: persist, extract, build the manifest,
/// analyse, and finalize only when the analysis accepted the manifest.
pub struct VerificationPipeline {
    layout: StorageLayout,
    isolate_runs: bool,
    extractor: FrameExtractor,
    manifests: ManifestBuilder,
    analysis: Arc<dyn AnalysisStage>,
    finalization: Arc<dyn FinalizationStage>,
    analysis_timeout: Duration,
    finalization_timeout: Duration,
}

impl VerificationPipeline {
    pub fn builder(settings: Settings) -> VerificationPipelineBuilder {
        VerificationPipelineBuilder::new(settings)
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Run the whole pipeline for one upload.
    ///
    /// Never fails: every error is turned into `PipelineOutcome::Failed`.
    pub async fn process_video(&self, upload: Upload) -> PipelineOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("verification_run", %run_id, original = %upload.original_name);

        async move {
            match self.run(run_id, upload).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(stage = ?err.stage(), "Pipeline error: {}", err);
                    PipelineOutcome::Failed(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, run_id: Uuid, upload: Upload) -> Result<PipelineOutcome, PipelineError> {
        self.layout.ensure().await?;

        let ctx = RunContext::new(run_id, upload);
        let persisted = self.layout.persist_upload(ctx.upload()).await?;
        let ctx = ctx.into_persisted(persisted);

        let frames_dir = self
            .layout
            .run_frames_dir(&ctx.persisted().file_name, self.isolate_runs)
            .await?;
        let frames = match self.extractor.extract(&ctx.persisted().path, &frames_dir).await {
            Ok(frames) => frames,
            Err(err) => {
                self.release_frames(&frames_dir).await;
                return Err(err);
            }
        };
        let ctx = ctx.into_extracted(frames);

        let manifest = match self
            .manifests
            .build(
                ctx.wallet(),
                ctx.screen_color(),
                &ctx.persisted().file_name,
                ctx.frames(),
            )
            .await
        {
            Ok(manifest) => manifest,
            Err(err) => {
                self.release_frames(&frames_dir).await;
                return Err(err);
            }
        };
        self.layout.release_run_frames_dir(&frames_dir).await;
        let mut ctx = ctx.into_manifested(manifest);
        if ctx.manifest().orphaned > 0 {
            warn!("{} frame files could not be removed", ctx.manifest().orphaned);
        }

        let analysis_body = call_stage(
            Stage::Analysis,
            AnalysisService::new(self.analysis.clone()),
            Some(self.analysis_timeout),
            ctx.manifest().path.clone(),
        )
        .await?;
        ctx.record_remote(Stage::Analysis);

        let report = AnalysisReport::from_body(&analysis_body);
        info!(
            status = report.status.as_deref().unwrap_or("<missing>"),
            session = report.session_id.as_deref().unwrap_or("-"),
            confidence = ?report.confidence_score,
            "Analysis complete"
        );

        let outcome = match AnalysisVerdict::classify(analysis_body)? {
            AnalysisVerdict::Accepted(body) => {
                info!("Analysis accepted, finalizing");
                let response = call_stage(
                    Stage::Finalization,
                    FinalizationService::new(self.finalization.clone()),
                    Some(self.finalization_timeout),
                    body,
                )
                .await?;
                ctx.record_remote(Stage::Finalization);
                PipelineOutcome::Finalized(response)
            }
            AnalysisVerdict::Rejected(body) => {
                info!("Analysis did not verify the upload, skipping finalization");
                PipelineOutcome::Rejected(body)
            }
        };

        info!(
            frames = ctx.manifest().frame_count,
            staged = ?ctx.metrics().total(),
            "Run finished in {:?}",
            ctx.elapsed()
        );
        Ok(outcome)
    }

    async fn release_frames(&self, frames_dir: &Path) {
        discard_frames(frames_dir).await;
        self.layout.release_run_frames_dir(frames_dir).await;
    }
}

pub struct VerificationPipelineBuilder {
    settings: Settings,
    runner: Option<Arc<dyn ProcessRunner>>,
    analysis: Option<Arc<dyn AnalysisStage>>,
    finalization: Option<Arc<dyn FinalizationStage>>,
    extraction_timeout: Option<Duration>,
    analysis_timeout: Option<Duration>,
    finalization_timeout: Option<Duration>,
}

impl VerificationPipelineBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            runner: None,
            analysis: None,
            finalization: None,
            extraction_timeout: None,
            analysis_timeout: None,
            finalization_timeout: None,
        }
    }

    // Replaces the process runner used for frame extraction.
    pub fn runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    // Replaces the HTTP analysis client.
    pub fn analysis(mut self, analysis: Arc<dyn AnalysisStage>) -> Self {
        self.analysis = Some(analysis);
        self
    }

    // Replaces the HTTP finalization client.
    pub fn finalization(mut self, finalization: Arc<dyn FinalizationStage>) -> Self {
        self.finalization = Some(finalization);
        self
    }

    // Overrides the configured extraction timeout.
    pub fn extraction_timeout(mut self, timeout: Duration) -> Self {
        self.extraction_timeout = Some(timeout);
        self
    }

    // Overrides the configured analysis timeout.
    pub fn analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = Some(timeout);
        self
    }

    // Overrides the configured finalization timeout.
    pub fn finalization_timeout(mut self, timeout: Duration) -> Self {
        self.finalization_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<VerificationPipeline, AppError> {
        let settings = self.settings;
        settings.validate()?;

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::InvalidConfig(format!("HTTP client: {}", e)))?;

        let analysis: Arc<dyn AnalysisStage> = match self.analysis {
            Some(analysis) => analysis,
            None => Arc::new(HttpAnalysisClient::new(
                client.clone(),
                settings.analysis_endpoint.clone(),
            )),
        };
        let finalization: Arc<dyn FinalizationStage> = match self.finalization {
            Some(finalization) => finalization,
            None => Arc::new(HttpFinalizationClient::new(
                client,
                settings.finalization_endpoint.clone(),
                &settings.credential_header,
                &settings.finalization_credential,
            )?),
        };

        let runner: Arc<dyn ProcessRunner> = match self.runner {
            Some(runner) => runner,
            None => Arc::new(SystemProcessRunner),
        };
        let layout = StorageLayout::new(settings.working_root.clone());

        Ok(VerificationPipeline {
            extractor: FrameExtractor::new(
                settings.extractor_program.clone(),
                runner,
                self.extraction_timeout
                    .unwrap_or_else(|| settings.extraction_timeout()),
            ),
            manifests: ManifestBuilder::new(layout.clone()),
            layout,
            isolate_runs: settings.isolate_runs,
            analysis,
            finalization,
            analysis_timeout: self
                .analysis_timeout
                .unwrap_or_else(|| settings.analysis_timeout()),
            finalization_timeout: self
                .finalization_timeout
                .unwrap_or_else(|| settings.finalization_timeout()),
        })
    }
}
