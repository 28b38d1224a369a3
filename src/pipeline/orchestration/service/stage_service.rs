use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::task::{Context, Poll};
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower::{BoxError, Service, ServiceBuilder, ServiceExt};

use crate::error::PipelineError;
use crate::pipeline::Stage;
use crate::pipeline::orchestration::stages::{AnalysisStage, FinalizationStage};

#[derive(Clone)]
pub struct AnalysisService {
    inner: Arc<dyn AnalysisStage>,
}

impl AnalysisService {
    pub fn new(inner: Arc<dyn AnalysisStage>) -> Self {
        Self { inner }
    }
}

impl Service<PathBuf> for AnalysisService {
    type Response = String;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, manifest_path: PathBuf) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.analyze(&manifest_path).await?) })
    }
}

#[derive(Clone)]
pub struct FinalizationService {
    inner: Arc<dyn FinalizationStage>,
}

impl FinalizationService {
    pub fn new(inner: Arc<dyn FinalizationStage>) -> Self {
        Self { inner }
    }
}

impl Service<String> for FinalizationService {
    type Response = String;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, analysis_body: String) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.finalize(&analysis_body).await?) })
    }
}

/// Call a stage service once, bounded by `timeout` when one is given.
pub async fn call_stage<S, Req>(
    stage: Stage,
    service: S,
    timeout: Option<Duration>,
    request: Req,
) -> Result<String, PipelineError>
where
    S: Service<Req, Response = String, Error = BoxError> + Send,
    S::Future: Send,
    Req: Send,
{
    ServiceBuilder::new()
        .option_layer(timeout.map(TimeoutLayer::new))
        .service(service)
        .oneshot(request)
        .await
        .map_err(|err| into_pipeline_error(stage, err))
}

fn into_pipeline_error(stage: Stage, err: BoxError) -> PipelineError {
    if err.is::<Elapsed>() {
        return PipelineError::Timeout { stage };
    }
    match err.downcast::<PipelineError>() {
        Ok(err) => *err,
        Err(other) => PipelineError::Stage {
            stage,
            message: other.to_string(),
        },
    }
}
