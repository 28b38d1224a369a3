use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AppError, PipelineError};
use crate::pipeline::Stage;
use crate::pipeline::orchestration::stages::{AnalysisStage, FinalizationStage};

/// Request body for the analysis service
#[derive(Debug, Serialize)]
struct AnalysisRequest<'a> {
    json_path: &'a str,
}

/// Posts the manifest location to the analysis service.
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalysisClient {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl AnalysisStage for HttpAnalysisClient {
    async fn analyze(&self, manifest_path: &Path) -> Result<String, PipelineError> {
        let json_path = manifest_path.to_string_lossy();
        info!("Calling analysis service for {}", json_path);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&AnalysisRequest {
                json_path: &json_path,
            })
            .send()
            .await
            .map_err(|source| PipelineError::Http {
                stage: Stage::Analysis,
                source,
            })?;

        read_body(Stage::Analysis, response).await
    }
}

/// Forwards an accepted analysis body to the finalization service.
#[derive(Debug, Clone)]
pub struct HttpFinalizationClient {
    client: reqwest::Client,
    endpoint: String,
    header: HeaderName,
    credential: HeaderValue,
}

impl HttpFinalizationClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        header: &str,
        credential: &str,
    ) -> Result<Self, AppError> {
        let header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|e| AppError::InvalidConfig(format!("credential header: {}", e)))?;
        let mut credential = HeaderValue::from_str(credential)
            .map_err(|e| AppError::InvalidConfig(format!("credential value: {}", e)))?;
        credential.set_sensitive(true);

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            header,
            credential,
        })
    }
}

#[async_trait]
impl FinalizationStage for HttpFinalizationClient {
    async fn finalize(&self, analysis_body: &str) -> Result<String, PipelineError> {
        info!("Calling finalization service");

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(self.header.clone(), self.credential.clone())
            .body(analysis_body.to_owned())
            .send()
            .await
            .map_err(|source| PipelineError::Http {
                stage: Stage::Finalization,
                source,
            })?;

        read_body(Stage::Finalization, response).await
    }
}

async fn read_body(stage: Stage, response: reqwest::Response) -> Result<String, PipelineError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| PipelineError::Http { stage, source })?;
    debug!("{} responded with HTTP {}: {}", stage, status, body);

    if !status.is_success() {
        return Err(PipelineError::RemoteStatus {
            stage,
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accepts one connection, answers with `status` and `body` and returns
    /// the raw request it received.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/endpoint", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (url, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn body_of(request: &str) -> &str {
        request.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
    }

    #[tokio::test]
    async fn analysis_posts_manifest_path_as_json() {
        let (url, server) = serve_once("200 OK", r#"{"status":"verified"}"#).await;
        let client = HttpAnalysisClient::new(reqwest::Client::new(), url);

        let body = client
            .analyze(Path::new("Video/manifests/1_clip.mp4_data.json"))
            .await
            .unwrap();
        let request = server.await.unwrap();

        assert_eq!(body, r#"{"status":"verified"}"#);
        assert!(request.starts_with("POST /endpoint"));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        let payload: serde_json::Value = serde_json::from_str(body_of(&request)).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({"json_path": "Video/manifests/1_clip.mp4_data.json"})
        );
    }

    #[tokio::test]
    async fn finalization_forwards_body_with_credential() {
        let (url, server) = serve_once("200 OK", "minted").await;
        let client =
            HttpFinalizationClient::new(reqwest::Client::new(), url, "X-API-KEY", "prism-python-secret")
                .unwrap();
        let analysis = r#"{"status":"verified", "sessionId": "sess_1",  "eyeScore":0.5}"#;

        let body = client.finalize(analysis).await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(body, "minted");
        assert!(request.to_ascii_lowercase().contains("x-api-key: prism-python-secret"));
        assert_eq!(body_of(&request), analysis);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, server) = serve_once("503 Service Unavailable", "down").await;
        let client = HttpAnalysisClient::new(reqwest::Client::new(), url);

        let err = client.analyze(Path::new("m.json")).await.unwrap_err();
        server.await.unwrap();

        match err {
            PipelineError::RemoteStatus { stage, status, body } => {
                assert_eq!(stage, Stage::Analysis);
                assert_eq!(status, 503);
                assert_eq!(body, "down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_an_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/process-file", listener.local_addr().unwrap());
        drop(listener);

        let client = HttpAnalysisClient::new(reqwest::Client::new(), url);
        let err = client.analyze(Path::new("m.json")).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Http {
                stage: Stage::Analysis,
                ..
            }
        ));
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let result = HttpFinalizationClient::new(
            reqwest::Client::new(),
            "http://localhost:8080/api/verify/human",
            "bad header",
            "secret",
        );
        assert!(matches!(result, Err(AppError::InvalidConfig(_))));
    }
}
