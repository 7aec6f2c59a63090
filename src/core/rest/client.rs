use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::messages::{
    JobStatus, ListResultsQuery, TranscriptionJobResponse, TranscriptionListResults,
    TranscriptionRequest, TranscriptionResult, UploadResponse,
};
use crate::config::ClientConfig;
use crate::errors::{GladiaError, GladiaResult, NegotiationError};
use crate::utils::format_bytes;

/// Path of the upload endpoint.
pub const UPLOAD_PATH: &str = "/v2/upload";

/// Path of the pre-recorded jobs collection.
pub const PRERECORDED_PATH: &str = "/v2/pre-recorded";

/// Client for the pre-recorded transcription API.
///
/// Every call makes exactly one request, except
/// [`wait_for_result`](Self::wait_for_result) which polls until the job
/// settles.
#[derive(Debug, Clone)]
pub struct GladiaRestClient {
    config: ClientConfig,
    http_client: Client,
}

impl GladiaRestClient {
    pub fn new(config: ClientConfig) -> GladiaResult<Self> {
        config.validate().map_err(GladiaError::Configuration)?;
        let http_client = config.build_http_client()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Upload a local audio file. The returned `audio_url` can be used in a
    /// [`TranscriptionRequest`].
    pub async fn upload(&self, path: &Path) -> GladiaResult<UploadResponse> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("audio")
            .to_string();

        info!(
            "Uploading {} ({}) to Gladia",
            file_name,
            format_bytes(data.len() as u64)
        );

        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str(mime_type_for(path))?;
        let form = Form::new().part("audio", part);

        let url = self.config.endpoint(UPLOAD_PATH)?;
        let response = self
            .http_client
            .post(url)
            .header("x-gladia-key", &self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| GladiaError::Network(format!("Upload request failed: {e}")))?;

        let upload: UploadResponse = read_json(response, &[StatusCode::OK]).await?;
        debug!("Uploaded audio available at {}", upload.audio_url);
        Ok(upload)
    }

    /// Submit a transcription job.
    pub async fn pre_recorded(
        &self,
        request: &TranscriptionRequest,
    ) -> GladiaResult<TranscriptionJobResponse> {
        request.validate().map_err(GladiaError::Configuration)?;

        let url = self.config.endpoint(PRERECORDED_PATH)?;
        let response = self
            .http_client
            .post(url)
            .header("x-gladia-key", &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GladiaError::Network(format!("Transcription request failed: {e}")))?;

        let job: TranscriptionJobResponse = read_json(response, &[StatusCode::CREATED]).await?;
        info!("Submitted Gladia transcription job {}", job.id);
        Ok(job)
    }

    /// Fetch one job, finished or not.
    pub async fn get_result(&self, id: &str) -> GladiaResult<TranscriptionResult> {
        let url = self.job_url(id)?;
        let response = self
            .http_client
            .get(url)
            .header("x-gladia-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| GladiaError::Network(format!("Result request failed: {e}")))?;

        read_json(response, &[StatusCode::OK]).await
    }

    /// List jobs, newest first.
    pub async fn list_results(
        &self,
        query: &ListResultsQuery,
    ) -> GladiaResult<TranscriptionListResults> {
        let mut url = self.config.endpoint(PRERECORDED_PATH)?;
        url.query_pairs_mut().extend_pairs(query.to_query_pairs());

        let response = self
            .http_client
            .get(url)
            .header("x-gladia-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| GladiaError::Network(format!("List request failed: {e}")))?;

        read_json(response, &[StatusCode::OK]).await
    }

    /// Delete a job and its stored audio.
    pub async fn delete_result(&self, id: &str) -> GladiaResult<()> {
        let url = self.job_url(id)?;
        let response = self
            .http_client
            .delete(url)
            .header("x-gladia-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| GladiaError::Network(format!("Delete request failed: {e}")))?;

        check_status(response, &[StatusCode::ACCEPTED, StatusCode::NO_CONTENT]).await?;
        info!("Deleted Gladia transcription job {}", id);
        Ok(())
    }

    /// Poll [`get_result`](Self::get_result) until the job is `done` or
    /// `error`, or until `max_wait` has elapsed.
    pub async fn wait_for_result(
        &self,
        id: &str,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> GladiaResult<TranscriptionResult> {
        let started = Instant::now();
        loop {
            let result = self.get_result(id).await?;
            if result.status.is_terminal() {
                if result.status == JobStatus::Error {
                    warn!(
                        "Gladia job {} failed with error code {:?}",
                        id, result.error_code
                    );
                }
                return Ok(result);
            }

            if started.elapsed() + poll_interval > max_wait {
                return Err(GladiaError::Timeout(format!(
                    "job {id} still {} after {max_wait:?}",
                    result.status.as_str()
                )));
            }
            debug!("Job {} is {}, polling again", id, result.status.as_str());
            tokio::time::sleep(poll_interval).await;
        }
    }

    fn job_url(&self, id: &str) -> GladiaResult<url::Url> {
        if id.is_empty() || id.contains('/') {
            return Err(GladiaError::Configuration(format!("Invalid job id: {id:?}")));
        }
        self.config.endpoint(&format!("{PRERECORDED_PATH}/{id}"))
    }
}

fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        Some("webm") => "audio/webm",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// Fail with `GladiaError::Api` unless the status is one of `expected`.
/// Returns the body on success.
async fn check_status(response: Response, expected: &[StatusCode]) -> GladiaResult<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GladiaError::Network(format!("Failed to read response body: {e}")))?;

    if expected.contains(&status) {
        return Ok(body);
    }

    let api_error = NegotiationError::from_response(status.as_u16(), &body);
    error!("Gladia API request failed: {}", api_error);
    Err(GladiaError::Api(api_error))
}

async fn read_json<T: DeserializeOwned>(
    response: Response,
    expected: &[StatusCode],
) -> GladiaResult<T> {
    let body = check_status(response, expected).await?;
    serde_json::from_str(&body)
        .map_err(|e| GladiaError::InvalidResponse(format!("Unexpected response body: {e}")))
}
