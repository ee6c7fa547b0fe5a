//! # Backend Job Service
//!
//! The banner renderer lives in a separate service. This server never does
//! any generation itself, it only forwards to that service by proxy.
//!
//! ## Endpoints used
//! - `POST /api/banner`: create a job, responds with a job id
//! - `GET /api/banner/{jobId}`: current status/result of a job
//! - `POST /api/stablediffusion/generate`, `POST /api/stablediffusion/img2img`: background image jobs
//! - `GET /api/stablediffusion/status/{jobId}`: status of an image job
//! - `POST /api/upload`: multipart image upload, 30 second deadline
//! - `GET /health`: liveness of the service itself
//!
//! ## Failures
//! - No response at all (refused, reset, timed out) is [`AppError::UpstreamUnavailable`]
//!   carrying the transport error message untouched
//! - A response with a non-2xx status, or a 2xx body that is not JSON, is
//!   [`AppError::UpstreamRejected`]
//!
//! Nothing is retried. Apart from uploads no timeout is set, reqwest defaults apply.
//! The service runs next to this one, so `HTTP_PROXY` and friends are ignored.
use std::time::Duration;

use reqwest::{Client, Response, Url, multipart::Form};
use serde_json::Value;
use tracing::warn;

use crate::error::AppError;

const USER_AGENT: &str = concat!("autobanner/", env!("CARGO_PKG_VERSION"));
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

pub const BANNER: &[&str] = &["api", "banner"];
pub const HEALTH: &[&str] = &["health"];
pub const IMAGE_GENERATE: &[&str] = &["api", "stablediffusion", "generate"];
pub const IMAGE_STATUS: &[&str] = &["api", "stablediffusion", "status"];
pub const IMAGE_IMG2IMG: &[&str] = &["api", "stablediffusion", "img2img"];
pub const UPLOAD: &[&str] = &["api", "upload"];

#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: Url,
    http: Client,
}

impl BackendClient {
    pub fn new(base_url: Url) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()?;

        Ok(Self { base_url, http })
    }

    /// `job_id` goes out exactly as received, as the last path segment under `prefix`.
    pub async fn job_status(&self, prefix: &[&str], job_id: &str) -> Result<Value, AppError> {
        self.get_json(&[prefix, &[job_id]].concat()).await
    }

    pub async fn health(&self) -> Result<Value, AppError> {
        self.get_json(HEALTH).await
    }

    pub async fn get_json(&self, segments: &[&str]) -> Result<Value, AppError> {
        let url = self.endpoint(segments)?;
        let response = self.http.get(url).send().await?;

        read_json(response).await
    }

    pub async fn post_json(&self, segments: &[&str], payload: &Value) -> Result<Value, AppError> {
        let url = self.endpoint(segments)?;
        let response = self.http.post(url).json(payload).send().await?;

        read_json(response).await
    }

    /// Uploads are the only call with a deadline.
    pub async fn post_multipart(&self, segments: &[&str], form: Form) -> Result<Value, AppError> {
        let url = self.endpoint(segments)?;
        let response = self
            .http
            .post(url)
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await?;

        read_json(response).await
    }

    /// Appends `segments` to the base url, each one percent-encoded on its own.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();

        url.path_segments_mut()
            .map_err(|_| {
                AppError::UpstreamUnavailable(format!("invalid backend base url {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }
}

async fn read_json(response: Response) -> Result<Value, AppError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %body, "Backend rejected request");

        return Err(AppError::rejected(status.as_u16()));
    }

    let bytes = response.bytes().await?;

    serde_json::from_slice(&bytes).map_err(|e| AppError::UpstreamRejected {
        status: status.as_u16(),
        message: format!("Backend returned invalid JSON: {e}"),
    })
}
