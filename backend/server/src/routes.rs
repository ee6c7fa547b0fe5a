use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, State as AxumState, multipart::MultipartRejection},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::{
    backend::{BANNER, IMAGE_GENERATE, IMAGE_IMG2IMG, IMAGE_STATUS, UPLOAD},
    error::{AppError, MISSING_FILE, MISSING_JOB_ID, RouteError},
    observer::{ClientLog, record_client_log},
    state::State,
};

pub const STATUS_FAILED: &str = "status check failed";
pub const GENERATION_FAILED: &str = "banner generation failed";
pub const IMAGE_GENERATION_FAILED: &str = "image generation failed";
pub const IMG2IMG_FAILED: &str = "img2img request failed";
pub const UPLOAD_FAILED: &str = "file upload failed";
pub const BACKEND_UNREACHABLE: &str = "backend connection failed";
pub const INVALID_LOG_REPORT: &str = "invalid log report";

pub const LIVENESS_MESSAGE: &str = "frontend API routes are working";
pub const DEBUG_BODY_LIMIT: usize = 200;
pub const UPLOAD_BODY_LIMIT: usize = 20 * 1024 * 1024;

/// ISO-8601 in UTC with milliseconds, e.g. `2024-01-01T00:00:00.000Z`.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub async fn status_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(job_id): Path<String>,
) -> Response {
    relay_status(&state, BANNER, &job_id).await
}

/// `/api/banner/` with nothing after the slash.
pub async fn missing_job_handler(AxumState(state): AxumState<Arc<State>>) -> Response {
    relay_status(&state, BANNER, "").await
}

pub async fn image_status_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(job_id): Path<String>,
) -> Response {
    relay_status(&state, IMAGE_STATUS, &job_id).await
}

pub async fn missing_image_job_handler(AxumState(state): AxumState<Arc<State>>) -> Response {
    relay_status(&state, IMAGE_STATUS, "").await
}

/// Blank ids are refused here, anything else is forwarded exactly as received.
async fn relay_status(state: &State, prefix: &[&str], job_id: &str) -> Response {
    if job_id.trim().is_empty() {
        return AppError::ClientInput(MISSING_JOB_ID)
            .context(STATUS_FAILED)
            .into_response();
    }

    info!("Checking status, job {job_id}");

    match state.backend.job_status(prefix, job_id).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => e.context(STATUS_FAILED).into_response(),
    }
}

pub async fn generate_handler(AxumState(state): AxumState<Arc<State>>, body: Bytes) -> Response {
    relay_json(&state, BANNER, &body, GENERATION_FAILED).await
}

pub async fn image_generate_handler(
    AxumState(state): AxumState<Arc<State>>,
    body: Bytes,
) -> Response {
    relay_json(&state, IMAGE_GENERATE, &body, IMAGE_GENERATION_FAILED).await
}

pub async fn img2img_handler(AxumState(state): AxumState<Arc<State>>, body: Bytes) -> Response {
    relay_json(&state, IMAGE_IMG2IMG, &body, IMG2IMG_FAILED).await
}

async fn relay_json(
    state: &State,
    segments: &[&str],
    body: &[u8],
    context: &'static str,
) -> Response {
    let payload: Value = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => {
            return AppError::MalformedPayload(e.to_string())
                .context(context)
                .into_response();
        }
    };

    match state.backend.post_json(segments, &payload).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => e.context(context).into_response(),
    }
}

struct Upload {
    file_name: String,
    content_type: String,
    bytes: Bytes,
}

pub async fn upload_handler(
    AxumState(state): AxumState<Arc<State>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, RouteError> {
    let mut multipart =
        multipart.map_err(|e| AppError::MalformedPayload(e.to_string()).context(UPLOAD_FAILED))?;

    let upload = read_image(&mut multipart)
        .await
        .map_err(|e| e.context(UPLOAD_FAILED))?
        .ok_or_else(|| AppError::ClientInput(MISSING_FILE).context(UPLOAD_FAILED))?;

    info!(
        file = %upload.file_name,
        size = upload.bytes.len(),
        content_type = %upload.content_type,
        "Forwarding upload"
    );

    let part = Part::bytes(upload.bytes.to_vec())
        .file_name(upload.file_name)
        .mime_str(&upload.content_type)
        .map_err(|e| AppError::MalformedPayload(e.to_string()).context(UPLOAD_FAILED))?;

    state
        .backend
        .post_multipart(UPLOAD, Form::new().part("image", part))
        .await
        .map(Json)
        .map_err(|e| e.context(UPLOAD_FAILED))
}

/// First field named `image`, other fields are skipped.
async fn read_image(multipart: &mut Multipart) -> Result<Option<Upload>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::MalformedPayload(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::MalformedPayload(e.to_string()))?;

        return Ok(Some(Upload {
            file_name,
            content_type,
            bytes,
        }));
    }

    Ok(None)
}

#[derive(Serialize)]
pub struct Liveness {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
}

pub async fn test_handler() -> Json<Liveness> {
    Json(Liveness {
        status: "ok",
        message: LIVENESS_MESSAGE,
        timestamp: timestamp(),
    })
}

pub async fn test_head_handler() -> StatusCode {
    StatusCode::OK
}

pub async fn test_backend_handler(AxumState(state): AxumState<Arc<State>>) -> Response {
    info!("Testing backend connection");

    match state.backend.health().await {
        Ok(healthy) => Json(json!({
            "healthy": healthy,
            "timestamp": timestamp(),
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "{BACKEND_UNREACHABLE}");

            (
                e.status(),
                Json(json!({
                    "error": BACKEND_UNREACHABLE,
                    "details": e.to_string(),
                    "timestamp": timestamp(),
                })),
            )
                .into_response()
        }
    }
}

pub async fn debug_handler(AxumState(state): AxumState<Arc<State>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "debug endpoint is working",
        "timestamp": timestamp(),
        "environment": {
            "app_env": state.config.app_env,
            "backend_base_url": state.config.backend_base_url.as_str(),
        },
    }))
}

pub async fn debug_echo_handler(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let headers: serde_json::Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            (name.to_string(), Value::String(value))
        })
        .collect();

    Json(json!({
        "status": "ok",
        "message": "POST request received",
        "timestamp": timestamp(),
        "request_info": {
            "method": method.as_str(),
            "uri": uri.to_string(),
            "headers": headers,
            "body": preview_body(&body),
        },
    }))
}

pub fn preview_body(body: &[u8]) -> String {
    if body.is_empty() {
        return "No body".to_string();
    }

    let text = String::from_utf8_lossy(body);
    let mut chars = text.chars();
    let preview: String = chars.by_ref().take(DEBUG_BODY_LIMIT).collect();

    if chars.next().is_some() {
        format!("{preview}...")
    } else {
        preview
    }
}

pub async fn logs_handler(body: Bytes) -> Response {
    match serde_json::from_slice::<ClientLog>(&body) {
        Ok(report) => {
            record_client_log(&report);

            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => AppError::MalformedPayload(e.to_string())
            .context(INVALID_LOG_REPORT)
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_bodies() {
        let body = "x".repeat(DEBUG_BODY_LIMIT + 1);
        let preview = preview_body(body.as_bytes());

        assert_eq!(preview.len(), DEBUG_BODY_LIMIT + 3);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn preview_keeps_short_bodies() {
        assert_eq!(preview_body(b"hello"), "hello");
        assert_eq!(preview_body(&[b'y'; DEBUG_BODY_LIMIT]).len(), DEBUG_BODY_LIMIT);
        assert_eq!(preview_body(b""), "No body");
    }

    #[test]
    fn timestamp_is_millisecond_utc() {
        let stamp = timestamp();

        assert!(stamp.ends_with('Z'));
        assert_eq!(stamp.len(), "2024-01-01T00:00:00.000Z".len());
    }
}
