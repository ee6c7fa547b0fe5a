use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

pub const MISSING_JOB_ID: &str = "missing jobId parameter";
pub const MISSING_FILE: &str = "no file received";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    ClientInput(&'static str),

    #[error("{0}")]
    MalformedPayload(String),

    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("{message}")]
    UpstreamRejected { status: u16, message: String },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ClientInput { .. } => StatusCode::BAD_REQUEST,
            AppError::MalformedPayload { .. } => StatusCode::BAD_REQUEST,
            AppError::UpstreamUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UpstreamRejected { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn rejected(status: u16) -> Self {
        AppError::UpstreamRejected {
            status,
            message: format!("Request failed with status code {status}"),
        }
    }

    /// Attaches the route's fixed, human-readable message.
    pub fn context(self, context: &'static str) -> RouteError {
        RouteError {
            context,
            source: self,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => AppError::rejected(status.as_u16()),
            None => AppError::UpstreamUnavailable(e.to_string()),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// An [`AppError`] as seen from one route.
#[derive(Debug)]
pub struct RouteError {
    pub context: &'static str,
    pub source: AppError,
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let status = self.source.status();

        let body = match self.source {
            AppError::ClientInput(message) => {
                warn!(status = status.as_u16(), "{}: {message}", self.context);

                ErrorBody {
                    error: message.to_string(),
                    details: None,
                }
            }
            source => {
                error!(error = %source, status = status.as_u16(), "{}", self.context);

                ErrorBody {
                    error: self.context.to_string(),
                    details: Some(source.to_string()),
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::body::to_bytes;
    use serde_json::{Value, json};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::{
        Layer,
        layer::{Context, SubscriberExt},
    };

    use super::*;

    #[derive(Clone, Default)]
    struct Levels(Arc<Mutex<Vec<Level>>>);

    impl<S: Subscriber> Layer<S> for Levels {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }
    }

    fn logged_levels(err: RouteError) -> Vec<Level> {
        let levels = Levels::default();
        let subscriber = tracing_subscriber::registry().with(levels.clone());

        tracing::subscriber::with_default(subscriber, || {
            err.into_response();
        });

        levels.0.lock().unwrap().clone()
    }

    async fn render(err: RouteError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn client_input_has_no_details() {
        let err = AppError::ClientInput(MISSING_JOB_ID);
        let (status, body) = render(err.context("status check failed")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "missing jobId parameter" }));
    }

    #[tokio::test]
    async fn unavailable_keeps_underlying_message() {
        let err = AppError::UpstreamUnavailable("connection refused".to_string());
        let (status, body) = render(err.context("banner generation failed")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "error": "banner generation failed", "details": "connection refused" })
        );
    }

    #[tokio::test]
    async fn rejected_maps_to_bad_gateway() {
        let (status, body) = render(AppError::rejected(404).context("status check failed")).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["details"], "Request failed with status code 404");
    }

    #[test]
    fn malformed_payload_is_a_client_error() {
        let err = AppError::MalformedPayload("expected value at line 1 column 1".to_string());

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn every_failure_is_logged() {
        let missing = logged_levels(AppError::ClientInput(MISSING_JOB_ID).context("status check failed"));
        assert_eq!(missing, vec![Level::WARN]);

        let down = logged_levels(
            AppError::UpstreamUnavailable("connection refused".to_string())
                .context("banner generation failed"),
        );
        assert_eq!(down, vec![Level::ERROR]);
    }
}
