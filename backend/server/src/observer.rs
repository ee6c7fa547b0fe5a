//! # Error Observation
//!
//! One place where every uncaught failure ends up in the log.
//!
//! ## Server
//! - [`install`] swaps in a panic hook that reports through `tracing`, then hands
//!   over to whatever hook was there before
//! - Runs once per process, later calls are no-ops
//! - Panics inside handlers never reach the client as a dropped connection, see
//!   [`panic_response`]
//!
//! ## Browser
//! - The page layout ships a script registering `error` and `unhandledrejection`
//!   listeners, guarded by a window flag so a second mount does nothing
//! - Each event is posted to `/api/logs` as a [`ClientLog`]
use std::{any::Any, panic, sync::Once};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::ErrorBody;

static INSTALL_ONCE: Once = Once::new();

/// Returns `true` only for the call that actually registered the hook.
pub fn install() -> bool {
    let mut registered = false;

    INSTALL_ONCE.call_once(|| {
        let previous = panic::take_hook();

        panic::set_hook(Box::new(move |panic_info| {
            let location = panic_info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_else(|| "unknown".to_string());

            error!(
                location = %location,
                message = %panic_message(panic_info.payload()),
                "Uncaught panic"
            );

            previous(panic_info);
        }));

        registered = true;
    });

    if registered {
        info!("Global error observer installed");
    }

    registered
}

pub fn is_installed() -> bool {
    INSTALL_ONCE.is_completed()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Used by the catch-panic layer so a panicking handler still answers in JSON.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let body = ErrorBody {
        error: "internal server error".to_string(),
        details: Some(panic_message(&*payload)),
    };

    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

#[derive(Deserialize, Debug)]
pub struct ClientInfo {
    #[serde(rename = "userAgent")]
    pub user_agent: Option<String>,
    pub url: Option<String>,
    pub referrer: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ClientLog {
    pub timestamp: Option<String>,
    pub level: String,
    pub category: String,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub client: Option<ClientInfo>,
}

pub fn record_client_log(report: &ClientLog) {
    let timestamp = report.timestamp.as_deref().unwrap_or("-");
    let url = report
        .client
        .as_ref()
        .and_then(|c| c.url.as_deref())
        .unwrap_or("-");
    let user_agent = report
        .client
        .as_ref()
        .and_then(|c| c.user_agent.as_deref())
        .unwrap_or("-");
    let data = report
        .data
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_default();

    match report.level.to_ascii_lowercase().as_str() {
        "debug" => debug!(target: "client", %timestamp, %url, %user_agent, %data, "[{}] {}", report.category, report.message),
        "info" => info!(target: "client", %timestamp, %url, %user_agent, %data, "[{}] {}", report.category, report.message),
        "warn" => warn!(target: "client", %timestamp, %url, %user_agent, %data, "[{}] {}", report.category, report.message),
        _ => error!(target: "client", %timestamp, %url, %user_agent, %data, "[{}] {}", report.category, report.message),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    #[test]
    fn install_is_idempotent() {
        install();

        assert!(!install());
        assert!(!install());
        assert!(is_installed());
    }

    #[test]
    fn panic_messages_are_extracted() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&"owned".to_string()), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic payload");
    }

    #[tokio::test]
    async fn panic_response_is_json() {
        let response = panic_response(Box::new("handler exploded"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["error"], "internal server error");
        assert_eq!(body["details"], "handler exploded");
    }

    #[test]
    fn client_log_accepts_browser_shape() {
        let raw = r#"{
            "timestamp": "2024-01-01T00:00:00.000Z",
            "level": "error",
            "category": "global error",
            "message": "Uncaught error: x is undefined",
            "data": { "location": "app.js:1:2" },
            "client": { "userAgent": "test", "url": "http://localhost/create", "referrer": "" }
        }"#;

        let report: ClientLog = serde_json::from_str(raw).unwrap();
        assert_eq!(report.category, "global error");
        assert_eq!(
            report.client.and_then(|c| c.user_agent),
            Some("test".to_string())
        );

        record_client_log(&serde_json::from_str(raw).unwrap());
    }
}
