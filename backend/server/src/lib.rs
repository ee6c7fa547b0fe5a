//! Documentation of the AutoYouBanner frontend server.
//!
//! Renders the banner creation page and proxies every banner request to the
//! Backend Job Service, which does the actual image generation.
//!
//!
//!
//! # General Infrastructure
//! - User opens `/create` and fills in the banner form
//! - Form posts to `/api/banner`, we forward to the Backend Job Service and hand back its job id
//! - Page polls `/api/banner/{jobId}` every 2 seconds until the job is `completed` or `failed`
//! - Backend Job Service is expected on `http://localhost:5000` unless `BACKEND_BASE_URL` says otherwise
//!
//!
//!
//! # Routes
//!
//! | Route                                  | Method    | Notes                                      |
//! |----------------------------------------|-----------|--------------------------------------------|
//! | `/`                                    | GET       | Redirects to `/create`                     |
//! | `/create`                              | GET       | Banner creation page                       |
//! | `/api/banner`                          | POST      | Submit a banner job, body passed through   |
//! | `/api/banner/{jobId}`                  | GET       | Job status, body passed through            |
//! | `/api/stablediffusion/generate`        | POST      | Background image job, body passed through  |
//! | `/api/stablediffusion/img2img`         | POST      | Image-to-image job, body passed through    |
//! | `/api/stablediffusion/status/{jobId}`  | GET       | Image job status, body passed through      |
//! | `/api/upload`                          | POST      | Multipart `image` field, 20 MiB at most    |
//! | `/api/test`                            | GET, HEAD | Liveness of this server only               |
//! | `/api/test-backend`                    | GET       | Liveness of the Backend Job Service        |
//! | `/api/debug`                           | GET, POST | Environment info, request echo             |
//! | `/api/logs`                            | POST      | Error reports from the browser             |
//!
//!
//!
//! # Errors
//!
//! Failures never leave a handler as anything but JSON.
//! - `{ "error": "missing jobId parameter" }` or `{ "error": "no file received" }`, 400,
//!   nothing is forwarded
//! - `{ "error": <route message>, "details": <cause> }` otherwise
//! - 400 for an unparseable request body
//! - 500 when the Backend Job Service can't be reached, `details` is the transport error as is
//! - 502 when it answers with a non-2xx status or a body that isn't JSON
//!
//!
//!
//! # Notes
//!
//! ## Stateless
//! Nothing is cached or stored. Two identical status polls are two upstream calls and get
//! whatever the Backend Job Service says each time. Job expiry is its business too.
//!
//! ## Payload validation
//! The banner request body is not checked against any schema here. The Backend Job Service
//! owns that contract, duplicating it would only drift.
//!
//!
//!
//! # Setup
//!
//! Run locally.
//! ```sh
//! RUST_LOG=info BACKEND_BASE_URL=http://localhost:5000 cargo run -p autobanner
//! ```
//!
//! Smoke test.
//! ```sh
//! curl -I http://localhost:3000/api/test
//! curl http://localhost:3000/api/banner/abc123
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use tokio::{net::TcpListener, signal::ctrl_c};
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod backend;
pub mod components;
pub mod config;
pub mod error;
pub mod observer;
pub mod pages;
pub mod routes;
pub mod state;

use config::Config;
use pages::{create_handler, index_handler};
use routes::{
    UPLOAD_BODY_LIMIT, debug_echo_handler, debug_handler, generate_handler, image_generate_handler,
    image_status_handler, img2img_handler, logs_handler, missing_image_job_handler,
    missing_job_handler, status_handler, test_backend_handler, test_handler, test_head_handler,
    upload_handler,
};
use state::State;

pub async fn start_server() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    observer::install();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config)?;

    info!("Proxying banner requests to {}", state.config.backend_base_url);

    let app = app(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

pub fn app(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(index_handler))
        .route("/create", get(create_handler))
        .route("/api/banner", post(generate_handler))
        .route("/api/banner/", get(missing_job_handler))
        .route("/api/banner/{job_id}", get(status_handler))
        .route("/api/stablediffusion/generate", post(image_generate_handler))
        .route("/api/stablediffusion/img2img", post(img2img_handler))
        .route("/api/stablediffusion/status/", get(missing_image_job_handler))
        .route("/api/stablediffusion/status/{job_id}", get(image_status_handler))
        .route(
            "/api/upload",
            post(upload_handler).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/test", get(test_handler).head(test_head_handler))
        .route("/api/test-backend", get(test_backend_handler))
        .route("/api/debug", get(debug_handler).post(debug_echo_handler))
        .route("/api/logs", post(logs_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(observer::panic_response))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
