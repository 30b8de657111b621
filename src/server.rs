use crate::codec::SUPPORTED_FORMATS;
use crate::config::Config;
use crate::engine::{EnhancedPage, Enhancer};
use crate::error::EnhanceError;
use crate::preprocessing::PipelineParams;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Upper bound on pages accepted by one batch request
pub const MAX_BATCH_PAGES: usize = 32;

/// Room for multipart boundaries and part headers on top of the file bytes
const MULTIPART_OVERHEAD: usize = 16 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub enhancer: Arc<Enhancer>,
    pub config: Arc<Config>,
}

/// Batch response, pages in upload order
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub pages: Vec<EnhancedPage>,
    pub processing_time_ms: u64,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub supported_formats: Vec<String>,
    pub max_file_size_bytes: usize,
    pub max_batch_pages: usize,
    pub page_timeout_secs: Option<u64>,
    pub params: PipelineParams,
}

/// One uploaded page
struct Upload {
    data: Vec<u8>,
    mime: String,
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let enhancer = Enhancer::new(config.params)?;
    let addr = format!("{}:{}", config.host, config.port);
    let single_limit = single_body_limit(config.max_file_size);
    let batch_limit = batch_body_limit(config.max_file_size);

    let state = AppState {
        enhancer: Arc::new(enhancer),
        config: Arc::new(config),
    };

    let app = Router::new()
        .route(
            "/enhance",
            post(handle_enhance).layer(DefaultBodyLimit::max(single_limit)),
        )
        .route(
            "/enhance/batch",
            post(handle_batch).layer(DefaultBodyLimit::max(batch_limit)),
        )
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn single_body_limit(max_file_size: usize) -> usize {
    max_file_size.saturating_add(MULTIPART_OVERHEAD)
}

fn batch_body_limit(max_file_size: usize) -> usize {
    max_file_size
        .saturating_mul(MAX_BATCH_PAGES)
        .saturating_add(MULTIPART_OVERHEAD)
}

/// Handle single-page enhancement requests
async fn handle_enhance(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<EnhancedPage>, EnhanceError> {
    let max_file_size = state.config.max_file_size;
    let mut uploads =
        read_uploads(multipart, max_file_size, single_body_limit(max_file_size)).await?;

    if uploads.len() > 1 {
        return Err(EnhanceError::InvalidRequest(format!(
            "{} files uploaded; use /enhance/batch for multiple pages",
            uploads.len()
        )));
    }
    let upload = uploads.pop().ok_or(EnhanceError::MissingFile)?;

    let page = enhance_page(&state, upload).await?;
    Ok(Json(page))
}

/// Handle multi-page requests; pages run one after another in upload order
async fn handle_batch(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<BatchResponse>, EnhanceError> {
    let start = Instant::now();
    let max_file_size = state.config.max_file_size;
    let uploads = read_uploads(multipart, max_file_size, batch_body_limit(max_file_size)).await?;

    if uploads.is_empty() {
        return Err(EnhanceError::MissingFile);
    }
    if uploads.len() > MAX_BATCH_PAGES {
        return Err(EnhanceError::InvalidRequest(format!(
            "{} pages uploaded (max: {})",
            uploads.len(),
            MAX_BATCH_PAGES
        )));
    }

    let total = uploads.len();
    let mut pages = Vec::with_capacity(total);
    for (index, upload) in uploads.into_iter().enumerate() {
        match enhance_page(&state, upload).await {
            Ok(page) => pages.push(page),
            Err(e) => {
                tracing::error!("Batch aborted at page {} of {}: {}", index + 1, total, e);
                return Err(EnhanceError::BatchFailed {
                    page: index + 1,
                    total,
                });
            }
        }
    }

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!("Batch of {} pages completed in {}ms", total, processing_time_ms);

    Ok(Json(BatchResponse {
        pages,
        processing_time_ms,
    }))
}

/// Collect every `file` field of the form
///
/// Fields are read chunk by chunk so an oversized page is rejected as soon as
/// it crosses `max_file_size`.
async fn read_uploads(
    mut multipart: Multipart,
    max_file_size: usize,
    body_limit: usize,
) -> Result<Vec<Upload>, EnhanceError> {
    let mut uploads = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, body_limit, "Failed to parse multipart"))?
    {
        if field.name() != Some("file") {
            // Ignore unknown fields
            continue;
        }

        let mime = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, body_limit, "Failed to read file data"))?
        {
            data.extend_from_slice(&chunk);
            if data.len() > max_file_size {
                return Err(EnhanceError::ImageTooLarge {
                    size: data.len(),
                    max: max_file_size,
                });
            }
        }

        if !SUPPORTED_FORMATS.contains(&mime.as_str()) {
            tracing::warn!("Received file with content type: {}", mime);
        }

        uploads.push(Upload { data, mime });
    }

    Ok(uploads)
}

fn multipart_error(e: MultipartError, body_limit: usize, context: &str) -> EnhanceError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        EnhanceError::BodyTooLarge(body_limit)
    } else {
        EnhanceError::InvalidRequest(format!("{}: {}", context, e))
    }
}

/// Run one page on the blocking pool, bounded by the configured timeout
///
/// A timed-out page keeps running to completion in the background; only its
/// result is discarded.
async fn enhance_page(state: &AppState, upload: Upload) -> Result<EnhancedPage, EnhanceError> {
    let enhancer = Arc::clone(&state.enhancer);
    let task =
        tokio::task::spawn_blocking(move || enhancer.enhance(&upload.data, &upload.mime));

    let joined = match state.config.page_timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), task)
            .await
            .map_err(|_| EnhanceError::Timeout(secs))?,
        None => task.await,
    };

    joined.map_err(|e| EnhanceError::Internal(format!("Enhancement task failed: {}", e)))?
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        supported_formats: SUPPORTED_FORMATS.iter().map(|s| s.to_string()).collect(),
        max_file_size_bytes: state.config.max_file_size,
        max_batch_pages: MAX_BATCH_PAGES,
        page_timeout_secs: state.config.page_timeout_secs,
        params: *state.enhancer.params(),
    })
}
