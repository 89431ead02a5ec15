//! HTTP surface — weather aggregation, copy generation, embedded shell.
//!
//! `/api/weather` always answers 200 with a payload; only `source` and
//! `error` communicate failure. `/api/generate` surfaces HTTP error
//! codes instead. Everything else is the embedded browser shell.

use crate::aggregator::WeatherAggregator;
use crate::api::ResponsePayload;
use crate::config::EdgeConfig;
use crate::upstream::{spark, UpstreamError, UpstreamOperations};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

/// Embedded browser shell (UI + offline service worker).
#[derive(RustEmbed)]
#[folder = "web/"]
struct Assets;

/// Shared state for HTTP handlers.
pub struct AppState<U: UpstreamOperations> {
    pub aggregator: WeatherAggregator<U>,
    pub config: EdgeConfig,
}

/// Query params for the weather endpoint.
#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub city: Option<String>,
}

/// Query params for the generate endpoint.
#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub debug: Option<String>,
}

/// JSON body for `POST /api/generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Debug metadata attached to generate responses in debug mode.
#[derive(Debug, Serialize)]
pub struct GenerateMeta {
    pub ok: bool,
    pub status: u16,
    pub latency_ms: u64,
    pub endpoint: String,
    pub input_len: usize,
    pub raw_sample: String,
}

/// Response body for `/api/generate`.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<GenerateMeta>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Best-effort client IP from the usual proxy headers.
///
/// `x-forwarded-for` (first entry) wins, then `x-real-ip`,
/// `cf-connecting-ip`, and finally RFC 7239 `Forwarded: for=`.
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(xff) = header_str(headers, "x-forwarded-for") {
        if let Some(first) = xff.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real) = header_str(headers, "x-real-ip") {
        return real.trim().to_string();
    }
    if let Some(cf) = header_str(headers, "cf-connecting-ip") {
        return cf.trim().to_string();
    }
    if let Some(forwarded) = header_str(headers, "forwarded") {
        for part in forwarded.split(';') {
            if let Some(value) = part.trim().strip_prefix("for=") {
                return value
                    .trim_matches(|c| c == '[' || c == ']' || c == '"')
                    .to_string();
            }
        }
    }
    String::new()
}

/// GET /api/weather - aggregated weather payload.
///
/// 200 on both the live and degraded paths; the status code never
/// reflects failure.
async fn get_weather<U: UpstreamOperations>(
    State(state): State<Arc<AppState<U>>>,
    Query(query): Query<WeatherQuery>,
    headers: HeaderMap,
) -> Json<ResponsePayload> {
    let ip = client_ip(&headers);
    Json(state.aggregator.fetch(query.city.as_deref(), &ip).await)
}

/// OPTIONS /api/weather - CORS preflight, 204 with no body.
async fn weather_preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// GET /api/generate?prompt= - generation via query parameters.
async fn generate_get<U: UpstreamOperations>(
    State(state): State<Arc<AppState<U>>>,
    Query(query): Query<GenerateQuery>,
) -> Response {
    let debug = is_debug(&state.config, &query);
    run_generate(&state, query.prompt, debug).await
}

/// POST /api/generate - generation with a JSON `{prompt}` body.
async fn generate_post<U: UpstreamOperations>(
    State(state): State<Arc<AppState<U>>>,
    Query(query): Query<GenerateQuery>,
    Json(body): Json<GenerateBody>,
) -> Response {
    let debug = is_debug(&state.config, &query);
    run_generate(&state, body.prompt, debug).await
}

fn is_debug(config: &EdgeConfig, query: &GenerateQuery) -> bool {
    config.generate_debug || query.debug.as_deref() == Some("1")
}

fn generate_reply(status: StatusCode, content: String, meta: Option<GenerateMeta>) -> Response {
    (status, Json(GenerateResponse { content, meta })).into_response()
}

async fn run_generate<U: UpstreamOperations>(
    state: &AppState<U>,
    prompt: Option<String>,
    debug: bool,
) -> Response {
    let prompt = prompt.map(|p| p.trim().to_string()).unwrap_or_default();
    if prompt.is_empty() {
        return generate_reply(StatusCode::BAD_REQUEST, "请输入关键词".to_string(), None);
    }

    let started = Instant::now();
    match state.aggregator.upstreams().generate(&prompt).await {
        Ok(completion) => {
            let meta = debug.then(|| GenerateMeta {
                ok: true,
                status: completion.status,
                latency_ms: started.elapsed().as_millis() as u64,
                endpoint: completion.endpoint.to_string(),
                input_len: prompt.chars().count(),
                raw_sample: completion.raw_sample,
            });
            generate_reply(StatusCode::OK, completion.content, meta)
        }
        Err(UpstreamError::MissingKey(_)) => generate_reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            "未配置API Key，请在Pages控制台设置环境变量".to_string(),
            None,
        ),
        Err(error) => {
            let status = match &error {
                UpstreamError::Api { status, .. } => *status,
                _ => 0,
            };
            let meta = debug.then(|| GenerateMeta {
                ok: false,
                status,
                latency_ms: started.elapsed().as_millis() as u64,
                endpoint: spark::API_URL.to_string(),
                input_len: prompt.chars().count(),
                raw_sample: String::new(),
            });
            generate_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("生成失败：{error}"),
                meta,
            )
        }
    }
}

/// GET /health - health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}

/// Static shell handler: serve embedded files with MIME types.
async fn static_handler(uri: Uri) -> Response {
    let mut path = uri.path().trim_start_matches('/');
    if path.is_empty() {
        path = "index.html";
    }
    match Assets::get(path) {
        Some(file) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.as_ref())],
                file.data.into_owned(),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Create the HTTP router.
pub fn create_router<U: UpstreamOperations>(state: Arc<AppState<U>>) -> Router {
    // Mirror the original edge function's permissive CORS headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/weather",
            get(get_weather::<U>).options(weather_preflight),
        )
        .route(
            "/api/generate",
            get(generate_get::<U>).post(generate_post::<U>),
        )
        .fallback(static_handler)
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP server until the shutdown signal fires.
pub async fn run_http_server<U: UpstreamOperations>(
    state: Arc<AppState<U>>,
    port: u16,
    mut shutdown: watch::Receiver<()>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    log::info!("HTTP server listening on port {}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.changed().await.ok();
        })
        .await?;

    Ok(())
}
