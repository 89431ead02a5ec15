//! Integration tests for the HTTP surface.
//!
//! Binds the router with mock (or key-less live) upstreams on an
//! ephemeral port and drives it with reqwest: degraded aggregation,
//! CORS preflight, method filtering, caching, and the generate
//! endpoint's status codes.

use brolly::aggregator::WeatherAggregator;
use brolly::cache::MemoryCache;
use brolly::config::EdgeConfig;
use brolly::http_server::{create_router, AppState};
use brolly::upstream::mock::MockUpstreams;
use brolly::upstream::{LiveUpstreams, UpstreamOperations};
use std::sync::Arc;

// ── Test harness ─────────────────────────────────────────────────────

/// Harness that serves the router on an ephemeral localhost port.
struct TestServer {
    base: String,
    client: reqwest::Client,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start<U: UpstreamOperations>(upstreams: U, config: EdgeConfig) -> anyhow::Result<Self> {
        let aggregator = WeatherAggregator::new(upstreams, Arc::new(MemoryCache::new()));
        let state = Arc::new(AppState { aggregator, config });
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            _handle: handle,
        })
    }

    async fn start_mock(mock: MockUpstreams) -> anyhow::Result<Self> {
        Self::start(mock, EdgeConfig::default()).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

// ── /api/weather ─────────────────────────────────────────────────────

#[tokio::test]
async fn weather_live_path_succeeds() -> anyhow::Result<()> {
    let server = TestServer::start_mock(MockUpstreams::healthy()).await?;

    let response = server
        .client
        .get(server.url("/api/weather?city=杭州"))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["city"], "杭州");
    assert_eq!(body["source"], "qweather");
    assert_eq!(body["cached"], false);
    assert_eq!(body["weather"]["temp"], 28.0);
    assert_eq!(body["weather"]["precipProbability"], 40.0);
    assert_eq!(body["qweatherLocation"]["id"], "101210101");
    assert!(body.get("error").is_none());
    Ok(())
}

#[tokio::test]
async fn weather_repeat_request_is_cached() -> anyhow::Result<()> {
    let server = TestServer::start_mock(MockUpstreams::healthy()).await?;

    let first: serde_json::Value = server
        .client
        .get(server.url("/api/weather?city=杭州"))
        .send()
        .await?
        .json()
        .await?;
    let second: serde_json::Value = server
        .client
        .get(server.url("/api/weather?city=杭州"))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(first["cached"], false);
    assert_eq!(second["cached"], true);
    assert_eq!(second["weather"], first["weather"]);
    assert_eq!(second["advice"], first["advice"]);
    Ok(())
}

#[tokio::test]
async fn weather_degrades_to_200_with_error_annotation() -> anyhow::Result<()> {
    // All upstreams down: the HTTP status still never reflects failure
    let server = TestServer::start_mock(MockUpstreams::default()).await?;

    let response = server
        .client
        .get(server.url("/api/weather?city="))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["city"], "未知城市");
    assert_eq!(body["source"], "degraded");
    assert_eq!(body["weather"]["temp"], 20.0);
    assert_eq!(body["weather"]["humidity"], 50.0);
    assert_eq!(body["weather"]["precipProbability"], 20.0);
    assert_eq!(body["weather"]["windScale"], 3.0);
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    Ok(())
}

#[tokio::test]
async fn weather_missing_credentials_degrade() -> anyhow::Result<()> {
    let config = EdgeConfig::default();
    let server = TestServer::start(LiveUpstreams::new(&config), config).await?;

    let body: serde_json::Value = server
        .client
        .get(server.url("/api/weather?city=杭州"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["source"], "degraded");
    assert_eq!(body["error"], "Missing QWEATHER_API_KEY");
    Ok(())
}

#[tokio::test]
async fn weather_preflight_is_204_no_body() -> anyhow::Result<()> {
    let server = TestServer::start_mock(MockUpstreams::healthy()).await?;

    let response = server
        .client
        .request(reqwest::Method::OPTIONS, server.url("/api/weather"))
        .send()
        .await?;
    assert_eq!(response.status(), 204);
    assert!(response.text().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn weather_rejects_other_methods() -> anyhow::Result<()> {
    let server = TestServer::start_mock(MockUpstreams::healthy()).await?;

    let response = server
        .client
        .post(server.url("/api/weather"))
        .send()
        .await?;
    assert_eq!(response.status(), 405);
    Ok(())
}

// ── /api/generate ────────────────────────────────────────────────────

#[tokio::test]
async fn generate_returns_content() -> anyhow::Result<()> {
    let server = TestServer::start_mock(MockUpstreams::healthy()).await?;

    let response = server
        .client
        .post(server.url("/api/generate"))
        .json(&serde_json::json!({"prompt": "下雨"}))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["content"], "出门带伞");
    assert!(body.get("meta").is_none());
    Ok(())
}

#[tokio::test]
async fn generate_debug_mode_attaches_meta() -> anyhow::Result<()> {
    let server = TestServer::start_mock(MockUpstreams::healthy()).await?;

    let body: serde_json::Value = server
        .client
        .get(server.url("/api/generate?prompt=下雨&debug=1"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["content"], "出门带伞");
    assert_eq!(body["meta"]["ok"], true);
    assert_eq!(body["meta"]["status"], 200);
    assert_eq!(body["meta"]["input_len"], 2);
    assert!(body["meta"]["latency_ms"].is_u64());
    assert!(body["meta"]["endpoint"].as_str().is_some());
    Ok(())
}

#[tokio::test]
async fn generate_missing_prompt_is_400() -> anyhow::Result<()> {
    let server = TestServer::start_mock(MockUpstreams::healthy()).await?;

    let response = server
        .client
        .get(server.url("/api/generate"))
        .send()
        .await?;
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["content"], "请输入关键词");
    Ok(())
}

#[tokio::test]
async fn generate_missing_key_is_500() -> anyhow::Result<()> {
    let config = EdgeConfig::default();
    let server = TestServer::start(LiveUpstreams::new(&config), config).await?;

    let response = server
        .client
        .get(server.url("/api/generate?prompt=下雨"))
        .send()
        .await?;
    assert_eq!(response.status(), 500);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["content"], "未配置API Key，请在Pages控制台设置环境变量");
    Ok(())
}

#[tokio::test]
async fn generate_upstream_failure_is_500_with_message() -> anyhow::Result<()> {
    let mock = MockUpstreams {
        completion: None,
        ..MockUpstreams::healthy()
    };
    let server = TestServer::start_mock(mock).await?;

    let response = server
        .client
        .get(server.url("/api/generate?prompt=下雨"))
        .send()
        .await?;
    assert_eq!(response.status(), 500);

    let body: serde_json::Value = response.json().await?;
    assert!(body["content"]
        .as_str()
        .is_some_and(|c| c.starts_with("生成失败：")));
    Ok(())
}

// ── Static shell ─────────────────────────────────────────────────────

#[tokio::test]
async fn shell_and_service_worker_are_served() -> anyhow::Result<()> {
    let server = TestServer::start_mock(MockUpstreams::healthy()).await?;

    let index = server.client.get(server.url("/")).send().await?;
    assert_eq!(index.status(), 200);
    assert!(index
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html")));

    let worker = server
        .client
        .get(server.url("/service-worker.js"))
        .send()
        .await?;
    assert_eq!(worker.status(), 200);
    assert!(worker.text().await?.contains("DATA_CACHE"));

    let missing = server.client.get(server.url("/nope.js")).send().await?;
    assert_eq!(missing.status(), 404);
    Ok(())
}

#[tokio::test]
async fn health_endpoint_answers_ok() -> anyhow::Result<()> {
    let server = TestServer::start_mock(MockUpstreams::healthy()).await?;

    let response = server.client.get(server.url("/health")).send().await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "ok");
    Ok(())
}
