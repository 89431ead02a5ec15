//! Spark MaaS chat-completion client (OpenAI-compatible wire format).
//!
//! Serves both the weather advice path (system prompt enforcing the
//! 50/30 character budget) and the `/api/generate` endpoint.

use super::{Completion, Result, UpstreamError};
use crate::advice;
use crate::api::WeatherReading;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Spark MaaS chat completions endpoint.
pub const API_URL: &str = "https://maas-api.cn-huabei-1.xf-yun.com/v1/chat/completions";

const MODEL: &str = "general";
const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 120;
const TIMEOUT: Duration = Duration::from_secs(10);

/// How much of the raw body the generate debug meta samples.
const RAW_SAMPLE_CHARS: usize = 200;

/// System instruction for weather advice — enforces the 50/30 budget.
const ADVICE_SYSTEM: &str =
    "请用简洁中文分点输出，总字数≤50，单条≤30；结合温度、降水概率、风力给穿搭与出行建议";

// ── Wire formats ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    output: Option<Output>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Alternate success shape some deployments answer with.
#[derive(Debug, Deserialize)]
struct Output {
    text: Option<String>,
}

fn extract_content(body: &ChatResponse) -> Option<String> {
    body.choices
        .first()
        .and_then(|c| c.message.as_ref())
        .and_then(|m| m.content.clone())
        .or_else(|| body.output.as_ref().and_then(|o| o.text.clone()))
}

// ── Client ───────────────────────────────────────────────────────────

/// Thin client over the Spark MaaS completion endpoint.
#[derive(Debug, Clone)]
pub struct SparkClient {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl SparkClient {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }

    async fn chat(&self, system: Option<&str>, user: &str) -> Result<Completion> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(UpstreamError::MissingKey("AI_SERVERLESS_API_KEY"))?;

        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });

        let body = ChatRequest {
            model: MODEL,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(API_URL)
            .bearer_auth(key)
            .json(&body)
            .timeout(TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Api {
                provider: "Spark MaaS",
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let raw_sample: String = text.chars().take(RAW_SAMPLE_CHARS).collect();
        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| UpstreamError::Malformed {
                provider: "Spark",
                detail: e.to_string(),
            })?;
        let content = extract_content(&parsed).ok_or_else(|| UpstreamError::Malformed {
            provider: "Spark",
            detail: "response format unknown".to_string(),
        })?;

        Ok(Completion {
            content,
            status: status.as_u16(),
            endpoint: API_URL,
            raw_sample,
        })
    }

    /// Localized advice for one city's weather, split on sentence
    /// delimiters and normalized to the character budget. May return an
    /// empty list; the aggregator substitutes rule-based advice then.
    pub async fn advice(&self, city: &str, weather: &WeatherReading) -> Result<Vec<String>> {
        let user = format!(
            "城市:{}; 温度:{}℃; 湿度:{}%; 降水概率:{}%; 风力:{}级; 按规则生成本地化建议",
            city, weather.temp, weather.humidity, weather.precip_probability, weather.wind_scale
        );
        let completion = self.chat(Some(ADVICE_SYSTEM), &user).await?;
        Ok(advice::normalize(advice::split_completion(
            &completion.content,
        )))
    }

    /// One-shot copy generation for `/api/generate`.
    pub async fn generate(&self, prompt: &str) -> Result<Completion> {
        let user = format!("用{prompt}生成一句简短文案，不超过20字，无多余内容");
        self.chat(None, &user).await
    }
}
