//! QWeather clients — city lookup, current conditions, hourly forecast.
//!
//! QWeather reports numbers as JSON strings ("28", "60"); they parse
//! to f64 with a 0.0 default so readings are always present.

use super::{CurrentConditions, Result, UpstreamError};
use crate::api::CityLocation;
use serde::Deserialize;
use std::time::Duration;

const GEO_URL: &str = "https://geoapi.qweather.com/v2/city/lookup";
const NOW_URL: &str = "https://devapi.qweather.com/v7/weather/now";
const HOURLY_URL: &str = "https://devapi.qweather.com/v7/weather/24h";
const TIMEOUT: Duration = Duration::from_secs(8);

fn parse_num(s: &str) -> f64 {
    s.trim().parse().unwrap_or(0.0)
}

// ── Wire formats ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    code: String,
    #[serde(default)]
    location: Vec<CityLocation>,
}

#[derive(Debug, Deserialize)]
struct NowResponse {
    #[serde(default)]
    code: String,
    now: Option<NowBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NowBody {
    #[serde(default)]
    temp: String,
    #[serde(default)]
    humidity: String,
    #[serde(default)]
    wind_scale: String,
}

#[derive(Debug, Deserialize)]
struct HourlyResponse {
    #[serde(default)]
    code: String,
    #[serde(default)]
    hourly: Vec<HourlyBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HourlyBody {
    /// Newer API field; older responses carry `pop` instead.
    precip_prob: Option<String>,
    pop: Option<String>,
}

fn malformed(detail: &str) -> UpstreamError {
    UpstreamError::Malformed {
        provider: "QWeather",
        detail: detail.to_string(),
    }
}

fn first_location(body: LookupResponse) -> Result<CityLocation> {
    if body.code != "200" {
        return Err(malformed(&format!("code {}", body.code)));
    }
    body.location
        .into_iter()
        .next()
        .ok_or_else(|| malformed("city not found"))
}

fn into_conditions(body: NowResponse) -> Result<CurrentConditions> {
    if body.code != "200" {
        return Err(malformed(&format!("code {}", body.code)));
    }
    let now = body.now.ok_or_else(|| malformed("now missing"))?;
    Ok(CurrentConditions {
        temp: parse_num(&now.temp),
        humidity: parse_num(&now.humidity),
        wind_scale: parse_num(&now.wind_scale),
    })
}

fn first_precip_probability(body: HourlyResponse) -> Result<f64> {
    if body.code != "200" {
        return Err(malformed(&format!("code {}", body.code)));
    }
    let hour = body
        .hourly
        .into_iter()
        .next()
        .ok_or_else(|| malformed("hourly empty"))?;
    let raw = hour.precip_prob.or(hour.pop).unwrap_or_default();
    Ok(parse_num(&raw))
}

// ── Client ───────────────────────────────────────────────────────────

/// Thin client over the QWeather geo and weather endpoints.
#[derive(Debug, Clone)]
pub struct QWeatherClient {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl QWeatherClient {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or(UpstreamError::MissingKey("QWEATHER_API_KEY"))
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        url: &'static str,
        location: &str,
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(&[("location", location), ("key", self.key()?)])
            .timeout(TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Api {
                provider: "QWeather",
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    /// Resolve a city name to its first matching QWeather location.
    pub async fn city_lookup(&self, city: &str) -> Result<CityLocation> {
        first_location(self.fetch(GEO_URL, city).await?)
    }

    /// Current conditions by location id.
    pub async fn now(&self, location_id: &str) -> Result<CurrentConditions> {
        into_conditions(self.fetch(NOW_URL, location_id).await?)
    }

    /// Precipitation probability for the next hour.
    pub async fn precip_probability(&self, location_id: &str) -> Result<f64> {
        first_precip_probability(self.fetch(HOURLY_URL, location_id).await?)
    }
}
