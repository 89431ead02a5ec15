//! Weather aggregation — the cache → live → degraded fallback chain.
//!
//! One request makes at most four sequential upstream calls (locate,
//! lookup, now, hourly) plus an optional advice completion. Every
//! failure is absorbed: weather-critical failures produce a degraded
//! payload, non-critical ones (hourly, advice) fall back silently.

use crate::advice;
use crate::api::{
    ResponsePayload, WeatherReading, DEGRADED_READING, SOURCE_DEGRADED, SOURCE_LIVE, UNKNOWN_CITY,
};
use crate::cache::{CacheStore, CACHE_TTL};
use crate::upstream::{UpstreamError, UpstreamOperations};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use std::time::Duration;

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Orchestrates city resolution, cache checks, weather fetches and
/// advice generation. Generic over the upstream boundary, with an
/// injected cache, so tests can substitute both.
pub struct WeatherAggregator<U: UpstreamOperations> {
    upstreams: U,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl<U: UpstreamOperations> WeatherAggregator<U> {
    pub fn new(upstreams: U, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            upstreams,
            cache,
            ttl: CACHE_TTL,
        }
    }

    /// Override the cache TTL (staleness tests).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn upstreams(&self) -> &U {
        &self.upstreams
    }

    /// Produce a payload for an optional explicit city and a client IP.
    ///
    /// Never fails: any fatal upstream error degrades to a fixed
    /// payload annotated with `source:"degraded"` and the error text.
    pub async fn fetch(&self, explicit_city: Option<&str>, client_ip: &str) -> ResponsePayload {
        let input_city = explicit_city.unwrap_or("").trim();

        match self.live(input_city, client_ip).await {
            Ok(payload) => payload,
            Err((resolved_city, error)) => {
                log::warn!("weather lookup degraded ({resolved_city:?}): {error}");
                degraded_payload(resolved_city, &error)
            }
        }
    }

    /// The live path. Errors carry the city resolved so far, which the
    /// degraded payload reports.
    async fn live(
        &self,
        input_city: &str,
        client_ip: &str,
    ) -> std::result::Result<ResponsePayload, (String, UpstreamError)> {
        let mut resolved = input_city.to_string();
        if resolved.is_empty() {
            match self.upstreams.locate_ip(client_ip).await {
                Ok(location) => resolved = location.city,
                Err(e) => return Err((resolved, e)),
            }
        }

        if let Some(entry) = self.cache.get(&resolved) {
            if entry.is_fresh(self.ttl) {
                log::debug!("cache hit for {resolved}");
                let mut payload = entry.payload;
                payload.cached = true;
                return Ok(payload);
            }
        }

        let location = match self.upstreams.city_lookup(&resolved).await {
            Ok(location) => location,
            Err(e) => return Err((resolved, e)),
        };
        let now = match self.upstreams.weather_now(&location.id).await {
            Ok(now) => now,
            Err(e) => return Err((resolved, e)),
        };
        // Hourly failure is non-fatal; probability defaults to 0.
        let precip_probability = match self.upstreams.precip_probability(&location.id).await {
            Ok(p) => p,
            Err(e) => {
                log::debug!("hourly forecast unavailable: {e}");
                0.0
            }
        };

        let weather = WeatherReading {
            temp: now.temp,
            humidity: now.humidity,
            precip_probability,
            wind_scale: now.wind_scale,
        };

        let advice = match self.upstreams.advice(&resolved, &weather).await {
            Ok(items) if !items.is_empty() => items,
            Ok(_) => advice::fallback_advice(&weather),
            Err(e) => {
                log::debug!("completion advice unavailable: {e}");
                advice::fallback_advice(&weather)
            }
        };

        let payload = ResponsePayload {
            city: resolved.clone(),
            qweather_location: Some(location),
            weather,
            advice,
            source: SOURCE_LIVE.to_string(),
            timestamp: now_rfc3339(),
            cached: false,
            error: None,
        };
        self.cache.put(&resolved, payload.clone());
        Ok(payload)
    }
}

/// Fixed placeholder payload for a failed live path. Never cached.
fn degraded_payload(resolved_city: String, error: &UpstreamError) -> ResponsePayload {
    let city = if resolved_city.is_empty() {
        UNKNOWN_CITY.to_string()
    } else {
        resolved_city
    };
    ResponsePayload {
        city,
        qweather_location: None,
        weather: DEGRADED_READING,
        advice: advice::fallback_advice(&DEGRADED_READING),
        source: SOURCE_DEGRADED.to_string(),
        timestamp: now_rfc3339(),
        cached: false,
        error: Some(error.to_string()),
    }
}
