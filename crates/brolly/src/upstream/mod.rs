//! Upstream provider adapters — AMap IP locate, QWeather, Spark MaaS.
//!
//! Each adapter is a thin reqwest call plus shape validation. Failures
//! are explicit [`UpstreamError`] values at every boundary; the
//! aggregator branches on them instead of letting anything reach the
//! HTTP response. No retries anywhere — every failure is handled by
//! immediate fallback.

pub mod amap;
pub mod qweather;
pub mod spark;

use crate::api::{CityLocation, WeatherReading};
use crate::config::EdgeConfig;

/// Errors from upstream provider calls.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// A required credential is absent from the environment.
    #[error("Missing {0}")]
    MissingKey(&'static str),

    /// Transport-level failure (connect, timeout, TLS, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success HTTP status.
    #[error("{provider} failed (status {status})")]
    Api { provider: &'static str, status: u16 },

    /// Provider answered 200 with a shape we don't recognize.
    #[error("{provider} response invalid: {detail}")]
    Malformed {
        provider: &'static str,
        detail: String,
    },
}

pub type Result<T> = std::result::Result<T, UpstreamError>;

/// IP geolocation result.
#[derive(Debug, Clone, PartialEq)]
pub struct IpLocation {
    /// Resolved city name (may be empty when AMap cannot locate the IP).
    pub city: String,
    pub adcode: String,
}

/// Current-conditions readings, before the hourly merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentConditions {
    pub temp: f64,
    pub humidity: f64,
    pub wind_scale: f64,
}

/// One chat completion, with the transport details the generate
/// endpoint's debug meta reports.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub status: u16,
    pub endpoint: &'static str,
    pub raw_sample: String,
}

/// Boundary between the aggregator/HTTP layer and the provider HTTP
/// calls, so tests can substitute a mock.
pub trait UpstreamOperations: Send + Sync + 'static {
    /// Resolve a client IP to a city via AMap.
    fn locate_ip(&self, ip: &str) -> impl std::future::Future<Output = Result<IpLocation>> + Send;

    /// Resolve a city name to a QWeather location.
    fn city_lookup(
        &self,
        city: &str,
    ) -> impl std::future::Future<Output = Result<CityLocation>> + Send;

    /// Fetch current conditions by QWeather location id.
    fn weather_now(
        &self,
        location_id: &str,
    ) -> impl std::future::Future<Output = Result<CurrentConditions>> + Send;

    /// Fetch the next hour's precipitation probability.
    fn precip_probability(
        &self,
        location_id: &str,
    ) -> impl std::future::Future<Output = Result<f64>> + Send;

    /// Localized advice for one city's weather, already normalized.
    fn advice(
        &self,
        city: &str,
        weather: &WeatherReading,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// One-shot copy generation for `/api/generate`.
    fn generate(&self, prompt: &str)
        -> impl std::future::Future<Output = Result<Completion>> + Send;
}

/// Real providers behind a shared reqwest client.
#[derive(Debug, Clone)]
pub struct LiveUpstreams {
    amap: amap::AmapClient,
    qweather: qweather::QWeatherClient,
    spark: spark::SparkClient,
}

impl LiveUpstreams {
    pub fn new(config: &EdgeConfig) -> Self {
        let client = reqwest::Client::new();
        Self {
            amap: amap::AmapClient::new(client.clone(), config.amap_key.clone()),
            qweather: qweather::QWeatherClient::new(client.clone(), config.qweather_key.clone()),
            spark: spark::SparkClient::new(client, config.completion_key.clone()),
        }
    }
}

impl UpstreamOperations for LiveUpstreams {
    async fn locate_ip(&self, ip: &str) -> Result<IpLocation> {
        self.amap.locate_ip(ip).await
    }

    async fn city_lookup(&self, city: &str) -> Result<CityLocation> {
        self.qweather.city_lookup(city).await
    }

    async fn weather_now(&self, location_id: &str) -> Result<CurrentConditions> {
        self.qweather.now(location_id).await
    }

    async fn precip_probability(&self, location_id: &str) -> Result<f64> {
        self.qweather.precip_probability(location_id).await
    }

    async fn advice(&self, city: &str, weather: &WeatherReading) -> Result<Vec<String>> {
        self.spark.advice(city, weather).await
    }

    async fn generate(&self, prompt: &str) -> Result<Completion> {
        self.spark.generate(prompt).await
    }
}

// ── Mock upstreams for tests ─────────────────────────────────────────

pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned upstream responses for aggregator and router tests.
    ///
    /// Any `None` field makes the corresponding call fail, which is how
    /// tests drive the degraded and fallback paths.
    #[derive(Debug, Default)]
    pub struct MockUpstreams {
        pub ip_city: Option<String>,
        pub location: Option<CityLocation>,
        pub now: Option<CurrentConditions>,
        pub precip: Option<f64>,
        pub advice: Option<Vec<String>>,
        pub completion: Option<String>,
        /// Number of city lookups performed (cache-hit assertions).
        pub lookup_calls: AtomicUsize,
    }

    impl MockUpstreams {
        /// A mock with every provider healthy for city "杭州".
        pub fn healthy() -> Self {
            Self {
                ip_city: Some("杭州".to_string()),
                location: Some(CityLocation {
                    id: "101210101".to_string(),
                    name: "杭州".to_string(),
                    lat: "30.24603".to_string(),
                    lon: "120.21055".to_string(),
                    adm2: "杭州".to_string(),
                    adm1: "浙江省".to_string(),
                }),
                now: Some(CurrentConditions {
                    temp: 28.0,
                    humidity: 60.0,
                    wind_scale: 4.0,
                }),
                precip: Some(40.0),
                advice: Some(vec!["出门带伞".to_string()]),
                completion: Some("出门带伞".to_string()),
                lookup_calls: AtomicUsize::new(0),
            }
        }

        fn unavailable<T>(provider: &'static str) -> Result<T> {
            Err(UpstreamError::Malformed {
                provider,
                detail: "mock unavailable".to_string(),
            })
        }
    }

    impl UpstreamOperations for MockUpstreams {
        async fn locate_ip(&self, _ip: &str) -> Result<IpLocation> {
            match &self.ip_city {
                Some(city) => Ok(IpLocation {
                    city: city.clone(),
                    adcode: "330100".to_string(),
                }),
                None => Self::unavailable("AMap"),
            }
        }

        async fn city_lookup(&self, _city: &str) -> Result<CityLocation> {
            self.lookup_calls.fetch_add(1, Ordering::SeqCst);
            match &self.location {
                Some(location) => Ok(location.clone()),
                None => Self::unavailable("QWeather"),
            }
        }

        async fn weather_now(&self, _location_id: &str) -> Result<CurrentConditions> {
            match self.now {
                Some(now) => Ok(now),
                None => Self::unavailable("QWeather"),
            }
        }

        async fn precip_probability(&self, _location_id: &str) -> Result<f64> {
            match self.precip {
                Some(precip) => Ok(precip),
                None => Self::unavailable("QWeather"),
            }
        }

        async fn advice(&self, _city: &str, _weather: &WeatherReading) -> Result<Vec<String>> {
            match &self.advice {
                Some(advice) => Ok(advice.clone()),
                None => Self::unavailable("Spark"),
            }
        }

        async fn generate(&self, _prompt: &str) -> Result<Completion> {
            match &self.completion {
                Some(content) => Ok(Completion {
                    content: content.clone(),
                    status: 200,
                    endpoint: "mock://spark",
                    raw_sample: content.clone(),
                }),
                None => Self::unavailable("Spark"),
            }
        }
    }
}
