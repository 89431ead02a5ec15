//! Brolly — edge-localized weather assistant.
//!
//! A small edge HTTP service: resolve a city (explicit query or IP
//! geolocation), fetch QWeather conditions, generate localized advice
//! (Spark MaaS completion with a rule-based fallback), and cache the
//! assembled payload for an hour per city. The browser shell is served
//! from embedded assets and keeps a service-worker copy for offline
//! viewing.

pub mod advice;
pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod http_server;
pub mod upstream;

pub use aggregator::WeatherAggregator;
pub use api::{ResponsePayload, WeatherReading};
pub use cache::{CacheStore, MemoryCache};
pub use config::EdgeConfig;
pub use upstream::{LiveUpstreams, UpstreamError, UpstreamOperations};
