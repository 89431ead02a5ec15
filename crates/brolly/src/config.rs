//! Environment-based configuration for upstream credentials.

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Credentials and flags read from the environment at startup.
///
/// Absent keys stay `None`; the dependent upstream call fails with a
/// descriptive error at use time instead of crashing the process.
#[derive(Debug, Clone, Default)]
pub struct EdgeConfig {
    /// AMap key for IP geolocation (`AMAP_API_KEY`).
    pub amap_key: Option<String>,
    /// QWeather key for city lookup and weather data (`QWEATHER_API_KEY`).
    pub qweather_key: Option<String>,
    /// Spark MaaS key (`AI_SERVERLESS_API_KEY`, with `XUNFEI_API_KEY`
    /// accepted as an alias).
    pub completion_key: Option<String>,
    /// Always attach debug meta to `/api/generate` (`GENERATE_DEBUG`).
    pub generate_debug: bool,
}

impl EdgeConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self {
            amap_key: env_var("AMAP_API_KEY"),
            qweather_key: env_var("QWEATHER_API_KEY"),
            completion_key: env_var("AI_SERVERLESS_API_KEY").or_else(|| env_var("XUNFEI_API_KEY")),
            generate_debug: env_var("GENERATE_DEBUG").is_some_and(|v| v != "0"),
        }
    }
}
