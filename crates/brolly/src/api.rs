//! JSON payload types shared by the aggregator and the HTTP layer.

use serde::{Deserialize, Serialize};

/// Payload source for a fully live fetch.
pub const SOURCE_LIVE: &str = "qweather";

/// Payload source when live data could not be obtained.
pub const SOURCE_DEGRADED: &str = "degraded";

/// City shown when neither an explicit query nor IP geolocation produced one.
pub const UNKNOWN_CITY: &str = "未知城市";

/// Merged weather readings for one city.
///
/// `precip_probability` comes from the hourly forecast; everything else
/// from current conditions. Missing sources default to 0 so every field
/// is always present and numeric in the response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    pub temp: f64,
    pub humidity: f64,
    pub precip_probability: f64,
    pub wind_scale: f64,
}

/// Fixed placeholder readings for the degraded path.
pub const DEGRADED_READING: WeatherReading = WeatherReading {
    temp: 20.0,
    humidity: 50.0,
    precip_probability: 20.0,
    wind_scale: 3.0,
};

/// QWeather location metadata from the city lookup.
///
/// QWeather reports coordinates as JSON strings; they are passed
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityLocation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub lat: String,
    #[serde(default)]
    pub lon: String,
    #[serde(default)]
    pub adm2: String,
    #[serde(default)]
    pub adm1: String,
}

/// Full response body for `GET /api/weather`.
///
/// Returned with HTTP 200 on both the live and degraded paths; only
/// `source` and `error` communicate failure to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qweather_location: Option<CityLocation>,
    pub weather: WeatherReading,
    pub advice: Vec<String>,
    pub source: String,
    pub timestamp: String,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
