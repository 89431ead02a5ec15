//! AMap IP geolocation client.

use super::{IpLocation, Result, UpstreamError};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const API_URL: &str = "https://restapi.amap.com/v3/ip";
const TIMEOUT: Duration = Duration::from_secs(8);

/// Wire format for the AMap IP locate response.
///
/// AMap reports `city`/`province`/`adcode` as strings for located IPs
/// but as empty arrays for unlocatable ones, so those fields stay raw
/// `Value`s and go through [`value_str`].
#[derive(Debug, Deserialize)]
struct AmapResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    city: Value,
    #[serde(default)]
    province: Value,
    #[serde(default)]
    adcode: Value,
}

fn value_str(v: &Value) -> &str {
    v.as_str().unwrap_or("")
}

fn into_location(body: AmapResponse) -> Result<IpLocation> {
    if body.status != "1" {
        return Err(UpstreamError::Malformed {
            provider: "AMap",
            detail: "status != 1".to_string(),
        });
    }
    let city = match value_str(&body.city) {
        "" => value_str(&body.province),
        city => city,
    };
    Ok(IpLocation {
        city: city.to_string(),
        adcode: value_str(&body.adcode).to_string(),
    })
}

/// Thin client over the AMap IP locate endpoint.
#[derive(Debug, Clone)]
pub struct AmapClient {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl AmapClient {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }

    /// Resolve a client IP to a city name.
    ///
    /// Falls back from `city` to `province` for province-level results.
    /// An unlocatable IP yields an empty city, which the aggregator's
    /// downstream lookup then rejects.
    pub async fn locate_ip(&self, ip: &str) -> Result<IpLocation> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(UpstreamError::MissingKey("AMAP_API_KEY"))?;

        let response = self
            .client
            .get(API_URL)
            .query(&[("ip", ip), ("key", key)])
            .timeout(TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Api {
                provider: "AMap IP locate",
                status: status.as_u16(),
            });
        }

        into_location(response.json().await?)
    }
}
