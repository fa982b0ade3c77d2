//! AMap (Gaode) reverse-geocoding client.
//!
//! Turns the user's coordinate into a place name for the location label.
//! Failures here never block facility resolution; callers go through
//! [`common::place_label`] which falls back to a generic label.

use std::time::Duration;

use async_trait::async_trait;
use common::{Coordinate, Error, ReverseGeocoder};
use serde::Deserialize;
use tracing::debug;

const REGEO_URL: &str = "https://restapi.amap.com/v3/geocode/regeo";
const POI_RADIUS_M: u32 = 50;

/// AMap web-service client.
#[derive(Debug, Clone)]
pub struct AmapClient {
    client: reqwest::Client,
    api_key: String,
}

/// Response from `v3/geocode/regeo`.
#[derive(Debug, Deserialize)]
pub struct RegeoResponse {
    /// `"1"` on success, `"0"` otherwise.
    pub status: String,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub regeocode: Option<Regeocode>,
}

#[derive(Debug, Deserialize)]
pub struct Regeocode {
    /// A string, or `[]` when AMap has nothing to say.
    #[serde(default)]
    pub formatted_address: serde_json::Value,
    #[serde(default)]
    pub pois: Vec<Poi>,
}

#[derive(Debug, Deserialize)]
pub struct Poi {
    #[serde(default)]
    pub name: String,
}

impl AmapClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent("carebell/0.1 (elder-care assistant)")
            .pool_max_idle_per_host(2)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build AMap HTTP client: {e}")))?;

        Ok(Self { client, api_key })
    }

    pub async fn fetch_regeo(&self, coordinate: Coordinate) -> Result<RegeoResponse, Error> {
        // AMap wants "lng,lat".
        let location = format!("{},{}", coordinate.longitude, coordinate.latitude);
        let radius = POI_RADIUS_M.to_string();
        let query = [
            ("key", self.api_key.as_str()),
            ("location", location.as_str()),
            ("radius", radius.as_str()),
            ("extensions", "all"),
        ];

        debug!("Fetching AMap regeo: {} location={}", REGEO_URL, location);

        let resp = self
            .client
            .get(REGEO_URL)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::provider("amap", format!("HTTP error for {coordinate}: {e}")))?;

        let status = resp.status().as_u16();
        if status != 200 {
            return Err(Error::provider(
                "amap",
                format!("AMap returned {status} for {coordinate}"),
            ));
        }

        resp.json()
            .await
            .map_err(|e| Error::provider("amap", format!("JSON parse error for {coordinate}: {e}")))
    }
}

/// Pick a display name: nearest POI, then the formatted address.
pub fn place_name(resp: &RegeoResponse) -> Result<String, Error> {
    if resp.status != "1" {
        return Err(Error::provider("amap", format!("regeo failed: {}", resp.info)));
    }
    let Some(regeo) = resp.regeocode.as_ref() else {
        return Err(Error::provider("amap", "regeo response without regeocode"));
    };

    if let Some(poi) = regeo.pois.iter().find(|p| !p.name.trim().is_empty()) {
        return Ok(poi.name.clone());
    }
    match regeo.formatted_address.as_str() {
        Some(addr) if !addr.trim().is_empty() => Ok(addr.to_string()),
        _ => Err(Error::provider("amap", "no place name in regeo response")),
    }
}

#[async_trait]
impl ReverseGeocoder for AmapClient {
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<String, Error> {
        let resp = self.fetch_regeo(coordinate).await?;
        place_name(&resp)
    }
}
