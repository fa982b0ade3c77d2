//! Tencent location service place-search client.
//!
//! Queries `apis.map.qq.com/ws/place/v1/search` for places around a point
//! and maps them to the shared `Facility` type. This is the primary
//! facility provider.

use async_trait::async_trait;
use common::{Coordinate, Error, Facility, FacilityProvider};
use serde::Deserialize;
use tracing::{debug, warn};

const SEARCH_URL: &str = "https://apis.map.qq.com/ws/place/v1/search";
const PAGE_SIZE: u32 = 10;
/// Tencent does not report appointment capacity; every hit gets this quota.
const DEFAULT_QUOTA: u32 = 100;

const STATUS_OK: i32 = 0;
const STATUS_KEY_REJECTED: i32 = 110;
const STATUS_RATE_LIMITED: i32 = 120;

/// Tencent place-search client.
#[derive(Debug, Clone)]
pub struct TencentMapClient {
    client: reqwest::Client,
    api_key: String,
}

/// Response envelope from `place/v1/search`.
#[derive(Debug, Deserialize)]
pub struct PlaceSearchResponse {
    pub status: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Vec<Place>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub tel: Option<String>,
    pub location: LatLng,
    /// Straight-line distance reported by Tencent, in meters.
    #[serde(rename = "_distance", default)]
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl TencentMapClient {
    pub fn new(api_key: String) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent("carebell/0.1 (elder-care assistant)")
            .pool_max_idle_per_host(4)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Http(format!("failed to build Tencent HTTP client: {e}")))?;

        Ok(Self { client, api_key })
    }

    /// Fetch raw places around `origin`, nearest first.
    pub async fn search_places(
        &self,
        origin: Coordinate,
        keyword: &str,
        radius_m: u32,
    ) -> Result<PlaceSearchResponse, Error> {
        let boundary = format!(
            "nearby({},{},{})",
            origin.latitude, origin.longitude, radius_m
        );
        let page_size = PAGE_SIZE.to_string();
        let query = [
            ("keyword", keyword),
            ("boundary", boundary.as_str()),
            ("page_size", page_size.as_str()),
            ("orderby", "_distance"),
            ("key", self.api_key.as_str()),
        ];

        debug!("Fetching Tencent place search: {} boundary={}", SEARCH_URL, boundary);

        let resp = self
            .client
            .get(SEARCH_URL)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::provider("tencent", format!("HTTP error near {origin}: {e}")))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::provider(
                "tencent",
                format!(
                    "Tencent returned {} near {}: {}",
                    status,
                    origin,
                    body.chars().take(500).collect::<String>()
                ),
            ));
        }

        resp.json()
            .await
            .map_err(|e| Error::provider("tencent", format!("JSON parse error near {origin}: {e}")))
    }
}

/// Convert a search response into facilities, or an error for a non-zero status.
pub fn to_facilities(resp: PlaceSearchResponse) -> Result<Vec<Facility>, Error> {
    match resp.status {
        STATUS_OK => {}
        STATUS_KEY_REJECTED => {
            warn!("Tencent rejected the API key: {}", resp.message);
            return Err(Error::provider("tencent", format!("key rejected: {}", resp.message)));
        }
        STATUS_RATE_LIMITED => {
            warn!("Tencent rate limit hit: {}", resp.message);
            return Err(Error::provider("tencent", format!("rate limited: {}", resp.message)));
        }
        other => {
            return Err(Error::provider(
                "tencent",
                format!("status {}: {}", other, resp.message),
            ));
        }
    }

    Ok(resp
        .data
        .into_iter()
        .enumerate()
        .map(|(index, place)| {
            let id = if place.id.is_empty() {
                index.to_string()
            } else {
                place.id
            };
            Facility {
                id: format!("MAP_{id}"),
                name: place.title,
                address: place.address,
                coordinate: Coordinate::new(place.location.lat, place.location.lng),
                available_quota: DEFAULT_QUOTA,
                phone: place.tel.filter(|t| !t.trim().is_empty()),
            }
        })
        .collect())
}

#[async_trait]
impl FacilityProvider for TencentMapClient {
    fn name(&self) -> &str {
        "tencent"
    }

    async fn search(
        &self,
        origin: Coordinate,
        keyword: &str,
        radius_m: u32,
    ) -> Result<Vec<Facility>, Error> {
        let resp = self.search_places(origin, keyword, radius_m).await?;
        to_facilities(resp)
    }
}
