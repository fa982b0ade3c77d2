//! OpenStreetMap Nominatim search client.
//!
//! Secondary facility provider. Searches inside a small bounding box around
//! the origin. Nominatim's usage policy allows one request per second and
//! requires an identifying User-Agent, so both are enforced here.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use common::{Coordinate, Error, Facility, FacilityProvider};
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use tracing::debug;

const SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";
const RESULT_LIMIT: u32 = 10;
/// Half-width of the search box in degrees (about 5.5 km north-south).
const VIEWBOX_DELTA_DEG: f64 = 0.05;
const DEFAULT_QUOTA: u32 = 100;

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Nominatim client with a one-request-per-second limiter.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    limiter: Arc<DirectLimiter>,
    /// Free-text query. OSM tags are English, so the caller's keyword is
    /// not forwarded.
    query: String,
}

/// One row of the `format=json` search output.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimPlace {
    pub place_id: u64,
    /// Nominatim returns coordinates as strings.
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl NominatimClient {
    pub fn new(user_agent: &str) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .pool_max_idle_per_host(2)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Http(format!("failed to build Nominatim HTTP client: {e}")))?;

        Ok(Self {
            client,
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(NonZeroU32::MIN))),
            query: "hospital".into(),
        })
    }

    /// Fetch raw places inside the box around `origin`.
    pub async fn search_places(&self, origin: Coordinate) -> Result<Vec<NominatimPlace>, Error> {
        self.limiter.until_ready().await;

        let viewbox = viewbox(origin);
        let limit = RESULT_LIMIT.to_string();
        let query = [
            ("q", self.query.as_str()),
            ("format", "json"),
            ("limit", limit.as_str()),
            ("bounded", "1"),
            ("viewbox", viewbox.as_str()),
        ];

        debug!("Fetching Nominatim search: {} viewbox={}", SEARCH_URL, viewbox);

        let resp = self
            .client
            .get(SEARCH_URL)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::provider("nominatim", format!("HTTP error near {origin}: {e}")))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::provider(
                "nominatim",
                format!(
                    "Nominatim returned {} near {}: {}",
                    status,
                    origin,
                    body.chars().take(500).collect::<String>()
                ),
            ));
        }

        resp.json().await.map_err(|e| {
            Error::provider("nominatim", format!("JSON parse error near {origin}: {e}"))
        })
    }
}

/// `left,top,right,bottom` box around the origin.
fn viewbox(origin: Coordinate) -> String {
    format!(
        "{},{},{},{}",
        origin.longitude - VIEWBOX_DELTA_DEG,
        origin.latitude + VIEWBOX_DELTA_DEG,
        origin.longitude + VIEWBOX_DELTA_DEG,
        origin.latitude - VIEWBOX_DELTA_DEG
    )
}

/// Map Nominatim rows to facilities. Rows with unparseable coordinates are skipped.
pub fn to_facilities(places: Vec<NominatimPlace>) -> Vec<Facility> {
    places
        .into_iter()
        .filter_map(|place| {
            let (Ok(lat), Ok(lon)) = (place.lat.trim().parse::<f64>(), place.lon.trim().parse::<f64>())
            else {
                debug!("Skipping OSM place {}: bad coordinates", place.place_id);
                return None;
            };

            let name = place
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Hospital".to_string());
            let address = place
                .display_name
                .as_deref()
                .map(short_address)
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| "No address".to_string());

            Some(Facility {
                id: format!("OSM_{}", place.place_id),
                name,
                address,
                coordinate: Coordinate::new(lat, lon),
                available_quota: DEFAULT_QUOTA,
                phone: None,
            })
        })
        .collect()
}

/// First three comma-separated parts of a display name.
fn short_address(display_name: &str) -> String {
    display_name
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .take(3)
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl FacilityProvider for NominatimClient {
    fn name(&self) -> &str {
        "nominatim"
    }

    async fn search(
        &self,
        origin: Coordinate,
        _keyword: &str,
        _radius_m: u32,
    ) -> Result<Vec<Facility>, Error> {
        let places = self.search_places(origin).await?;
        Ok(to_facilities(places))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> &'static str {
        r#"[
            {
                "place_id": 123456,
                "licence": "Data © OpenStreetMap contributors, ODbL 1.0.",
                "lat": "26.0845213",
                "lon": "119.3004871",
                "class": "amenity",
                "type": "hospital",
                "name": "福建省立医院",
                "display_name": "福建省立医院, 东街, 鼓楼区, 福州市, 福建省, 350001, 中国"
            },
            {
                "place_id": 654321,
                "lat": "not-a-number",
                "lon": "119.31",
                "display_name": "Broken"
            },
            {
                "place_id": 777,
                "lat": "26.0534",
                "lon": "119.3123",
                "name": "",
                "display_name": ""
            }
        ]"#
    }

    #[test]
    fn test_deserialize_search_response() {
        let parsed: Vec<NominatimPlace> =
            serde_json::from_str(sample_response()).expect("response should deserialize");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].place_id, 123456);
    }

    #[test]
    fn test_to_facilities_maps_and_skips_bad_rows() {
        let parsed: Vec<NominatimPlace> = serde_json::from_str(sample_response()).unwrap();

        let facilities = to_facilities(parsed);

        assert_eq!(facilities.len(), 2);
        assert_eq!(facilities[0].id, "OSM_123456");
        assert_eq!(facilities[0].address, "福建省立医院, 东街, 鼓楼区");
        assert!((facilities[0].coordinate.latitude - 26.0845213).abs() < 1e-9);
        assert_eq!(facilities[1].name, "Hospital");
        assert_eq!(facilities[1].address, "No address");
    }

    #[test]
    fn test_viewbox_order_is_left_top_right_bottom() {
        let vb = viewbox(Coordinate::new(26.0, 119.0));
        let parts: Vec<f64> = vb.split(',').map(|p| p.parse().unwrap()).collect();
        assert!((parts[0] - 118.95).abs() < 1e-9);
        assert!((parts[1] - 26.05).abs() < 1e-9);
        assert!((parts[2] - 119.05).abs() < 1e-9);
        assert!((parts[3] - 25.95).abs() < 1e-9);
    }
}
