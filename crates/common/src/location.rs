//! Geolocation capability.
//!
//! On a handset this wraps the platform location API. The workspace only
//! needs the seam plus a fixed implementation for hosts that already know
//! where the user is.

use async_trait::async_trait;
use tracing::debug;

use crate::{Coordinate, Error};

/// Label shown when no place name could be resolved.
pub const GENERIC_PLACE_LABEL: &str = "Current location";

/// Source of the user's current position.
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Fails with [`Error::LocationUnavailable`] when permission is denied,
    /// the fix times out, or there is no signal.
    async fn current_coordinate(&self) -> Result<Coordinate, Error>;
}

/// Serves a coordinate supplied up front, or reports no fix.
#[derive(Debug, Clone, Default)]
pub struct FixedGeolocator {
    coordinate: Option<Coordinate>,
}

impl FixedGeolocator {
    pub fn new(coordinate: Option<Coordinate>) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_coordinate(&self) -> Result<Coordinate, Error> {
        self.coordinate
            .ok_or_else(|| Error::LocationUnavailable("no position fix supplied".into()))
    }
}

/// Coordinate to human-readable place name.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<String, Error>;
}

/// Best-effort place label: any failure yields [`GENERIC_PLACE_LABEL`].
pub async fn place_label(geocoder: &dyn ReverseGeocoder, coordinate: Coordinate) -> String {
    match geocoder.reverse_geocode(coordinate).await {
        Ok(name) if !name.trim().is_empty() => name,
        Ok(_) => GENERIC_PLACE_LABEL.to_string(),
        Err(e) => {
            debug!("Reverse geocoding {} failed: {}", coordinate, e);
            GENERIC_PLACE_LABEL.to_string()
        }
    }
}
