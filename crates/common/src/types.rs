//! Domain types shared across the workspace.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

// ── Location Types ────────────────────────────────────────────────────

/// A WGS84 / GCJ-02 point in decimal degrees.
///
/// Equality is bitwise on both components: two coordinates are equal only
/// if they came from the same fix. `-0.0` and `0.0` are different keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check ranges: latitude in [-90, 90], longitude in [-180, 180].
    pub fn validate(&self) -> Result<(), Error> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::InvalidInput(format!(
                "latitude {} outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::InvalidInput(format!(
                "longitude {} outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }

    /// Round both components to `decimals` places. Three places is roughly 100m.
    pub fn quantize(&self, decimals: u32) -> (i64, i64) {
        let scale = 10f64.powi(decimals as i32);
        (
            (self.latitude * scale).round() as i64,
            (self.longitude * scale).round() as i64,
        )
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.latitude.to_bits() == other.latitude.to_bits()
            && self.longitude.to_bits() == other.longitude.to_bits()
    }
}

impl Eq for Coordinate {}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4},{:.4})", self.latitude, self.longitude)
    }
}

// ── Facility Types ────────────────────────────────────────────────────

/// A point of interest (hospital, clinic) as returned by a search provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub name: String,
    pub address: String,
    pub coordinate: Coordinate,
    /// Appointment slots left today.
    pub available_quota: u32,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Facility {
    pub fn available(&self) -> bool {
        self.available_quota > 0
    }
}

/// A facility with its distance from the query origin and its position in
/// the ranking (1 = nearest).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFacility {
    pub facility: Facility,
    pub distance_km: f64,
    pub rank: u32,
}

impl RankedFacility {
    /// Distance as shown in the list, e.g. `2.5km`.
    pub fn distance_text(&self) -> String {
        format!("{:.1}km", self.distance_km)
    }
}

/// Where a resolution's facilities came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "provider", rename_all = "snake_case")]
pub enum ResultSource {
    /// Served from a fresh cache entry; no provider was called.
    Cache,
    /// A remote search provider answered.
    Provider(String),
    /// Every remote provider failed; built-in data was used.
    BuiltinFallback,
}

impl ResultSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ResultSource::BuiltinFallback)
    }
}

/// Output of one nearby-facility resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub facilities: Arc<[RankedFacility]>,
    pub source: ResultSource,
    /// When the facilities were ranked (not when they were served).
    pub computed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_ranges() {
        assert!(Coordinate::new(26.0845, 119.3005).validate().is_ok());
        assert!(Coordinate::new(90.0, -180.0).validate().is_ok());
        assert!(Coordinate::new(90.01, 0.0).validate().is_err());
        assert!(Coordinate::new(0.0, 180.5).validate().is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).validate().is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_coordinate_equality_is_exact() {
        let a = Coordinate::new(26.0845, 119.3005);
        assert_eq!(a, Coordinate::new(26.0845, 119.3005));
        assert_ne!(a, Coordinate::new(26.08450001, 119.3005));
    }

    #[test]
    fn test_quantize_groups_nearby_fixes() {
        let a = Coordinate::new(26.08461, 119.30021);
        let b = Coordinate::new(26.08459, 119.30038);
        assert_eq!(a.quantize(3), b.quantize(3));
        assert_ne!(a.quantize(5), b.quantize(5));
    }

    #[test]
    fn test_facility_available_derived_from_quota() {
        let mut f = Facility {
            id: "H1".into(),
            name: "Test".into(),
            address: "Somewhere".into(),
            coordinate: Coordinate::new(0.0, 0.0),
            available_quota: 0,
            phone: None,
        };
        assert!(!f.available());
        f.available_quota = 1;
        assert!(f.available());
    }

    #[test]
    fn test_source_serializes_with_provider_name() {
        let json = serde_json::to_value(ResultSource::Provider("tencent".into())).unwrap();
        assert_eq!(json["kind"], "provider");
        assert_eq!(json["provider"], "tencent");
        let json = serde_json::to_value(ResultSource::BuiltinFallback).unwrap();
        assert_eq!(json["kind"], "builtin_fallback");
    }
}
