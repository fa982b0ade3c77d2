//! Built-in facility list used when every remote provider fails.

use async_trait::async_trait;
use common::{Coordinate, Error, Facility, FacilityProvider};

/// Fixed, local facility data. Never fails and is never empty.
#[derive(Debug, Clone)]
pub struct BuiltinFacilities {
    facilities: Vec<Facility>,
}

impl BuiltinFacilities {
    /// Use a custom list. An empty list falls back to the stock hospitals.
    pub fn new(facilities: Vec<Facility>) -> Self {
        if facilities.is_empty() {
            return Self::default();
        }
        Self { facilities }
    }

    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }
}

fn hospital(id: &str, name: &str, address: &str, lat: f64, lon: f64, quota: u32) -> Facility {
    Facility {
        id: id.into(),
        name: name.into(),
        address: address.into(),
        coordinate: Coordinate::new(lat, lon),
        available_quota: quota,
        phone: None,
    }
}

impl Default for BuiltinFacilities {
    /// Three hospitals in central Fuzhou.
    fn default() -> Self {
        Self {
            facilities: vec![
                hospital(
                    "BUILTIN_001",
                    "福建省立医院",
                    "福州市鼓楼区东街134号",
                    26.0845,
                    119.3005,
                    50,
                ),
                hospital(
                    "BUILTIN_002",
                    "福建医科大学附属第一医院",
                    "福州市台江区茶亭街20号",
                    26.0534,
                    119.3123,
                    30,
                ),
                hospital(
                    "BUILTIN_003",
                    "福州市第一医院",
                    "福州市台江区达道路190号",
                    26.0623,
                    119.3189,
                    20,
                ),
            ],
        }
    }
}

#[async_trait]
impl FacilityProvider for BuiltinFacilities {
    fn name(&self) -> &str {
        "builtin"
    }

    async fn search(
        &self,
        _origin: Coordinate,
        _keyword: &str,
        _radius_m: u32,
    ) -> Result<Vec<Facility>, Error> {
        Ok(self.facilities.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_three_valid_hospitals() {
        let builtin = BuiltinFacilities::default();
        assert!(builtin.facilities().len() >= 3);
        for f in builtin.facilities() {
            assert!(f.coordinate.validate().is_ok(), "{}", f.name);
            assert!(f.available());
        }
    }

    #[test]
    fn test_empty_custom_list_uses_stock_data() {
        let builtin = BuiltinFacilities::new(Vec::new());
        assert_eq!(builtin.facilities().len(), 3);
    }
}
