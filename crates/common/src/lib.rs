//! Shared types, config, and error definitions for carebell.

pub mod config;
pub mod error;
pub mod location;
pub mod search;
pub mod types;

pub use config::AppConfig;
pub use error::Error;
pub use location::{place_label, FixedGeolocator, Geolocator, ReverseGeocoder, GENERIC_PLACE_LABEL};
pub use search::FacilityProvider;
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
