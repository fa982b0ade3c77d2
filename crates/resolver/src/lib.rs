//! Nearby-facility resolver.
//!
//! Ranks facilities around an origin by great-circle distance, querying an
//! ordered chain of search providers on a cache miss.

pub mod cache;
pub mod distance;
pub mod engine;
pub mod fallback;
pub mod provider;
pub mod view;

pub use cache::{CacheEntry, ResultCache};
pub use distance::{haversine_km, rank_by_distance, EARTH_RADIUS_KM};
pub use engine::{FacilityResolver, ResolverSettings};
pub use fallback::BuiltinFacilities;
pub use provider::{FacilityProvider, ProviderChain};
pub use view::NearbyView;
