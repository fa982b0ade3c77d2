//! The nearby-facility resolver.
//!
//! `resolve_nearby` runs one cycle:
//! cache check, then on a miss the provider chain, then ranking, then a
//! cache write. Given a valid origin it always produces at least one
//! facility because the chain ends in built-in data.

use std::sync::Arc;
use std::time::Duration;

use common::config::ResolverConfig;
use common::{Coordinate, Error, RankedFacility, Resolution, ResultSource};
use tracing::{debug, info};

use crate::cache::{CacheEntry, ResultCache};
use crate::distance::rank_by_distance;
use crate::provider::ProviderChain;

/// Tunables for one resolver.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub top_k: usize,
    pub keyword: String,
    pub radius_m: u32,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            keyword: "医院".into(),
            radius_m: 5000,
        }
    }
}

impl From<&ResolverConfig> for ResolverSettings {
    fn from(cfg: &ResolverConfig) -> Self {
        Self {
            top_k: cfg.top_k,
            keyword: cfg.search_keyword.clone(),
            radius_m: cfg.search_radius_m,
        }
    }
}

pub struct FacilityResolver {
    chain: ProviderChain,
    cache: ResultCache,
    settings: ResolverSettings,
}

impl FacilityResolver {
    /// `top_k` below 1 is raised to 1.
    pub fn new(chain: ProviderChain, cache: ResultCache, mut settings: ResolverSettings) -> Self {
        settings.top_k = settings.top_k.max(1);
        Self {
            chain,
            cache,
            settings,
        }
    }

    /// Build from config: cache policy and TTL come from `cfg`.
    pub fn from_config(chain: ProviderChain, cfg: &ResolverConfig) -> Self {
        let cache = ResultCache::from_mode(
            cfg.cache_mode,
            Duration::from_secs(cfg.cache_ttl_secs),
            cfg.quantize_decimals,
        );
        Self::new(chain, cache, ResolverSettings::from(cfg))
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Nearest facilities to `origin`, at most `top_k`, sorted by distance.
    ///
    /// Fails only with [`Error::InvalidInput`] for an out-of-range origin.
    pub async fn resolve_nearby(&self, origin: Coordinate) -> Result<Arc<[RankedFacility]>, Error> {
        Ok(self.resolve_nearby_detailed(origin).await?.facilities)
    }

    /// Like [`resolve_nearby`](Self::resolve_nearby) but also reports where
    /// the data came from, so callers can flag built-in results.
    pub async fn resolve_nearby_detailed(&self, origin: Coordinate) -> Result<Resolution, Error> {
        origin.validate()?;

        if let Some(hit) = self.cache.get(origin) {
            debug!(
                "Cache hit for {} ({} facilities, computed by {:?})",
                origin,
                hit.results.len(),
                hit.source
            );
            return Ok(Resolution {
                facilities: hit.results,
                source: ResultSource::Cache,
                computed_at: hit.computed_wall,
            });
        }

        let (found, source) = self
            .chain
            .search(origin, &self.settings.keyword, self.settings.radius_m)
            .await;
        let candidates = found.len();

        let ranked: Arc<[RankedFacility]> =
            rank_by_distance(origin, found, self.settings.top_k).into();

        if let Some(nearest) = ranked.first() {
            info!(
                "Resolved {} of {} facilities near {} via {:?}; nearest {} at {}",
                ranked.len(),
                candidates,
                origin,
                source,
                nearest.facility.name,
                nearest.distance_text()
            );
        }

        let entry = CacheEntry::new(origin, Arc::clone(&ranked), source.clone());
        let computed_at = entry.computed_wall;
        self.cache.put(entry);

        Ok(Resolution {
            facilities: ranked,
            source,
            computed_at,
        })
    }

    /// Drop cached results so the next call queries providers again.
    pub fn invalidate(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::BuiltinFacilities;
    use crate::provider::tests::{facility, Behavior, MockProvider};
    use common::Facility;

    const TTL: Duration = Duration::from_secs(300);
    const FUZHOU: Coordinate = Coordinate::new(26.0845, 119.3005);

    fn resolver(chain: ProviderChain) -> FacilityResolver {
        FacilityResolver::new(chain, ResultCache::single_slot(TTL), ResolverSettings::default())
    }

    fn five_facilities() -> Vec<Facility> {
        vec![
            facility("f4", 26.1245, 119.3005),
            facility("f1", 26.0855, 119.3005),
            facility("f5", 26.1845, 119.3005),
            facility("f2", 26.0945, 119.3005),
            facility("f3", 26.1045, 119.3005),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_origin_rejected_without_provider_call() {
        let primary = MockProvider::new("primary", Behavior::Return(five_facilities()));
        let r = resolver(
            ProviderChain::new(BuiltinFacilities::default())
                .with_provider(primary.clone(), Duration::from_secs(5)),
        );

        let err = r.resolve_nearby(Coordinate::new(95.0, 119.3)).await;

        assert!(matches!(err, Err(Error::InvalidInput(_))));
        assert_eq!(primary.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selects_nearest_three_of_five() {
        let primary = MockProvider::new("primary", Behavior::Return(five_facilities()));
        let r = resolver(
            ProviderChain::new(BuiltinFacilities::default())
                .with_provider(primary.clone(), Duration::from_secs(5)),
        );

        let res = r.resolve_nearby_detailed(FUZHOU).await.unwrap();

        let ids: Vec<&str> = res.facilities.iter().map(|f| f.facility.id.as_str()).collect();
        assert_eq!(ids, ["f1", "f2", "f3"]);
        assert_eq!(res.source, ResultSource::Provider("primary".into()));
        assert!(res
            .facilities
            .windows(2)
            .all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_origin_within_ttl_is_served_from_cache() {
        let primary = MockProvider::new("primary", Behavior::Return(five_facilities()));
        let r = resolver(
            ProviderChain::new(BuiltinFacilities::default())
                .with_provider(primary.clone(), Duration::from_secs(5)),
        );

        let first = r.resolve_nearby(FUZHOU).await.unwrap();
        let second = r.resolve_nearby_detailed(FUZHOU).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second.facilities));
        assert_eq!(second.source, ResultSource::Cache);
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_boundary_around_five_minutes() {
        let primary = MockProvider::new("primary", Behavior::Return(five_facilities()));
        let r = resolver(
            ProviderChain::new(BuiltinFacilities::default())
                .with_provider(primary.clone(), Duration::from_secs(5)),
        );

        let first = r.resolve_nearby(FUZHOU).await.unwrap();

        tokio::time::advance(Duration::from_secs(4 * 60 + 59)).await;
        let cached = r.resolve_nearby(FUZHOU).await.unwrap();
        assert!(Arc::ptr_eq(&first, &cached));
        assert_eq!(primary.calls(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        let fresh = r.resolve_nearby(FUZHOU).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &fresh));
        assert_eq!(primary.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_origin_misses_within_ttl() {
        let primary = MockProvider::new("primary", Behavior::Return(five_facilities()));
        let r = resolver(
            ProviderChain::new(BuiltinFacilities::default())
                .with_provider(primary.clone(), Duration::from_secs(5)),
        );

        r.resolve_nearby(FUZHOU).await.unwrap();
        r.resolve_nearby(Coordinate::new(26.0846, 119.3005)).await.unwrap();
        // The slot now holds the second origin, so the first misses again.
        r.resolve_nearby(FUZHOU).await.unwrap();

        assert_eq!(primary.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fuzhou_all_remote_fail_uses_builtin_ranked() {
        let primary = MockProvider::new("primary", Behavior::Hang);
        let secondary = MockProvider::new("secondary", Behavior::Return(Vec::new()));
        let r = resolver(
            ProviderChain::new(BuiltinFacilities::default())
                .with_provider(primary.clone(), Duration::from_secs(5))
                .with_provider(secondary.clone(), Duration::from_secs(3)),
        );

        let res = r.resolve_nearby_detailed(FUZHOU).await.unwrap();

        assert_eq!(res.source, ResultSource::BuiltinFallback);
        let names: Vec<&str> = res.facilities.iter().map(|f| f.facility.name.as_str()).collect();
        assert_eq!(
            names,
            ["福建省立医院", "福州市第一医院", "福建医科大学附属第一医院"]
        );
        let ranks: Vec<u32> = res.facilities.iter().map(|f| f.rank).collect();
        assert_eq!(ranks, [1, 2, 3]);
        assert_eq!(res.facilities[0].distance_km, 0.0);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_requery() {
        let primary = MockProvider::new("primary", Behavior::Return(five_facilities()));
        let r = resolver(
            ProviderChain::new(BuiltinFacilities::default())
                .with_provider(primary.clone(), Duration::from_secs(5)),
        );

        r.resolve_nearby(FUZHOU).await.unwrap();
        r.invalidate();
        r.resolve_nearby(FUZHOU).await.unwrap();

        assert_eq!(primary.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quantized_cache_from_config_absorbs_jitter() {
        let primary = MockProvider::new("primary", Behavior::Return(five_facilities()));
        let cfg = ResolverConfig {
            cache_mode: common::config::CacheMode::Quantized,
            ..ResolverConfig::default()
        };
        let r = FacilityResolver::from_config(
            ProviderChain::new(BuiltinFacilities::default())
                .with_provider(primary.clone(), Duration::from_secs(5)),
            &cfg,
        );

        r.resolve_nearby(Coordinate::new(26.08461, 119.30021)).await.unwrap();
        let res = r
            .resolve_nearby_detailed(Coordinate::new(26.08459, 119.30038))
            .await
            .unwrap();

        assert_eq!(res.source, ResultSource::Cache);
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_top_k_caps_length() {
        let primary = MockProvider::new("primary", Behavior::Return(five_facilities()));
        let settings = ResolverSettings {
            top_k: 1,
            ..ResolverSettings::default()
        };
        let r = FacilityResolver::new(
            ProviderChain::new(BuiltinFacilities::default())
                .with_provider(primary, Duration::from_secs(5)),
            ResultCache::single_slot(TTL),
            settings,
        );

        let res = r.resolve_nearby(FUZHOU).await.unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].facility.id, "f1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_top_k_raised_to_one() {
        let primary = MockProvider::new("primary", Behavior::Return(five_facilities()));
        let settings = ResolverSettings {
            top_k: 0,
            ..ResolverSettings::default()
        };
        let r = FacilityResolver::new(
            ProviderChain::new(BuiltinFacilities::default())
                .with_provider(primary, Duration::from_secs(5)),
            ResultCache::single_slot(TTL),
            settings,
        );

        assert_eq!(r.settings().top_k, 1);
        let res = r.resolve_nearby(FUZHOU).await.unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].facility.id, "f1");
    }
}
