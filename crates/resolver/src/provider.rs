//! Facility search providers and the ordered fallback chain.

use std::sync::Arc;
use std::time::Duration;

use common::{Coordinate, Error, Facility, ResultSource};
use tracing::{debug, info, warn};

use crate::fallback::BuiltinFacilities;

pub use common::FacilityProvider;

struct ChainLink {
    provider: Arc<dyn FacilityProvider>,
    timeout: Duration,
}

/// Remote providers in priority order, backed by built-in data.
///
/// Providers are tried one at a time. Worst-case latency is the sum of the
/// per-provider timeouts.
pub struct ProviderChain {
    links: Vec<ChainLink>,
    builtin: BuiltinFacilities,
}

impl ProviderChain {
    pub fn new(builtin: BuiltinFacilities) -> Self {
        Self {
            links: Vec::new(),
            builtin,
        }
    }

    /// Append a provider after the ones already registered.
    pub fn with_provider(mut self, provider: Arc<dyn FacilityProvider>, timeout: Duration) -> Self {
        self.links.push(ChainLink { provider, timeout });
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.links.iter().map(|l| l.provider.name()).collect()
    }

    /// Run the chain. The first provider returning at least one usable
    /// facility wins; every failure (error, timeout, empty) moves on.
    pub async fn search(
        &self,
        origin: Coordinate,
        keyword: &str,
        radius_m: u32,
    ) -> (Vec<Facility>, ResultSource) {
        for link in &self.links {
            let name = link.provider.name();
            debug!("Querying provider {} around {}", name, origin);

            let outcome =
                tokio::time::timeout(link.timeout, link.provider.search(origin, keyword, radius_m))
                    .await;

            match outcome {
                Ok(Ok(found)) => {
                    let usable = drop_invalid(name, found);
                    if usable.is_empty() {
                        warn!("Provider {} returned no facilities, trying next", name);
                        continue;
                    }
                    info!("Provider {} returned {} facilities", name, usable.len());
                    return (usable, ResultSource::Provider(name.to_string()));
                }
                Ok(Err(e)) => {
                    warn!("Provider {} failed, trying next: {}", name, e);
                }
                Err(_) => {
                    let e = Error::Timeout {
                        what: format!("{name} search around {origin}"),
                        timeout_ms: link.timeout.as_millis() as u64,
                    };
                    warn!("Provider {} failed, trying next: {}", name, e);
                }
            }
        }

        warn!("All remote providers failed; using built-in facility data");
        let builtin = match self.builtin.search(origin, keyword, radius_m).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Built-in data failed ({}); serving stock list", e);
                self.builtin.facilities().to_vec()
            }
        };
        (builtin, ResultSource::BuiltinFallback)
    }
}

fn drop_invalid(provider: &str, facilities: Vec<Facility>) -> Vec<Facility> {
    facilities
        .into_iter()
        .filter(|f| match f.coordinate.validate() {
            Ok(()) => true,
            Err(e) => {
                debug!("{}: dropping {} ({}): {}", provider, f.id, f.name, e);
                false
            }
        })
        .collect()
}
