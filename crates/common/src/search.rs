//! Facility search seam implemented by remote clients and built-in data.

use async_trait::async_trait;

use crate::{Coordinate, Error, Facility};

/// A facility search provider.
///
/// Every non-success outcome (transport error, bad status, malformed body,
/// provider-specific error code) is reported as `Err`; callers do not
/// distinguish between them.
#[async_trait]
pub trait FacilityProvider: Send + Sync {
    /// Short name used in logs and in [`ResultSource::Provider`](crate::ResultSource::Provider).
    fn name(&self) -> &str;

    /// Search for facilities matching `keyword` within `radius_m` of `origin`.
    async fn search(
        &self,
        origin: Coordinate,
        keyword: &str,
        radius_m: u32,
    ) -> Result<Vec<Facility>, Error>;
}
