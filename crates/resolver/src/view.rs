//! Result holder for a page that shows nearby facilities.
//!
//! A page can be torn down, or can start a newer refresh, while a
//! resolution is still waiting on a provider. Each refresh takes a
//! generation ticket; a result is kept only if its ticket is still the
//! latest and the view is still alive.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use common::{Coordinate, Error, Resolution};
use tracing::debug;

use crate::engine::FacilityResolver;

#[derive(Debug, Default)]
pub struct NearbyView {
    generation: AtomicU64,
    disposed: AtomicBool,
    current: Mutex<Option<Resolution>>,
}

impl NearbyView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve around `origin` and store the result if still wanted.
    ///
    /// Returns `Ok(None)` when the result was discarded.
    pub async fn refresh(
        &self,
        resolver: &FacilityResolver,
        origin: Coordinate,
    ) -> Result<Option<Resolution>, Error> {
        if self.is_disposed() {
            return Ok(None);
        }
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let resolution = resolver.resolve_nearby_detailed(origin).await?;

        if self.is_disposed() || self.generation.load(Ordering::SeqCst) != ticket {
            debug!("Discarding resolution for {} (view gone or superseded)", origin);
            return Ok(None);
        }

        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(resolution.clone());
        Ok(Some(resolution))
    }

    /// Last accepted resolution.
    pub fn current(&self) -> Option<Resolution> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Mark the view as torn down. In-flight refreshes will be discarded.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.current.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}
