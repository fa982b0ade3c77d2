//! Time-boxed cache for resolved facility lists.
//!
//! The default policy keeps a single entry and only reuses it for the exact
//! same origin. The quantized policy keeps one entry per rounded origin in a
//! `DashMap`, so GPS jitter inside the rounding cell still hits.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::config::CacheMode;
use common::{Coordinate, RankedFacility, ResultSource};
use dashmap::DashMap;
use tokio::time::Instant;

/// A ranked result with the origin it was computed for.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub origin: Coordinate,
    pub results: Arc<[RankedFacility]>,
    /// Provider that produced `results`.
    pub source: ResultSource,
    pub computed_at: Instant,
    pub computed_wall: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(origin: Coordinate, results: Arc<[RankedFacility]>, source: ResultSource) -> Self {
        Self {
            origin,
            results,
            source,
            computed_at: Instant::now(),
            computed_wall: Utc::now(),
        }
    }

    /// Fresh while strictly younger than `ttl`.
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.computed_at) < ttl
    }
}

enum Slots {
    Single(Mutex<Option<CacheEntry>>),
    Quantized {
        decimals: u32,
        entries: DashMap<(i64, i64), CacheEntry>,
    },
}

/// Result cache shared by one resolver.
pub struct ResultCache {
    ttl: Duration,
    slots: Slots,
}

impl ResultCache {
    /// Single-slot cache keyed by exact coordinate equality.
    pub fn single_slot(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Slots::Single(Mutex::new(None)),
        }
    }

    /// Per-cell cache keyed by coordinates rounded to `decimals` places.
    pub fn quantized(ttl: Duration, decimals: u32) -> Self {
        Self {
            ttl,
            slots: Slots::Quantized {
                decimals,
                entries: DashMap::new(),
            },
        }
    }

    pub fn from_mode(mode: CacheMode, ttl: Duration, decimals: u32) -> Self {
        match mode {
            CacheMode::SingleSlot => Self::single_slot(ttl),
            CacheMode::Quantized => Self::quantized(ttl, decimals),
        }
    }

    /// Look up a fresh entry for `origin`. Expired entries are dropped.
    pub fn get(&self, origin: Coordinate) -> Option<CacheEntry> {
        let now = Instant::now();
        match &self.slots {
            Slots::Single(slot) => {
                let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());
                if guard.as_ref().is_some_and(|e| !e.is_fresh(now, self.ttl)) {
                    *guard = None;
                    return None;
                }
                guard.as_ref().filter(|e| e.origin == origin).cloned()
            }
            Slots::Quantized { decimals, entries } => {
                let key = origin.quantize(*decimals);
                let hit = entries.get(&key).map(|e| e.clone())?;
                if hit.is_fresh(now, self.ttl) {
                    Some(hit)
                } else {
                    entries.remove(&key);
                    None
                }
            }
        }
    }

    /// Store `entry`, replacing whatever occupied its slot.
    ///
    /// The quantized map drops every expired cell on write, so it holds at
    /// most the cells filled within the last TTL.
    pub fn put(&self, entry: CacheEntry) {
        match &self.slots {
            Slots::Single(slot) => {
                *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(entry);
            }
            Slots::Quantized { decimals, entries } => {
                let now = Instant::now();
                entries.retain(|_, e| e.is_fresh(now, self.ttl));
                entries.insert(entry.origin.quantize(*decimals), entry);
            }
        }
    }

    pub fn clear(&self) {
        match &self.slots {
            Slots::Single(slot) => {
                *slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
            }
            Slots::Quantized { entries, .. } => entries.clear(),
        }
    }

    /// Number of live entries, fresh or not.
    pub fn len(&self) -> usize {
        match &self.slots {
            Slots::Single(slot) => usize::from(slot.lock().unwrap_or_else(|e| e.into_inner()).is_some()),
            Slots::Quantized { entries, .. } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
