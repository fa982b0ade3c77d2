//! Hospitals the user has already booked with.

use std::sync::Arc;

use common::Error;
use serde_json::Value;
use tracing::{info, warn};

use crate::store::PreferenceStore;

pub const RESERVATIONS_KEY: &str = "reservedHospitals";

/// Persisted list of reserved facility ids, in booking order.
pub struct ReservationBook {
    store: Arc<dyn PreferenceStore>,
    ids: Vec<String>,
}

impl ReservationBook {
    pub fn load(store: Arc<dyn PreferenceStore>) -> Self {
        let ids = match store.load(RESERVATIONS_KEY) {
            Ok(Some(value)) => parse_ids(value),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read reservations: {}", e);
                Vec::new()
            }
        };
        Self { store, ids }
    }

    pub fn is_reserved(&self, facility_id: &str) -> bool {
        self.ids.iter().any(|id| id == facility_id)
    }

    /// Record a reservation. Returns `false` if it was already reserved.
    pub fn reserve(&mut self, facility_id: &str) -> Result<bool, Error> {
        if self.is_reserved(facility_id) {
            return Ok(false);
        }
        let mut next = self.ids.clone();
        next.push(facility_id.to_string());
        self.store
            .save(RESERVATIONS_KEY, serde_json::to_value(&next)?)?;
        self.ids = next;
        info!("Reserved facility {}", facility_id);
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), Error> {
        self.store.remove(RESERVATIONS_KEY)?;
        self.ids.clear();
        Ok(())
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

fn parse_ids(value: Value) -> Vec<String> {
    match serde_json::from_value::<Vec<Value>>(value) {
        Ok(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Err(e) => {
            warn!("Stored reservations are not a list: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_reserve_persists_once() {
        let store = Arc::new(MemoryStore::new());
        let mut book = ReservationBook::load(store.clone());

        assert!(book.reserve("MAP_1").unwrap());
        assert!(!book.reserve("MAP_1").unwrap());
        assert!(book.reserve("BUILTIN_002").unwrap());

        let reloaded = ReservationBook::load(store);
        assert!(reloaded.is_reserved("MAP_1"));
        assert!(!reloaded.is_reserved("MAP_2"));
        assert_eq!(reloaded.ids(), ["MAP_1", "BUILTIN_002"]);
    }

    #[test]
    fn test_tolerates_numeric_ids_and_junk() {
        let store = Arc::new(MemoryStore::new());
        store
            .save(RESERVATIONS_KEY, json!(["a", 7, {"x": 1}]))
            .unwrap();

        let book = ReservationBook::load(store.clone());
        assert_eq!(book.ids(), ["a", "7"]);

        store.save(RESERVATIONS_KEY, json!("nope")).unwrap();
        assert!(ReservationBook::load(store).ids().is_empty());
    }

    #[test]
    fn test_clear() {
        let store = Arc::new(MemoryStore::new());
        let mut book = ReservationBook::load(store.clone());
        book.reserve("x").unwrap();
        book.clear().unwrap();
        assert!(!book.is_reserved("x"));
        assert_eq!(store.load(RESERVATIONS_KEY).unwrap(), None);
    }
}
