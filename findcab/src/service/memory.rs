//! In-memory backend with linear-scan queries.

use crate::geo::distance;
use crate::model::{Cab, CabId, ProximityQuery, QueryDefaults};
use crate::service::{CabService, ServiceError};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Volatile cab store backed by a `HashMap`.
///
/// Queries are a full scan with a haversine filter, O(N) per query; fine
/// for small fleets, and the scalability ceiling of this backend. Which
/// records are selected when more than `limit` fall inside the radius
/// depends on map iteration order.
///
/// A single `RwLock` guards the whole map: writers (`upsert`, `delete`,
/// `delete_all`) are exclusive, readers (`read`, `query`) run concurrently.
pub struct MemoryCabService {
    cabs: RwLock<HashMap<CabId, Cab>>,
    defaults: QueryDefaults,
}

impl MemoryCabService {
    /// Create an empty store using the standard query defaults
    /// (meters, limit 8).
    pub fn new() -> Self {
        Self::with_defaults(QueryDefaults::default())
    }

    /// Create an empty store with custom query defaults.
    pub fn with_defaults(defaults: QueryDefaults) -> Self {
        Self {
            cabs: RwLock::new(HashMap::new()),
            defaults,
        }
    }

    /// Current number of records held.
    pub fn len(&self) -> usize {
        self.cabs.read().unwrap().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.cabs.read().unwrap().is_empty()
    }
}

impl Default for MemoryCabService {
    fn default() -> Self {
        Self::new()
    }
}

impl CabService for MemoryCabService {
    fn read(&self, id: CabId) -> Result<Cab, ServiceError> {
        let cabs = self.cabs.read().unwrap();
        cabs.get(&id).copied().ok_or(ServiceError::NotFound(id))
    }

    fn upsert(&self, cab: Cab) -> Result<(), ServiceError> {
        let mut cabs = self.cabs.write().unwrap();
        cabs.insert(cab.id, cab);
        Ok(())
    }

    fn delete(&self, id: CabId) -> Result<(), ServiceError> {
        let mut cabs = self.cabs.write().unwrap();
        cabs.remove(&id);
        Ok(())
    }

    fn delete_all(&self) -> Result<(), ServiceError> {
        let mut cabs = self.cabs.write().unwrap();
        cabs.clear();
        Ok(())
    }

    fn query(&self, query: ProximityQuery) -> Result<Vec<Cab>, ServiceError> {
        let q = query.sanitize(&self.defaults);
        let cabs = self.cabs.read().unwrap();

        let mut results = Vec::new();
        for cab in cabs.values() {
            if distance(q.center, cab.location, q.unit) <= q.radius {
                results.push(*cab);
                if results.len() == q.limit {
                    break;
                }
            }
        }

        debug!(
            total = cabs.len(),
            matched = results.len(),
            radius = q.radius,
            "memory query scan complete"
        );
        Ok(results)
    }

    fn close(&self) {
        // Nothing to release.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{DistanceUnit, Location};
    use std::sync::Arc;

    fn query_center() -> Location {
        Location::new(38.897147, -77.043934)
    }

    #[test]
    fn test_upsert_then_read() {
        let service = MemoryCabService::new();
        let cab = Cab::new(1, 38.898556, -77.037852);

        service.upsert(cab).unwrap();
        assert_eq!(service.read(CabId(1)).unwrap(), cab);
    }

    #[test]
    fn test_upsert_replaces_wholesale() {
        let service = MemoryCabService::new();
        service.upsert(Cab::new(1, 38.898556, -77.037852)).unwrap();

        let moved = Cab::new(1, 40.0, -75.0);
        service.upsert(moved).unwrap();

        assert_eq!(service.read(CabId(1)).unwrap(), moved);
        assert_eq!(service.len(), 1);
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let service = MemoryCabService::new();
        let err = service.read(CabId(99)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let service = MemoryCabService::new();
        service.upsert(Cab::new(1, 38.898556, -77.037852)).unwrap();

        service.delete(CabId(1)).unwrap();
        assert!(service.read(CabId(1)).unwrap_err().is_not_found());

        // Deleting again, and deleting something never present, both succeed.
        service.delete(CabId(1)).unwrap();
        service.delete(CabId(42)).unwrap();
    }

    #[test]
    fn test_delete_all_leaves_store_queryable() {
        let service = MemoryCabService::new();
        service.upsert(Cab::new(1, 38.898556, -77.037852)).unwrap();
        service.upsert(Cab::new(2, 39.898557, -77.037852)).unwrap();

        service.delete_all().unwrap();

        assert!(service.is_empty());
        let results = service
            .query(ProximityQuery::new(query_center(), 1_000_000.0))
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_query_filters_by_radius() {
        let service = MemoryCabService::new();
        // ~341 meters from the query center.
        service.upsert(Cab::new(1, 38.898556, -77.037852)).unwrap();
        // ~111 kilometers away.
        service.upsert(Cab::new(2, 39.898557, -77.037852)).unwrap();

        let results = service
            .query(ProximityQuery::new(query_center(), 1000.0))
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, CabId(1));

        let none = service
            .query(ProximityQuery::new(query_center(), 500.0))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_query_respects_unit() {
        let service = MemoryCabService::new();
        service.upsert(Cab::new(1, 38.898556, -77.037852)).unwrap();

        // Same circle expressed in kilometers.
        let results = service
            .query(
                ProximityQuery::new(query_center(), 1.0).with_unit(DistanceUnit::Kilometers),
            )
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_query_never_exceeds_limit() {
        let service = MemoryCabService::new();
        for id in 1..=20 {
            service.upsert(Cab::new(id, 38.898556, -77.037852)).unwrap();
        }

        let capped = service
            .query(ProximityQuery::new(query_center(), 1000.0).with_limit(3))
            .unwrap();
        assert_eq!(capped.len(), 3);

        // Unset limit falls back to the default of 8.
        let defaulted = service
            .query(ProximityQuery::new(query_center(), 1000.0))
            .unwrap();
        assert_eq!(defaulted.len(), 8);
    }

    #[test]
    fn test_empty_result_is_ok_not_error() {
        let service = MemoryCabService::new();
        let results = service
            .query(ProximityQuery::new(query_center(), 1000.0))
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_concurrent_upserts() {
        let service = Arc::new(MemoryCabService::new());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || {
                    for i in 0..50u64 {
                        let id = t * 100 + i + 1;
                        service.upsert(Cab::new(id, 38.0, -77.0)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(service.len(), 200);
    }
}
