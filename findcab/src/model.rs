//! Cab records and proximity queries.

use crate::geo::{DistanceUnit, Location};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result cap applied when a query does not set its own limit.
pub const DEFAULT_QUERY_LIMIT: usize = 8;

/// Identifier of a cab.
///
/// Zero is reserved as the "unset" sentinel used by boundary layers (an
/// upsert body without an id gets the id from the request URL); it is never
/// a valid key inside the core.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CabId(pub u64);

impl CabId {
    /// The reserved "no id given" sentinel.
    pub const UNSET: CabId = CabId(0);

    /// Whether this id is the unset sentinel.
    pub fn is_unset(self) -> bool {
        self == Self::UNSET
    }
}

impl fmt::Display for CabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CabId {
    fn from(id: u64) -> Self {
        CabId(id)
    }
}

/// One tracked cab: an id and its last reported position.
///
/// Upsert replaces the record wholesale; there is no partial-field update,
/// no TTL, and no history. The wire form is flat:
/// `{"id": 1, "latitude": 38.8, "longitude": -77.0}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cab {
    #[serde(default)]
    pub id: CabId,
    #[serde(flatten)]
    pub location: Location,
}

impl Cab {
    /// Create a cab record from an id and coordinates in decimal degrees.
    pub fn new(id: u64, latitude: f64, longitude: f64) -> Self {
        Self {
            id: CabId(id),
            location: Location::new(latitude, longitude),
        }
    }
}

/// A proximity query as supplied by a caller.
///
/// `unit` and `limit` are optional; backends resolve them against their
/// [`QueryDefaults`] via [`ProximityQuery::sanitize`] before evaluating the
/// query. The caller's value is never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityQuery {
    /// Center of the search circle.
    pub center: Location,
    /// Search radius, measured in `unit`.
    pub radius: f64,
    /// Unit the radius is measured in; defaults to meters when unset.
    pub unit: Option<DistanceUnit>,
    /// Maximum number of results; zero is treated as unset, not "none".
    pub limit: Option<usize>,
}

impl ProximityQuery {
    /// Query for all cabs within `radius` of `center`, with unit and limit
    /// left to the backend's defaults.
    pub fn new(center: Location, radius: f64) -> Self {
        Self {
            center,
            radius,
            unit: None,
            limit: None,
        }
    }

    /// Set the unit the radius is measured in.
    pub fn with_unit(mut self, unit: DistanceUnit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Set the maximum number of results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resolve unset fields against `defaults`, producing the query the
    /// backend actually evaluates.
    ///
    /// A limit of `Some(0)` counts as unset: zero means "the caller did not
    /// say", never "return nothing".
    pub fn sanitize(self, defaults: &QueryDefaults) -> SanitizedQuery {
        SanitizedQuery {
            center: self.center,
            radius: self.radius,
            unit: self.unit.unwrap_or(defaults.unit),
            limit: match self.limit {
                None | Some(0) => defaults.limit,
                Some(n) => n,
            },
        }
    }
}

/// Fallback values for the optional fields of a [`ProximityQuery`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryDefaults {
    pub unit: DistanceUnit,
    pub limit: usize,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            unit: DistanceUnit::Meters,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

/// A proximity query with every field resolved, ready for evaluation.
///
/// Backends stop collecting results as soon as `limit` is reached, so a
/// query never returns more than `limit` records in any backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SanitizedQuery {
    pub center: Location,
    pub radius: f64,
    pub unit: DistanceUnit,
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_center() -> Location {
        Location::new(38.897147, -77.043934)
    }

    #[test]
    fn test_sanitize_applies_defaults() {
        let q = ProximityQuery::new(query_center(), 1000.0);
        let sanitized = q.sanitize(&QueryDefaults::default());

        assert_eq!(sanitized.unit, DistanceUnit::Meters);
        assert_eq!(sanitized.limit, DEFAULT_QUERY_LIMIT);
        assert_eq!(sanitized.center, query_center());
        assert_eq!(sanitized.radius, 1000.0);
    }

    #[test]
    fn test_sanitize_treats_zero_limit_as_unset() {
        let q = ProximityQuery::new(query_center(), 1000.0).with_limit(0);
        let sanitized = q.sanitize(&QueryDefaults::default());
        assert_eq!(sanitized.limit, DEFAULT_QUERY_LIMIT);
    }

    #[test]
    fn test_sanitize_keeps_explicit_values() {
        let q = ProximityQuery::new(query_center(), 2.5)
            .with_unit(DistanceUnit::Kilometers)
            .with_limit(3);
        let sanitized = q.sanitize(&QueryDefaults::default());

        assert_eq!(sanitized.unit, DistanceUnit::Kilometers);
        assert_eq!(sanitized.limit, 3);
    }

    #[test]
    fn test_sanitize_honors_custom_defaults() {
        let defaults = QueryDefaults {
            unit: DistanceUnit::Miles,
            limit: 2,
        };
        let sanitized = ProximityQuery::new(query_center(), 1.0).sanitize(&defaults);

        assert_eq!(sanitized.unit, DistanceUnit::Miles);
        assert_eq!(sanitized.limit, 2);
    }

    #[test]
    fn test_sanitize_does_not_mutate_caller_query() {
        let q = ProximityQuery::new(query_center(), 1000.0);
        let _ = q.sanitize(&QueryDefaults::default());
        assert_eq!(q.unit, None);
        assert_eq!(q.limit, None);
    }

    #[test]
    fn test_cab_id_unset_sentinel() {
        assert!(CabId::UNSET.is_unset());
        assert!(CabId(0).is_unset());
        assert!(!CabId(1).is_unset());
        assert_eq!(CabId::default(), CabId::UNSET);
    }

    #[test]
    fn test_cab_id_display() {
        assert_eq!(CabId(42).to_string(), "42");
    }

    #[test]
    fn test_cab_wire_format_is_flat() {
        let cab = Cab::new(1, 38.898556, -77.037852);
        let json = serde_json::to_string(&cab).unwrap();
        assert_eq!(
            json,
            "{\"id\":1,\"latitude\":38.898556,\"longitude\":-77.037852}"
        );
    }

    #[test]
    fn test_cab_deserializes_without_id() {
        let cab: Cab = serde_json::from_str("{\"latitude\":1.5,\"longitude\":-2.5}").unwrap();
        assert!(cab.id.is_unset());
        assert_eq!(cab.location, Location::new(1.5, -2.5));
    }

    #[test]
    fn test_cab_round_trips_through_json() {
        let cab = Cab::new(7, 39.898557, -77.037852);
        let json = serde_json::to_string(&cab).unwrap();
        let back: Cab = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cab);
    }
}
