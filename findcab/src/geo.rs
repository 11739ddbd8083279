//! Coordinates, distance units, and great-circle distance.
//!
//! Every backend measures proximity with the same [`distance`] function so
//! that query results do not depend on which store holds the records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6373.0;

/// Mean Earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3961.0;

/// A point on the globe in decimal degrees.
///
/// No bounds validation is performed here; callers supply well-formed
/// coordinates (latitude in [-90, 90], longitude in [-180, 180]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Create a location from latitude and longitude in decimal degrees.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Unit a distance (or query radius) is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Meters,
    Kilometers,
    Feet,
    Miles,
}

impl FromStr for DistanceUnit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meters" => Ok(Self::Meters),
            "kilometers" => Ok(Self::Kilometers),
            "feet" => Ok(Self::Feet),
            "miles" => Ok(Self::Miles),
            other => Err(UnknownUnit(other.to_string())),
        }
    }
}

/// Error returned when a unit name does not match any [`DistanceUnit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownUnit(String);

impl fmt::Display for UnknownUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown distance unit \"{}\"", self.0)
    }
}

impl std::error::Error for UnknownUnit {}

/// Great-circle distance between two locations via the haversine formula.
///
/// Commutative in its two location arguments and zero for coincident
/// points. Meters and feet are derived by fixed scaling from kilometers
/// and miles, so unit conversions are exact:
/// `distance(a, b, Feet) == distance(a, b, Miles) * 5280`.
pub fn distance(a: Location, b: Location, unit: DistanceUnit) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let hav = (delta_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (delta_lon / 2.0).sin().powi(2);
    let central_angle = 2.0 * hav.sqrt().atan2((1.0 - hav).sqrt());

    match unit {
        DistanceUnit::Meters => central_angle * EARTH_RADIUS_KM * 1000.0,
        DistanceUnit::Kilometers => central_angle * EARTH_RADIUS_KM,
        DistanceUnit::Feet => central_angle * EARTH_RADIUS_MILES * 5280.0,
        DistanceUnit::Miles => central_angle * EARTH_RADIUS_MILES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two points in downtown Washington, DC about a third of a mile apart.
    fn white_house() -> Location {
        Location::new(38.898556, -77.037852)
    }

    fn seventeenth_street() -> Location {
        Location::new(38.897147, -77.043934)
    }

    /// Round to a fixed number of decimal places for comparing against
    /// published reference distances.
    fn round_to(value: f64, places: i32) -> f64 {
        let factor = 10f64.powi(places);
        (value * factor).round() / factor
    }

    #[test]
    fn test_known_distance_miles() {
        let d = distance(white_house(), seventeenth_street(), DistanceUnit::Miles);
        assert_eq!(round_to(d, 3), 0.341);
    }

    #[test]
    fn test_known_distance_kilometers() {
        let d = distance(white_house(), seventeenth_street(), DistanceUnit::Kilometers);
        assert_eq!(round_to(d, 3), 0.549);
    }

    #[test]
    fn test_known_distance_meters() {
        let d = distance(white_house(), seventeenth_street(), DistanceUnit::Meters);
        assert_eq!(round_to(d, 0), 549.0);
    }

    #[test]
    fn test_known_distance_feet() {
        let miles = distance(white_house(), seventeenth_street(), DistanceUnit::Miles);
        let feet = distance(white_house(), seventeenth_street(), DistanceUnit::Feet);
        assert!((feet - miles * 5280.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_is_commutative() {
        for unit in [
            DistanceUnit::Meters,
            DistanceUnit::Kilometers,
            DistanceUnit::Feet,
            DistanceUnit::Miles,
        ] {
            let forward = distance(white_house(), seventeenth_street(), unit);
            let backward = distance(seventeenth_street(), white_house(), unit);
            let relative = (forward - backward).abs() / forward;
            assert!(
                relative < 1e-6,
                "distance not commutative for {:?}: {} vs {}",
                unit,
                forward,
                backward
            );
        }
    }

    #[test]
    fn test_unit_scaling() {
        let km = distance(white_house(), seventeenth_street(), DistanceUnit::Kilometers);
        let m = distance(white_house(), seventeenth_street(), DistanceUnit::Meters);
        assert!((m - km * 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_coincident_points_have_zero_distance() {
        let here = white_house();
        for unit in [
            DistanceUnit::Meters,
            DistanceUnit::Kilometers,
            DistanceUnit::Feet,
            DistanceUnit::Miles,
        ] {
            assert_eq!(distance(here, here, unit), 0.0);
        }
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // One degree of latitude spans R * pi / 180 regardless of longitude.
        let a = Location::new(38.0, -77.0);
        let b = Location::new(39.0, -77.0);
        let expected = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;
        let d = distance(a, b, DistanceUnit::Kilometers);
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn test_default_unit_is_meters() {
        assert_eq!(DistanceUnit::default(), DistanceUnit::Meters);
    }

    #[test]
    fn test_unit_from_str() {
        assert_eq!("meters".parse::<DistanceUnit>(), Ok(DistanceUnit::Meters));
        assert_eq!("miles".parse::<DistanceUnit>(), Ok(DistanceUnit::Miles));
        let err = "furlongs".parse::<DistanceUnit>().unwrap_err();
        assert_eq!(err.to_string(), "unknown distance unit \"furlongs\"");
    }

    #[test]
    fn test_unit_serde_names_are_lowercase() {
        let json = serde_json::to_string(&DistanceUnit::Kilometers).unwrap();
        assert_eq!(json, "\"kilometers\"");
        let unit: DistanceUnit = serde_json::from_str("\"feet\"").unwrap();
        assert_eq!(unit, DistanceUnit::Feet);
    }
}
