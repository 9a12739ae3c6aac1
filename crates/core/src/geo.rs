//! Coordinates and store-locator distances.
//!
//! Distances are statute miles computed with the spherical law of cosines,
//! the same formula the store locator query evaluates in SQL.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Statute miles per nautical mile (one minute of arc).
pub const MILES_PER_NAUTICAL_MINUTE: f64 = 1.1515;

/// Errors that can occur when building coordinates or distances.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// The input could not be parsed as a number.
    #[error("invalid {what}: {input:?}")]
    NotANumber {
        /// Which value was being parsed.
        what: &'static str,
        /// The offending input.
        input: String,
    },
    /// Latitude outside [-90, 90].
    #[error("latitude must be between -90 and 90 (got {0})")]
    LatitudeOutOfRange(f64),
    /// Longitude outside [-180, 180].
    #[error("longitude must be between -180 and 180 (got {0})")]
    LongitudeOutOfRange(f64),
    /// Negative or non-finite distance.
    #[error("distance must be a finite, non-negative number (got {0})")]
    InvalidDistance(f64),
}

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Create a point from decimal degrees.
    ///
    /// # Errors
    ///
    /// Returns an error if either coordinate is non-finite or out of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::LatitudeOutOfRange(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parse a point from textual coordinates, e.g. query string values.
    ///
    /// # Errors
    ///
    /// Returns an error if either value is not a number or is out of range.
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self, GeoError> {
        let lat = parse_number("latitude", latitude)?;
        let lng = parse_number("longitude", longitude)?;
        Self::new(lat, lng)
    }

    /// Latitude in decimal degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// A search radius in statute miles.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distance(f64);

impl Distance {
    /// Create a distance in miles.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is negative or non-finite.
    pub fn miles(value: f64) -> Result<Self, GeoError> {
        if !value.is_finite() || value < 0.0 {
            return Err(GeoError::InvalidDistance(value));
        }
        Ok(Self(value))
    }

    /// Parse a distance in miles from text.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a number, negative or non-finite.
    pub fn parse(s: &str) -> Result<Self, GeoError> {
        Self::miles(parse_number("distance", s)?)
    }

    /// The distance in miles.
    #[must_use]
    pub const fn as_miles(self) -> f64 {
        self.0
    }
}

/// Great-circle distance between two points in statute miles.
///
/// `acos(sin φ1 sin φ2 + cos φ1 cos φ2 cos Δλ)` in degrees, times 60 nautical
/// miles per degree, times 1.1515. Identical points are exactly 0; otherwise
/// the cosine is clamped to [-1, 1] so rounding noise cannot produce `NaN`.
#[must_use]
pub fn great_circle_miles(a: GeoPoint, b: GeoPoint) -> f64 {
    if a == b {
        return 0.0;
    }

    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let delta_lng = (a.longitude - b.longitude).to_radians();

    let cosine = lat_a
        .sin()
        .mul_add(lat_b.sin(), lat_a.cos() * lat_b.cos() * delta_lng.cos())
        .clamp(-1.0, 1.0);

    cosine.acos().to_degrees() * 60.0 * MILES_PER_NAUTICAL_MINUTE
}

fn parse_number(what: &'static str, input: &str) -> Result<f64, GeoError> {
    input
        .trim()
        .parse::<f64>()
        .map_err(|_| GeoError::NotANumber {
            what,
            input: input.to_owned(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn paris() -> GeoPoint {
        GeoPoint::new(48.8566, 2.3522).unwrap()
    }

    fn london() -> GeoPoint {
        GeoPoint::new(51.5074, -0.1278).unwrap()
    }

    #[test]
    fn test_same_point_is_zero() {
        let d = great_circle_miles(paris(), paris());
        assert!(d.abs() < f64::EPSILON, "expected 0, got {d}");

        let london_d = great_circle_miles(london(), london());
        assert!(london_d.abs() < f64::EPSILON, "expected 0, got {london_d}");
    }

    #[test]
    fn test_nearby_points_are_close_but_apart() {
        // About 0.07 miles north of Paris centre.
        let nearby = GeoPoint::new(48.8576, 2.3522).unwrap();
        let d = great_circle_miles(paris(), nearby);
        assert!(d > 0.0 && d < 0.2, "got {d}");
    }

    #[test]
    fn test_paris_london() {
        // Roughly 214 statute miles.
        let d = great_circle_miles(paris(), london());
        assert!((210.0..220.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let ab = great_circle_miles(paris(), london());
        let ba = great_circle_miles(london(), paris());
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_antipodes() {
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(0.0, 180.0).unwrap();
        // Half the circumference: 180 degrees * 60 * 1.1515
        let expected = 180.0 * 60.0 * MILES_PER_NAUTICAL_MINUTE;
        assert!((great_circle_miles(a, b) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_parse_trims_input() {
        let p = GeoPoint::parse(" 48.85 ", "2.35").unwrap();
        assert!((p.latitude() - 48.85).abs() < f64::EPSILON);
        assert!((p.longitude() - 2.35).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            GeoPoint::parse("north", "2.0"),
            Err(GeoError::NotANumber {
                what: "latitude",
                ..
            })
        ));
    }

    #[test]
    fn test_range_checks() {
        assert!(matches!(
            GeoPoint::new(91.0, 0.0),
            Err(GeoError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            GeoPoint::new(0.0, -181.0),
            Err(GeoError::LongitudeOutOfRange(_))
        ));
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_distance_parse() {
        assert!((Distance::parse("25").unwrap().as_miles() - 25.0).abs() < f64::EPSILON);
        assert!(matches!(
            Distance::parse("-1"),
            Err(GeoError::InvalidDistance(_))
        ));
        assert!(Distance::parse("inf").is_err());
    }
}
