//! # Geographic Utilities
//!
//! Core geographic computation shared by the predictor, heatmap generator and
//! probability calculator.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two points (meters) |
//! | [`haversine_distance_km`] | Same, in kilometers |
//! | [`meters_to_lat_degrees`] | Meters to degrees of latitude |
//! | [`meters_to_lng_degrees`] | Meters to degrees of longitude at a latitude |
//! | [`offset_point`] | Shift a point by a fixed lat/lng delta |
//! | [`destination_point`] | Point at a bearing and distance from an origin |
//! | [`compute_bounds`] | Bounding box of a set of points |
//!
//! ## Example
//!
//! ```rust
//! use pet_search::{GeoPoint, geo_utils};
//!
//! let last_seen = GeoPoint::new(51.5074, -0.1278);
//! let home = GeoPoint::new(51.5090, -0.1300);
//!
//! let dist = geo_utils::haversine_distance(&last_seen, &home);
//! println!("Last seen {:.0}m from home", dist);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! The haversine formula calculates the great-circle distance between two points on a sphere.
//! It is accurate to within 0.3% for the few-kilometer distances a pet search covers.
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)
//!
//! ### Degree Conversion
//!
//! Grid layout uses the flat approximation of 111,320 meters per degree of latitude and
//! `111,320 * cos(lat)` meters per degree of longitude. Good enough for cells of 25-200m.

use geo::{Destination, Distance, Haversine, Point};
use crate::{Bounds, GeoPoint};

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two points using the Haversine formula.
///
/// Returns the distance in meters along the Earth's surface.
///
/// # Example
///
/// ```rust
/// use pet_search::{GeoPoint, geo_utils};
///
/// let london = GeoPoint::new(51.5074, -0.1278);
/// let paris = GeoPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Great-circle distance in kilometers.
#[inline]
pub fn haversine_distance_km(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    haversine_distance(p1, p2) / 1000.0
}

// =============================================================================
// Conversion Functions
// =============================================================================

/// Convert meters to degrees of latitude.
#[inline]
pub fn meters_to_lat_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Convert meters to degrees of longitude at the given latitude.
///
/// Uses `meters / (111320 * cos(lat))`. Near the poles the result grows without
/// bound; callers working there should expect very wide longitude steps.
///
/// # Example
///
/// ```rust
/// use pet_search::geo_utils;
///
/// // At the equator both conversions agree
/// let lng = geo_utils::meters_to_lng_degrees(111_320.0, 0.0);
/// assert!((lng - 1.0).abs() < 1e-9);
///
/// // Further north, the same distance spans more degrees of longitude
/// assert!(geo_utils::meters_to_lng_degrees(111_320.0, 60.0) > 1.9);
/// ```
#[inline]
pub fn meters_to_lng_degrees(meters: f64, latitude: f64) -> f64 {
    meters / (METERS_PER_DEGREE * latitude.to_radians().cos())
}

// =============================================================================
// Offset Functions
// =============================================================================

/// Wrap a longitude into [-180, 180]. In-range values are returned unchanged.
#[inline]
pub fn normalize_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        longitude
    } else {
        (longitude + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Shift a point by a fixed latitude/longitude delta (in degrees).
///
/// The heuristics in the predictor and calculator describe candidate spots as
/// fixed offsets from the last sighting rather than as bearings. Latitude is
/// clamped at the poles and longitude wraps across the antimeridian.
#[inline]
pub fn offset_point(origin: &GeoPoint, d_lat: f64, d_lng: f64) -> GeoPoint {
    GeoPoint::new(
        (origin.latitude + d_lat).clamp(-90.0, 90.0),
        normalize_longitude(origin.longitude + d_lng),
    )
}

/// Point reached by travelling `distance_meters` from `origin` along `bearing_degrees`
/// (0 = north, 90 = east) on a great circle.
///
/// # Example
///
/// ```rust
/// use pet_search::{GeoPoint, geo_utils};
///
/// let origin = GeoPoint::new(51.5074, -0.1278);
/// let north = geo_utils::destination_point(&origin, 0.0, 500.0);
///
/// assert!(north.latitude > origin.latitude);
/// assert!((geo_utils::haversine_distance(&origin, &north) - 500.0).abs() < 1.0);
/// ```
pub fn destination_point(
    origin: &GeoPoint,
    bearing_degrees: f64,
    distance_meters: f64,
) -> GeoPoint {
    let start = Point::new(origin.longitude, origin.latitude);
    let end = Haversine::destination(start, bearing_degrees, distance_meters);
    GeoPoint::new(end.y().clamp(-90.0, 90.0), normalize_longitude(end.x()))
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a set of points.
///
/// Returns `None` for empty input.
///
/// # Example
///
/// ```rust
/// use pet_search::{GeoPoint, geo_utils};
///
/// let points = vec![
///     GeoPoint::new(51.5000, -0.1300),
///     GeoPoint::new(51.5100, -0.1200),
///     GeoPoint::new(51.5050, -0.1250),
/// ];
///
/// let bounds = geo_utils::compute_bounds(&points).unwrap();
/// assert_eq!(bounds.min_lat, 51.5000);
/// assert_eq!(bounds.max_lng, -0.1200);
/// ```
pub fn compute_bounds(points: &[GeoPoint]) -> Option<Bounds> {
    if points.is_empty() {
        return None;
    }

    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Some(Bounds { min_lat, max_lat, min_lng, max_lng })
}

// =============================================================================
// Unit Tests
// =============================================================================
