//! Geographic primitives and great-circle distance math.
//!
//! All coordinates are WGS84 latitude/longitude in degrees. Distances are
//! meters on a spherical Earth of mean radius, which is accurate to well under
//! one percent for the walking/driving distances a return-to-car route covers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in meters (WGS84 mean).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Slack applied when comparing a running polyline sum against a target,
/// absorbing floating-point error accumulated over many segments.
const CUMULATIVE_DISTANCE_EPSILON_M: f64 = 1e-6;

/// Errors raised by geometric lookups.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    /// The polyline cannot describe a path.
    #[error("Invalid route geometry: polyline has {0} point(s), at least 2 are required")]
    InvalidRouteGeometry(usize),

    /// A coordinate string or value could not be accepted.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
}

/// A geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a coordinate, rejecting out-of-range or non-finite values.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self, GeometryError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeometryError::InvalidCoordinate(format!(
                "latitude {} out of range",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeometryError::InvalidCoordinate(format!(
                "longitude {} out of range",
                longitude
            )));
        }
        Ok(Self::new(latitude, longitude))
    }

    /// Great-circle distance to another coordinate in meters.
    #[inline]
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance_meters(self, other)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

impl FromStr for Coordinate {
    type Err = GeometryError;

    /// Parse `"lat,lon"` (whitespace around either value is ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| GeometryError::InvalidCoordinate(format!("expected 'lat,lon', got '{}'", s)))?;

        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|_| GeometryError::InvalidCoordinate(format!("bad latitude '{}'", lat)))?;
        let longitude: f64 = lon
            .trim()
            .parse()
            .map_err(|_| GeometryError::InvalidCoordinate(format!("bad longitude '{}'", lon)))?;

        Self::try_new(latitude, longitude)
    }
}

/// Haversine distance between two coordinates in meters.
///
/// Symmetric and non-negative; zero for identical inputs.
#[inline]
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    // Rounding can push h a hair past 1.0 for antipodal points
    2.0 * EARTH_RADIUS_M * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Total length of a polyline in meters.
pub fn polyline_length_meters(polyline: &[Coordinate]) -> f64 {
    polyline
        .windows(2)
        .map(|w| distance_meters(&w[0], &w[1]))
        .sum()
}

/// Find the polyline vertex at (or just past) a distance along the path.
///
/// Walks the segments accumulating their lengths until the running sum reaches
/// `target_distance_meters`, then returns the far endpoint of that segment.
/// This is deliberately not an interpolation: the result snaps forward to the
/// next vertex, so its accuracy is bounded by the polyline's vertex spacing.
///
/// Targets beyond the end of the polyline return the last point.
///
/// # Errors
///
/// [`GeometryError::InvalidRouteGeometry`] if the polyline has fewer than
/// two points.
pub fn point_at_cumulative_distance(
    polyline: &[Coordinate],
    target_distance_meters: f64,
) -> Result<Coordinate, GeometryError> {
    if polyline.len() < 2 {
        return Err(GeometryError::InvalidRouteGeometry(polyline.len()));
    }

    let mut running = 0.0;
    for segment in polyline.windows(2) {
        running += distance_meters(&segment[0], &segment[1]);
        if running + CUMULATIVE_DISTANCE_EPSILON_M >= target_distance_meters {
            return Ok(segment[1]);
        }
    }

    Ok(polyline[polyline.len() - 1])
}

/// Offset a coordinate by a distance along a bearing.
///
/// Great-circle destination formula; bearing is degrees clockwise from north.
pub fn offset_coordinate(origin: &Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let angular = distance_m / EARTH_RADIUS_M;
    let bearing = bearing_deg.to_radians();
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    // Normalize longitude to [-180, 180)
    let lon_deg = (lon2.to_degrees() + 540.0) % 360.0 - 180.0;

    Coordinate::new(lat2.to_degrees(), lon_deg)
}
