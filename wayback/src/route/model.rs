//! Immutable route model.
//!
//! A [`Route`] is the validated form of a [`RawRoute`] returned by a routing
//! provider. Once built it is never mutated; sessions share it behind an
//! `Arc` and replace it wholesale when a recomputed route arrives.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{point_at_cumulative_distance, Coordinate, GeometryError};

/// Errors raised while building or querying a route.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RouteError {
    /// The candidate has no steps or too few polyline points to be followed.
    #[error("Empty route: {steps} step(s), {points} polyline point(s)")]
    EmptyRoute { steps: usize, points: usize },

    /// A step index outside the route was requested.
    #[error("Step index {index} out of range for route with {count} step(s)")]
    StepOutOfRange { index: usize, count: usize },

    /// A geometric lookup against the polyline failed.
    #[error(transparent)]
    InvalidGeometry(#[from] GeometryError),

    /// A route file could not be read or decoded.
    #[error("Failed to load route: {0}")]
    Load(String),
}

/// How the user travels back to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// On foot.
    Walking,
    /// By car.
    Automobile,
}

impl TransportMode {
    /// Short lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Walking => "walking",
            TransportMode::Automobile => "automobile",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One instruction-bearing segment of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Human-readable instruction, e.g. "Turn left onto Elm Street".
    pub instruction: String,
    /// Length of the step in meters.
    pub length_meters: f64,
}

impl Step {
    /// Create a new step.
    pub fn new(instruction: impl Into<String>, length_meters: f64) -> Self {
        Self {
            instruction: instruction.into(),
            length_meters,
        }
    }
}

/// Unvalidated route payload as produced by a routing provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRoute {
    /// Ordered steps.
    pub steps: Vec<Step>,
    /// Ordered path geometry.
    pub polyline: Vec<Coordinate>,
    /// Total route distance in meters (0 when the provider omits it).
    #[serde(default)]
    pub total_distance_meters: f64,
    /// Expected travel time in seconds.
    #[serde(default)]
    pub total_duration_seconds: f64,
}

impl RawRoute {
    /// Create a raw route from steps and geometry with no totals.
    pub fn new(steps: Vec<Step>, polyline: Vec<Coordinate>) -> Self {
        Self {
            steps,
            polyline,
            total_distance_meters: 0.0,
            total_duration_seconds: 0.0,
        }
    }

    /// Decode a raw route from its JSON form.
    pub fn from_json_str(json: &str) -> Result<Self, RouteError> {
        serde_json::from_str(json).map_err(|e| RouteError::Load(e.to_string()))
    }

    /// Read and decode a JSON route file.
    pub fn load(path: &Path) -> Result<Self, RouteError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| RouteError::Load(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Write the route as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), RouteError> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| RouteError::Load(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| RouteError::Load(format!("{}: {}", path.display(), e)))
    }
}

/// A validated, immutable route.
///
/// Step boundaries (the cumulative distance to the end of each step) are
/// derived at construction; the matching polyline vertices are resolved
/// lazily and cached for the lifetime of the route.
#[derive(Debug)]
pub struct Route {
    steps: Vec<Step>,
    polyline: Vec<Coordinate>,
    total_distance_meters: f64,
    total_duration_seconds: f64,
    /// Distance from route start to the end of step `i`.
    step_boundaries_m: Vec<f64>,
    step_end_cache: Vec<OnceLock<Coordinate>>,
}

impl Route {
    /// Build a route from steps and geometry.
    pub fn new(steps: Vec<Step>, polyline: Vec<Coordinate>) -> Result<Self, RouteError> {
        Self::from_raw_route(RawRoute::new(steps, polyline))
    }

    /// Validate a raw provider route.
    ///
    /// # Errors
    ///
    /// [`RouteError::EmptyRoute`] if there are no steps or fewer than two
    /// polyline points.
    pub fn from_raw_route(raw: RawRoute) -> Result<Self, RouteError> {
        if raw.steps.is_empty() || raw.polyline.len() < 2 {
            return Err(RouteError::EmptyRoute {
                steps: raw.steps.len(),
                points: raw.polyline.len(),
            });
        }

        let mut steps = raw.steps;
        for step in &mut steps {
            // Negative or NaN lengths would break the monotonic boundaries
            if !step.length_meters.is_finite() || step.length_meters < 0.0 {
                tracing::warn!(
                    instruction = %step.instruction,
                    length = step.length_meters,
                    "Clamping invalid step length to zero"
                );
                step.length_meters = 0.0;
            }
        }

        let step_boundaries_m: Vec<f64> = steps
            .iter()
            .scan(0.0, |sum, step| {
                *sum += step.length_meters;
                Some(*sum)
            })
            .collect();

        let total_distance_meters = if raw.total_distance_meters > 0.0 {
            raw.total_distance_meters
        } else {
            step_boundaries_m.last().copied().unwrap_or(0.0)
        };

        let step_end_cache = (0..steps.len()).map(|_| OnceLock::new()).collect();

        Ok(Self {
            steps,
            polyline: raw.polyline,
            total_distance_meters,
            total_duration_seconds: raw.total_duration_seconds.max(0.0),
            step_boundaries_m,
            step_end_cache,
        })
    }

    /// The route's steps in travel order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// A single step.
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Number of steps (always at least one).
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Index of the final step.
    pub fn last_step_index(&self) -> usize {
        self.steps.len() - 1
    }

    /// The path geometry.
    pub fn polyline(&self) -> &[Coordinate] {
        &self.polyline
    }

    /// The destination (last polyline point).
    pub fn destination(&self) -> Coordinate {
        self.polyline[self.polyline.len() - 1]
    }

    /// Total route distance in meters.
    pub fn total_distance_meters(&self) -> f64 {
        self.total_distance_meters
    }

    /// Expected travel time in seconds.
    pub fn total_duration_seconds(&self) -> f64 {
        self.total_duration_seconds
    }

    /// Cumulative distance from the route start to the end of a step.
    pub fn step_boundary_meters(&self, step_index: usize) -> Result<f64, RouteError> {
        self.step_boundaries_m
            .get(step_index)
            .copied()
            .ok_or(RouteError::StepOutOfRange {
                index: step_index,
                count: self.steps.len(),
            })
    }

    /// Polyline vertex marking the end of a step.
    ///
    /// Resolved with [`point_at_cumulative_distance`] on the step's boundary
    /// distance, so it carries the same snap-forward approximation.
    pub fn step_end_coordinate(&self, step_index: usize) -> Result<Coordinate, RouteError> {
        let boundary = self.step_boundary_meters(step_index)?;
        let cell = &self.step_end_cache[step_index];

        if let Some(coordinate) = cell.get() {
            return Ok(*coordinate);
        }

        let coordinate = point_at_cumulative_distance(&self.polyline, boundary)?;
        Ok(*cell.get_or_init(|| coordinate))
    }
}
