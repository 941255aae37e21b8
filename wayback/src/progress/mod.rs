//! Step-level navigation progress.
//!
//! The [`ProgressTracker`] turns location fixes into a current step index,
//! the distance to that step's end, and arrival detection.
//!
//! # State Machine
//!
//! ```text
//! Idle ──start──► Navigating ──fix within arrival threshold──► Arrived
//!                    │  ▲
//!                  stop│  │start
//!                    ▼  │
//!                  Stopped
//! ```
//!
//! `start` from any state begins a fresh episode at step 0.
//!
//! # Step Matching
//!
//! Each fix is compared against the end coordinates of the current step and
//! up to `lookahead_steps` following steps. The closest end within the step
//! completion threshold moves the index forward; the index never moves back.
//! The heuristic assumes the route is walked in one direction along its
//! polyline; routes that loop back over themselves can match the wrong step.

mod tracker;

pub use tracker::{NavigationState, ProgressTracker, ProgressUpdate, TrackerPhase};
