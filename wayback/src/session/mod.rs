//! Navigation session orchestration.
//!
//! A [`NavigationSession`] wires location fixes into the recalculation policy
//! and the progress tracker, owns the adopted route, and publishes state for
//! a UI through a [`SessionObserver`].
//!
//! # Data Flow
//!
//! ```text
//! LocationFixSource ──► NavigationSession ──► RecalculationPolicy ──► RouteRequester
//!                              │                                          │
//!                              ▼                                          ▼
//!                       ProgressTracker ◄──── on_route_replaced ◄──── Route::from_raw_route
//!                              │
//!                              ▼
//!                       SessionObserver (watch)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wayback::config::NavigationConfig;
//! use wayback::route::OsrmRouteRequester;
//! use wayback::session::NavigationSession;
//!
//! let requester = Arc::new(OsrmRouteRequester::new("https://router.example.org")?);
//! let mut session = NavigationSession::new(NavigationConfig::default(), requester)
//!     .with_destination(parked_at);
//! let observer = session.observer();
//!
//! session.start_navigation();
//! session.run(&mut source, commands, cancellation).await?;
//! ```

mod command;
mod error;
mod navigator;
mod state;

pub use command::SessionCommand;
pub use error::SessionError;
pub use navigator::NavigationSession;
pub use state::SessionObserver;
