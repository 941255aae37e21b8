//! Observable session state.
//!
//! The session is the only writer. Observers hold `watch` receivers and see
//! the latest value of each field; intermediate values may be skipped.

use std::sync::Arc;

use tokio::sync::watch;

use crate::progress::NavigationState;
use crate::route::Route;

/// Write side of the session's observable state.
#[derive(Debug)]
pub(crate) struct SessionPublisher {
    navigation: watch::Sender<NavigationState>,
    route: watch::Sender<Option<Arc<Route>>>,
    error: watch::Sender<Option<String>>,
    loading: watch::Sender<bool>,
    observer: SessionObserver,
}

impl SessionPublisher {
    pub(crate) fn new() -> Self {
        let (navigation, navigation_rx) = watch::channel(NavigationState::default());
        let (route, route_rx) = watch::channel(None);
        let (error, error_rx) = watch::channel(None);
        let (loading, loading_rx) = watch::channel(false);

        Self {
            navigation,
            route,
            error,
            loading,
            observer: SessionObserver {
                navigation: navigation_rx,
                route: route_rx,
                error: error_rx,
                loading: loading_rx,
            },
        }
    }

    pub(crate) fn observer(&self) -> SessionObserver {
        self.observer.clone()
    }

    pub(crate) fn publish_navigation(&self, state: NavigationState) {
        self.navigation.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    pub(crate) fn publish_route(&self, route: Option<Arc<Route>>) {
        self.route.send_replace(route);
    }

    pub(crate) fn publish_error(&self, message: Option<String>) {
        self.error.send_if_modified(|current| {
            if *current == message {
                false
            } else {
                *current = message;
                true
            }
        });
    }

    pub(crate) fn publish_loading(&self, loading: bool) {
        self.loading.send_if_modified(|current| {
            let changed = *current != loading;
            *current = loading;
            changed
        });
    }
}

/// Read side of the session's observable state.
///
/// Cheap to clone; every clone sees the same values.
#[derive(Debug, Clone)]
pub struct SessionObserver {
    navigation: watch::Receiver<NavigationState>,
    route: watch::Receiver<Option<Arc<Route>>>,
    error: watch::Receiver<Option<String>>,
    loading: watch::Receiver<bool>,
}

impl SessionObserver {
    /// Latest guidance state.
    pub fn navigation_state(&self) -> NavigationState {
        *self.navigation.borrow()
    }

    /// Route currently adopted by the session.
    pub fn route(&self) -> Option<Arc<Route>> {
        self.route.borrow().clone()
    }

    /// Last user-facing error, cleared by a successful route or a retry.
    pub fn error_message(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    /// Whether a route request is outstanding.
    pub fn is_loading_route(&self) -> bool {
        *self.loading.borrow()
    }

    /// Receiver for guidance state changes.
    pub fn navigation_updates(&self) -> watch::Receiver<NavigationState> {
        self.navigation.clone()
    }

    /// Receiver for route changes.
    pub fn route_updates(&self) -> watch::Receiver<Option<Arc<Route>>> {
        self.route.clone()
    }

    /// Receiver for error message changes.
    pub fn error_updates(&self) -> watch::Receiver<Option<String>> {
        self.error.clone()
    }

    /// Receiver for loading flag changes.
    pub fn loading_updates(&self) -> watch::Receiver<bool> {
        self.loading.clone()
    }
}
