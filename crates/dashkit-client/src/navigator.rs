//! In-process navigator
//!
//! [`SessionNavigator`] tracks the application's location for hosts without a
//! real router (the CLI, tests). Every navigation is appended to a history so
//! callers can observe forced sign-out redirects.

use std::sync::{Mutex, PoisonError};

use dashkit_core::ports::INavigator;
use tracing::info;

#[derive(Debug)]
struct Location {
    current: String,
    history: Vec<String>,
}

/// Navigator that records the current path and every navigation
#[derive(Debug)]
pub struct SessionNavigator {
    location: Mutex<Location>,
}

impl SessionNavigator {
    /// Creates a navigator positioned at `initial`
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            location: Mutex::new(Location {
                current: initial.into(),
                history: Vec::new(),
            }),
        }
    }

    /// Paths navigated to, oldest first. The initial path is not included.
    pub fn history(&self) -> Vec<String> {
        self.location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .clone()
    }

    /// Number of navigations performed
    pub fn navigation_count(&self) -> usize {
        self.location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .len()
    }
}

impl Default for SessionNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl INavigator for SessionNavigator {
    fn current_path(&self) -> String {
        self.location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    fn navigate(&self, path: &str) {
        let mut location = self.location.lock().unwrap_or_else(PoisonError::into_inner);
        info!(from = %location.current, to = %path, "Navigating");
        location.current = path.to_string();
        location.history.push(path.to_string());
    }
}
