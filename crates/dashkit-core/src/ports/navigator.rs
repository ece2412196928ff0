//! Navigator port
//!
//! Abstracts the application's current location so the client can send the
//! user to the login entry point after an unrecoverable authentication
//! failure, without looping when the user is already there.

/// Application location and navigation
pub trait INavigator: Send + Sync {
    /// Returns the path the application currently shows, e.g. `/dashboard`
    fn current_path(&self) -> String;

    /// Performs a full navigation to `path`
    fn navigate(&self, path: &str);
}
