// Core traits for pluggable backends
//
// These traits let the flows run against different environments:
// - In-memory implementations for tests and examples
// - Browser storage / host navigation in a real deployment
//
// Navigation is deliberately a trait: the gateway and the verification
// controller only ever *signal* a redirect target; performing it is the
// host's concern.

use std::sync::Arc;

/// Unauthenticated pages a flow can send the user to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The login page - the unauthenticated entry point
    Login,
    Signup,
    ForgotPassword,
}

impl Route {
    /// Path of the route in the host application
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/",
            Route::Signup => "/signup",
            Route::ForgotPassword => "/forgot-password",
        }
    }
}

/// String key/value storage tier
///
/// Implementations can be backed by browser local/session storage, a file,
/// or a plain map for tests. One instance backs exactly one tier; lifetime
/// (durable vs tab-scoped) is a property of the backing store, not of this
/// trait.
pub trait StorageBackend: Send + Sync {
    /// Read a value, absent if the key was never set or was removed
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value
    fn set(&self, key: &str, value: &str);

    /// Remove a single key
    fn remove(&self, key: &str);

    /// Remove everything in this tier
    fn clear(&self);
}

impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }

    fn clear(&self) {
        (**self).clear()
    }
}

/// Sink for involuntary redirects
///
/// Implementations can drive a router, or record routes for assertions.
pub trait Navigator: Send + Sync {
    /// Send the user to an unauthenticated page
    fn navigate(&self, route: Route);
}

impl<T: Navigator + ?Sized> Navigator for Arc<T> {
    fn navigate(&self, route: Route) {
        (**self).navigate(route)
    }
}
