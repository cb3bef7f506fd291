// In-memory implementations for examples and testing
//
// These keep all data in memory, making them perfect for:
// - Unit tests that need a session store without a browser
// - Asserting on redirects without a router

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::traits::{Navigator, Route, StorageBackend};

// ============================================================================
// MemoryStorage - string KV tier backed by a HashMap
// ============================================================================

/// In-memory storage tier
///
/// Cloning shares the underlying map, mirroring how two handles to the same
/// browser storage area behave.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty storage tier
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with entries (useful for testing)
    pub fn seed(&self, entries: impl IntoIterator<Item = (String, String)>) {
        let mut map = self.entries.write().expect("storage lock poisoned");
        map.extend(entries);
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().expect("storage lock poisoned").len()
    }

    /// Whether the tier is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .expect("storage lock poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .write()
            .expect("storage lock poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .expect("storage lock poisoned")
            .remove(key);
    }

    fn clear(&self) {
        self.entries.write().expect("storage lock poisoned").clear();
    }
}

// ============================================================================
// RecordingNavigator - collects redirects for assertions
// ============================================================================

/// Navigator that records every route it was asked to visit
#[derive(Debug, Default, Clone)]
pub struct RecordingNavigator {
    visited: Arc<Mutex<Vec<Route>>>,
}

impl RecordingNavigator {
    /// Create a navigator with an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// All routes navigated to, in order
    pub fn visited(&self) -> Vec<Route> {
        self.visited.lock().expect("navigator lock poisoned").clone()
    }

    /// The most recent route, if any
    pub fn last(&self) -> Option<Route> {
        self.visited
            .lock()
            .expect("navigator lock poisoned")
            .last()
            .copied()
    }

    /// Drop the recorded history
    pub fn reset(&self) {
        self.visited.lock().expect("navigator lock poisoned").clear();
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.visited
            .lock()
            .expect("navigator lock poisoned")
            .push(route);
    }
}
