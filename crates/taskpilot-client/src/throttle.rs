// Resend throttle
//
// At most one "resend code" request may be in flight per challenge. The
// permit is a drop guard, so release happens on every exit path - success,
// rejection or early return. No timeout: the only way to hold the permit
// forever is a resend future that never settles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Mutual-exclusion guard for resend requests
#[derive(Debug, Default, Clone)]
pub struct ResendThrottle {
    held: Arc<AtomicBool>,
}

impl ResendThrottle {
    /// Create an unheld throttle
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the permit, or `None` (no side effect) if already held
    pub fn try_acquire(&self) -> Option<ResendPermit> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ResendPermit {
                held: Arc::clone(&self.held),
            })
    }

    /// Whether a resend is currently in flight
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Held permit; dropping it releases the throttle
#[derive(Debug)]
pub struct ResendPermit {
    held: Arc<AtomicBool>,
}

impl Drop for ResendPermit {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
    }
}
