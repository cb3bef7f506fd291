// In-memory implementations for examples and testing
//
// A scriptable VerificationApi: outcomes are queued per operation, calls are
// counted, and an optional latency makes interleavings reproducible under
// paused test time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};

use taskpilot_core::challenge::VerificationFlow;
use taskpilot_core::error::{ClientError, Result};

use crate::verify::{VerificationApi, EXPIRY_INVALID};

/// Scriptable in-memory verification API
///
/// By default every operation succeeds and the expiry lookup fails (no code
/// outstanding). Configure with the setters; queue rejections with the
/// `reject_next_*` methods.
#[derive(Debug, Default)]
pub struct InMemoryVerificationApi {
    /// Seconds from the lookup instant to the expiry handed out
    expiry_in_secs: Mutex<Option<i64>>,
    verify_rejections: Mutex<VecDeque<String>>,
    resend_rejections: Mutex<VecDeque<String>>,
    reset_rejections: Mutex<VecDeque<String>>,
    latency: Mutex<Option<Duration>>,
    expiry_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    resend_calls: AtomicUsize,
    reset_calls: AtomicUsize,
}

impl InMemoryVerificationApi {
    /// Create an API with no outstanding code
    pub fn new() -> Self {
        Self::default()
    }

    /// Every expiry lookup returns `now + secs`
    pub fn set_expiry_in(&self, secs: i64) {
        *self.expiry_in_secs.lock().expect("lock poisoned") = Some(secs);
    }

    /// Expiry lookups fail (no code outstanding)
    pub fn clear_expiry(&self) {
        *self.expiry_in_secs.lock().expect("lock poisoned") = None;
    }

    /// Add latency to every operation
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().expect("lock poisoned") = Some(latency);
    }

    /// Queue a rejection for the next verify call
    pub fn reject_next_verify(&self, message: impl Into<String>) {
        self.verify_rejections
            .lock()
            .expect("lock poisoned")
            .push_back(message.into());
    }

    /// Queue a rejection for the next resend call
    pub fn reject_next_resend(&self, message: impl Into<String>) {
        self.resend_rejections
            .lock()
            .expect("lock poisoned")
            .push_back(message.into());
    }

    /// Queue a rejection for the next reset call
    pub fn reject_next_reset(&self, message: impl Into<String>) {
        self.reset_rejections
            .lock()
            .expect("lock poisoned")
            .push_back(message.into());
    }

    pub fn expiry_calls(&self) -> usize {
        self.expiry_calls.load(Ordering::Relaxed)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::Relaxed)
    }

    pub fn resend_calls(&self) -> usize {
        self.resend_calls.load(Ordering::Relaxed)
    }

    pub fn reset_calls(&self) -> usize {
        self.reset_calls.load(Ordering::Relaxed)
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().expect("lock poisoned");
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn pop(queue: &Mutex<VecDeque<String>>) -> Result<()> {
        match queue.lock().expect("lock poisoned").pop_front() {
            Some(message) => Err(ClientError::rejected(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VerificationApi for InMemoryVerificationApi {
    async fn otp_expiry(&self, _flow: VerificationFlow, _email: &str) -> Result<DateTime<Utc>> {
        self.expiry_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        let secs = *self.expiry_in_secs.lock().expect("lock poisoned");
        secs.map(|s| Utc::now() + ChronoDuration::seconds(s))
            .ok_or_else(|| ClientError::expired(EXPIRY_INVALID))
    }

    async fn verify_code(&self, _flow: VerificationFlow, _email: &str, _otp: &str) -> Result<()> {
        self.verify_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        Self::pop(&self.verify_rejections)
    }

    async fn resend_code(&self, _flow: VerificationFlow, _email: &str) -> Result<()> {
        self.resend_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        Self::pop(&self.resend_rejections)
    }

    async fn reset_password(&self, _email: &str, _new_password: &str) -> Result<()> {
        self.reset_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        Self::pop(&self.reset_rejections)
    }
}
