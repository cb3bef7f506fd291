// OTP verification controller
//
// One controller per active challenge, driving both the signup-confirmation
// and forgot-password flows: fetch the server-authoritative expiry, run a
// 1 Hz countdown against it, gate resends, verify submitted codes and (reset
// flow) accept the new password.
//
// The countdown is a spawned task holding no state of its own; it mutates
// the shared flow state and is aborted whenever the flow leaves AwaitingCode
// or the controller is dropped. Banners and delayed redirects are scheduled
// tasks too, all owned here and aborted on teardown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use taskpilot_core::challenge::{Challenge, ChallengePhase, VerificationFlow};
use taskpilot_core::store::SessionStore;
use taskpilot_core::traits::{Navigator, Route};
use taskpilot_core::validate::{validate_otp, validate_password, validate_password_match};

use crate::throttle::ResendThrottle;
use crate::verify::VerificationApi;

/// Resend unlocks when no more than this many seconds remain
const RESEND_WINDOW_SECS: i64 = 120;
/// Banners auto-dismiss after this long
const BANNER_TTL: Duration = Duration::from_secs(3);
/// Countdown tick
const TICK: Duration = Duration::from_secs(1);
/// Redirect delay after a completed signup verification
const SIGNUP_DONE_REDIRECT: Duration = Duration::from_millis(1500);
/// Redirect delay after a completed password reset
const RESET_DONE_REDIRECT: Duration = Duration::from_secs(2);
/// Redirect delay after the countdown elapses
const EXPIRED_REDIRECT: Duration = Duration::from_secs(2);
/// Redirect delay after a fatal flow error (expiry fetch, reset call)
const FAILURE_REDIRECT: Duration = Duration::from_millis(2500);

/// Point-in-time view of the flow for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSnapshot {
    pub phase: ChallengePhase,
    /// Seconds left on the countdown
    pub remaining: i64,
    pub can_resend: bool,
    /// A request is in flight
    pub busy: bool,
    pub info: Option<String>,
    pub error: Option<String>,
}

impl FlowSnapshot {
    /// Countdown as `m:ss`
    pub fn countdown_display(&self) -> String {
        format!("{}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}

#[derive(Debug)]
struct FlowState {
    phase: ChallengePhase,
    email: Option<String>,
    remaining: i64,
    can_resend: bool,
    busy: bool,
    info: Option<String>,
    info_gen: u64,
    error: Option<String>,
    error_gen: u64,
}

impl FlowState {
    fn new() -> Self {
        Self {
            phase: ChallengePhase::AwaitingCode,
            email: None,
            remaining: 0,
            can_resend: false,
            busy: false,
            info: None,
            info_gen: 0,
            error: None,
            error_gen: 0,
        }
    }

    fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            phase: self.phase,
            remaining: self.remaining,
            can_resend: self.can_resend,
            busy: self.busy,
            info: self.info.clone(),
            error: self.error.clone(),
        }
    }
}

struct Inner {
    flow: VerificationFlow,
    api: Arc<dyn VerificationApi>,
    sessions: SessionStore,
    navigator: Arc<dyn Navigator>,
    throttle: ResendThrottle,
    state: Mutex<FlowState>,
    countdown: Mutex<Option<JoinHandle<()>>>,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

/// Controller for one OTP verification challenge
///
/// Call `begin()` once after construction; it resolves the pending email,
/// fetches the authoritative expiry and starts the countdown. Dropping the
/// controller releases the countdown and every scheduled banner/redirect.
pub struct OtpController {
    inner: Arc<Inner>,
}

impl OtpController {
    /// Create a controller for the given flow
    pub fn new(
        flow: VerificationFlow,
        api: Arc<dyn VerificationApi>,
        sessions: SessionStore,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                flow,
                api,
                sessions,
                navigator,
                throttle: ResendThrottle::new(),
                state: Mutex::new(FlowState::new()),
                countdown: Mutex::new(None),
                timers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Enter the flow: resolve the pending email and load the expiry
    ///
    /// With no pending email there is nothing to verify; the user is sent
    /// straight back to the flow's entry page.
    pub async fn begin(&self) {
        let inner = &self.inner;
        let Some(email) = inner.sessions.challenge_email() else {
            tracing::info!(flow = %inner.flow, "no pending email; leaving flow");
            inner.lock_state().phase = ChallengePhase::Expired;
            inner.navigator.navigate(inner.flow.entry_route());
            return;
        };

        inner.lock_state().email = Some(email.clone());
        inner.load_expiry(&email).await;
    }

    /// Submit the emailed code
    pub async fn submit_code(&self, otp: &str) {
        let inner = &self.inner;
        let email = {
            let mut st = inner.lock_state();
            if st.phase != ChallengePhase::AwaitingCode || st.busy {
                return;
            }
            let Some(email) = st.email.clone() else {
                return;
            };
            st.busy = true;
            email
        };

        if let Err(err) = validate_otp(otp) {
            inner.lock_state().busy = false;
            inner.show_error(err.display_message());
            return;
        }

        let result = inner.api.verify_code(inner.flow, &email, otp.trim()).await;
        inner.lock_state().busy = false;

        match result {
            Ok(()) => {
                inner.lock_state().phase = ChallengePhase::Verified;
                if inner.flow.requires_new_credential() {
                    inner.lock_state().phase = ChallengePhase::AwaitingNewCredential;
                    tracing::info!(flow = %inner.flow, "code verified; awaiting new password");
                    inner.show_info("OTP verified. Set your new password.");
                } else {
                    inner.complete(
                        "OTP verified successfully. Redirecting to login...",
                        SIGNUP_DONE_REDIRECT,
                    );
                }
            }
            // A rejected code is not fatal: stay in AwaitingCode
            Err(err) => inner.show_error(err.display_message()),
        }
    }

    /// Ask for a fresh code
    ///
    /// A no-op while another resend is in flight. Outside the resend window
    /// the user is told to wait; on success the countdown restarts from the
    /// newly fetched authoritative expiry.
    pub async fn resend(&self) {
        let inner = &self.inner;
        {
            let st = inner.lock_state();
            if st.phase != ChallengePhase::AwaitingCode || st.busy {
                return;
            }
        }
        let Some(_permit) = inner.throttle.try_acquire() else {
            return;
        };

        let (can_resend, email) = {
            let st = inner.lock_state();
            (st.can_resend, st.email.clone())
        };
        if !can_resend {
            inner.show_error("Please wait before resending OTP.");
            return;
        }
        let Some(email) = email else {
            return;
        };

        {
            let mut st = inner.lock_state();
            st.can_resend = false;
            st.busy = true;
        }

        let result = inner.api.resend_code(inner.flow, &email).await;
        inner.lock_state().busy = false;

        match result {
            Ok(()) => {
                inner.show_info("New OTP sent to your email.");
                inner.load_expiry(&email).await;
            }
            // can_resend recomputes from the running countdown on the next tick
            Err(err) => inner.show_error(err.display_message()),
        }
        // permit drops here on every path
    }

    /// Set the new password (forgot-password flow only)
    ///
    /// Strength and match checks run before any network call. A failed reset
    /// call is fatal to the flow instance.
    pub async fn submit_new_password(&self, new_password: &str, confirm: &str) {
        let inner = &self.inner;
        let email = {
            let mut st = inner.lock_state();
            if st.phase != ChallengePhase::AwaitingNewCredential || st.busy {
                return;
            }
            let Some(email) = st.email.clone() else {
                return;
            };
            st.busy = true;
            email
        };

        if let Err(err) = validate_password(new_password)
            .and_then(|()| validate_password_match(new_password, confirm))
        {
            inner.lock_state().busy = false;
            inner.show_error(err.display_message());
            return;
        }

        let result = inner.api.reset_password(&email, new_password).await;
        inner.lock_state().busy = false;

        match result {
            Ok(()) => inner.complete(
                "Password reset successful. Redirecting to login...",
                RESET_DONE_REDIRECT,
            ),
            Err(err) => inner.fail_flow(err.display_message(), FAILURE_REDIRECT),
        }
    }

    /// Current view of the flow
    pub fn snapshot(&self) -> FlowSnapshot {
        self.inner.lock_state().snapshot()
    }

    /// Current phase
    pub fn phase(&self) -> ChallengePhase {
        self.inner.lock_state().phase
    }
}

impl Drop for OtpController {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

impl Inner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, FlowState> {
        self.state.lock().expect("flow state lock poisoned")
    }

    /// Fetch the authoritative expiry and (re)start the countdown
    async fn load_expiry(self: &Arc<Self>, email: &str) {
        match self.api.otp_expiry(self.flow, email).await {
            Ok(expires_at) => {
                let challenge = Challenge::new(email, expires_at);
                let remaining = challenge.remaining_secs(Utc::now());
                tracing::debug!(flow = %self.flow, remaining, "expiry loaded");
                self.lock_state().phase = ChallengePhase::AwaitingCode;
                self.start_countdown(remaining);
                self.show_info("OTP has been sent to your email.");
            }
            Err(err) => self.fail_flow(err.display_message(), FAILURE_REDIRECT),
        }
    }

    fn start_countdown(self: &Arc<Self>, remaining: i64) {
        {
            let mut st = self.lock_state();
            st.remaining = remaining;
            st.can_resend = remaining > 0 && remaining <= RESEND_WINDOW_SECS;
        }
        self.abort_countdown();

        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(TICK).await;
                let elapsed = {
                    let mut st = inner.lock_state();
                    if st.phase != ChallengePhase::AwaitingCode {
                        return;
                    }
                    st.remaining = (st.remaining - 1).max(0);
                    st.can_resend = st.remaining > 0 && st.remaining <= RESEND_WINDOW_SECS;
                    st.remaining == 0
                };
                if elapsed {
                    inner.countdown_elapsed();
                    return;
                }
            }
        });
        *self.countdown.lock().expect("countdown lock poisoned") = Some(handle);
    }

    fn countdown_elapsed(self: &Arc<Self>) {
        let message = match self.flow {
            VerificationFlow::Signup => "OTP expired. Redirecting to signup...",
            VerificationFlow::PasswordReset => "OTP expired. Redirecting to login...",
        };
        self.fail_flow(message, EXPIRED_REDIRECT);
    }

    /// Transition to Expired: the flow is dead and must be restarted from
    /// its entry page. At most one terminal transition ever happens.
    fn fail_flow(self: &Arc<Self>, message: impl Into<String>, delay: Duration) {
        if !self.enter_terminal(ChallengePhase::Expired) {
            return;
        }
        self.show_error(message.into());
        self.schedule_navigate(self.flow.entry_route(), delay);
    }

    /// Transition to Complete and head back to login
    fn complete(self: &Arc<Self>, message: &str, delay: Duration) {
        if !self.enter_terminal(ChallengePhase::Complete) {
            return;
        }
        self.show_info(message);
        self.schedule_navigate(Route::Login, delay);
    }

    /// Claim a terminal phase; false if one was already entered
    fn enter_terminal(self: &Arc<Self>, phase: ChallengePhase) -> bool {
        {
            let mut st = self.lock_state();
            if st.phase.is_terminal() {
                return false;
            }
            st.phase = phase;
            st.can_resend = false;
        }
        tracing::info!(flow = %self.flow, %phase, "flow finished");
        self.abort_countdown();
        self.sessions.clear_challenge_email();
        true
    }

    fn abort_countdown(&self) {
        if let Some(handle) = self.countdown.lock().expect("countdown lock poisoned").take() {
            handle.abort();
        }
    }

    fn schedule_navigate(self: &Arc<Self>, route: Route, delay: Duration) {
        let navigator = Arc::clone(&self.navigator);
        self.push_timer(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate(route);
        }));
    }

    fn show_info(self: &Arc<Self>, message: impl Into<String>) {
        let generation = {
            let mut st = self.lock_state();
            st.info = Some(message.into());
            st.info_gen += 1;
            st.info_gen
        };
        let inner = Arc::clone(self);
        self.push_timer(tokio::spawn(async move {
            tokio::time::sleep(BANNER_TTL).await;
            let mut st = inner.lock_state();
            // A newer banner owns the slot now
            if st.info_gen == generation {
                st.info = None;
            }
        }));
    }

    fn show_error(self: &Arc<Self>, message: impl Into<String>) {
        let generation = {
            let mut st = self.lock_state();
            st.error = Some(message.into());
            st.error_gen += 1;
            st.error_gen
        };
        let inner = Arc::clone(self);
        self.push_timer(tokio::spawn(async move {
            tokio::time::sleep(BANNER_TTL).await;
            let mut st = inner.lock_state();
            if st.error_gen == generation {
                st.error = None;
            }
        }));
    }

    fn push_timer(&self, handle: JoinHandle<()>) {
        let mut timers = self.timers.lock().expect("timers lock poisoned");
        timers.retain(|h| !h.is_finished());
        timers.push(handle);
    }

    fn shutdown(&self) {
        self.abort_countdown();
        for handle in self.timers.lock().expect("timers lock poisoned").drain(..) {
            handle.abort();
        }
    }
}
