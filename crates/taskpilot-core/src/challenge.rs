// Verification challenge types
//
// A Challenge tracks one in-progress OTP verification: the email under
// verification, the server-authoritative expiry and the current phase.
// At most one challenge is active per tab; the pending email lives in the
// tab-scoped storage tier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::traits::Route;

/// Phase of an OTP verification challenge
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChallengePhase {
    /// Waiting for the user to submit the emailed code
    AwaitingCode,
    /// Code accepted (transient; immediately advances)
    Verified,
    /// Reset flow only: waiting for the new password
    AwaitingNewCredential,
    /// Flow finished; redirect to login is scheduled
    Complete,
    /// Flow is dead; redirect to the entry page is scheduled
    Expired,
}

impl ChallengePhase {
    /// Whether the flow can take no further input
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChallengePhase::Complete | ChallengePhase::Expired)
    }
}

impl std::fmt::Display for ChallengePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChallengePhase::AwaitingCode => write!(f, "awaiting_code"),
            ChallengePhase::Verified => write!(f, "verified"),
            ChallengePhase::AwaitingNewCredential => write!(f, "awaiting_new_credential"),
            ChallengePhase::Complete => write!(f, "complete"),
            ChallengePhase::Expired => write!(f, "expired"),
        }
    }
}

/// One in-progress OTP verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub email: String,
    /// Server-authoritative expiry; never computed locally
    pub expires_at: DateTime<Utc>,
    pub phase: ChallengePhase,
}

impl Challenge {
    /// Create a challenge in its initial phase
    pub fn new(email: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            email: email.into(),
            expires_at,
            phase: ChallengePhase::AwaitingCode,
        }
    }

    /// Seconds until expiry, rounded to the nearest second and clamped at
    /// zero. Rounding keeps a countdown seeded a few milliseconds after the
    /// server stamped the expiry from starting one second short.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        let millis = (self.expires_at - now).num_milliseconds();
        ((millis + 500) / 1000).max(0)
    }
}

/// Which verification flow a challenge belongs to
///
/// Selects the endpoint prefix and the page the user is sent back to when
/// the flow dies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationFlow {
    /// Post-signup email confirmation
    Signup,
    /// Forgot-password reset
    PasswordReset,
}

impl VerificationFlow {
    /// Entry page to restart the flow from
    pub fn entry_route(&self) -> Route {
        match self {
            VerificationFlow::Signup => Route::Signup,
            VerificationFlow::PasswordReset => Route::Login,
        }
    }

    /// Whether a verified code is followed by a new-password step
    pub fn requires_new_credential(&self) -> bool {
        matches!(self, VerificationFlow::PasswordReset)
    }
}

impl std::fmt::Display for VerificationFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationFlow::Signup => write!(f, "signup"),
            VerificationFlow::PasswordReset => write!(f, "password_reset"),
        }
    }
}
