// Session store
//
// The only shared mutable resource in the client. Two storage tiers:
// - durable: credential + profile, survives a restart
// - tab: the pending verification email, scoped to one tab/session
//
// Writers are the gateway (clear on 401) and the login/verification flows;
// everything else only reads.

use std::sync::Arc;

use crate::session::{Session, UserProfile};
use crate::traits::StorageBackend;

/// Durable key for the bearer credential
pub const KEY_TOKEN: &str = "token";
/// Durable key for the serialized user profile
pub const KEY_USER: &str = "user";
/// Tab-scoped key for the email under verification
pub const KEY_PENDING_EMAIL: &str = "pending_email";

/// Process-wide session state over two storage tiers
#[derive(Clone)]
pub struct SessionStore {
    durable: Arc<dyn StorageBackend>,
    tab: Arc<dyn StorageBackend>,
}

impl SessionStore {
    /// Create a store over the given tiers
    pub fn new(durable: Arc<dyn StorageBackend>, tab: Arc<dyn StorageBackend>) -> Self {
        Self { durable, tab }
    }

    /// Create a store over fresh in-memory tiers (tests and examples)
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(crate::memory::MemoryStorage::new()),
            Arc::new(crate::memory::MemoryStorage::new()),
        )
    }

    /// Persist a session after login or post-verification
    pub fn save(&self, credential: &str, profile: &UserProfile) {
        self.durable.set(KEY_TOKEN, credential);
        match serde_json::to_string(profile) {
            Ok(json) => self.durable.set(KEY_USER, &json),
            Err(err) => {
                // A profile is plain strings; this should be unreachable
                tracing::warn!(error = %err, "failed to serialize profile; storing credential only");
                self.durable.remove(KEY_USER);
            }
        }
    }

    /// Destroy the session (logout, 401, explicit user action)
    pub fn clear(&self) {
        self.durable.remove(KEY_TOKEN);
        self.durable.remove(KEY_USER);
    }

    /// Read the current session
    ///
    /// A corrupt persisted profile reads back as absent rather than failing;
    /// the credential is what actually authenticates requests.
    pub fn get(&self) -> Session {
        let credential = self.durable.get(KEY_TOKEN);
        let profile = self
            .durable
            .get(KEY_USER)
            .and_then(|json| serde_json::from_str::<UserProfile>(&json).ok());
        Session {
            credential,
            profile,
        }
    }

    /// Read just the credential
    pub fn credential(&self) -> Option<String> {
        self.durable.get(KEY_TOKEN)
    }

    /// Record the email an OTP challenge was issued for (tab tier)
    pub fn set_challenge_email(&self, email: &str) {
        self.tab.set(KEY_PENDING_EMAIL, email);
    }

    /// Email of the in-progress challenge, if any
    pub fn challenge_email(&self) -> Option<String> {
        self.tab.get(KEY_PENDING_EMAIL)
    }

    /// Forget the in-progress challenge
    pub fn clear_challenge_email(&self) {
        self.tab.remove(KEY_PENDING_EMAIL);
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.credential().is_some())
            .field("challenge_email", &self.challenge_email())
            .finish()
    }
}
