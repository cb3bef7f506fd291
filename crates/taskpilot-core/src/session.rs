// Session domain types
//
// The authenticated session: an opaque bearer credential plus the profile
// the server returned at login. Owned exclusively by the SessionStore.

use serde::{Deserialize, Serialize};

/// Profile of the logged-in user, as returned by the login endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// The current session, read back from durable storage
///
/// Both fields are absent when logged out; the profile can also be absent on
/// its own if the persisted record failed to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Opaque bearer token
    pub credential: Option<String>,
    pub profile: Option<UserProfile>,
}

impl Session {
    /// Whether a credential is present
    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }
}
