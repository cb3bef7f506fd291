// TaskPilot Client Core
//
// Transport-agnostic types for the dashboard client: the session store, the
// OTP verification challenge model, response-shape normalization and the
// local field validation rules.
//
// Key design decisions:
// - Persistence and navigation are traits (StorageBackend, Navigator) so the
//   flows can run against in-memory implementations in tests
// - The session store owns two storage tiers: a durable one for the
//   credential/profile and a tab-scoped one for the pending verification email
// - Response bodies are normalized into a closed ResponseData enum once, at
//   the gateway boundary, instead of shape-sniffing at every call site
// - Error handling distinguishes local validation, auth failure, flow expiry
//   and server rejection; consumers only ever see display strings

pub mod challenge;
pub mod error;
pub mod memory;
pub mod normalize;
pub mod session;
pub mod store;
pub mod traits;
pub mod validate;

// Re-exports for convenience
pub use challenge::{Challenge, ChallengePhase, VerificationFlow};
pub use error::{ClientError, Result};
pub use memory::{MemoryStorage, RecordingNavigator};
pub use normalize::ResponseData;
pub use session::{Session, UserProfile};
pub use store::SessionStore;
pub use traits::{Navigator, Route, StorageBackend};
