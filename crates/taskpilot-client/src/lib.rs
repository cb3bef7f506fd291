// TaskPilot Client Runtime
//
// The networked half of the client: the authenticated fetch gateway, the
// login/signup/forgot-password entry points, and the OTP verification
// controller with its countdown task.
//
// Key design decisions:
// - Gateway owns the whole request lifecycle: bearer header, response
//   normalization and the uniform 401 reaction (clear session, signal the
//   login route). Call sites receive FetchResult snapshots, never raw errors
// - Verification endpoints sit behind the VerificationApi trait; the HTTP
//   implementation is one of several (in-memory fake for tests)
// - ResendThrottle is a drop-guard mutex: release cannot be forgotten on an
//   early return
// - Every scheduled piece of work (countdown tick, banner expiry, delayed
//   redirect) holds an abortable JoinHandle owned by its controller

pub mod auth;
pub mod gateway;
pub mod memory;
pub mod otp;
pub mod throttle;
pub mod verify;

// Re-exports for convenience
pub use auth::AuthClient;
pub use gateway::{FetchResult, Gateway, Query};
pub use memory::InMemoryVerificationApi;
pub use otp::{FlowSnapshot, OtpController};
pub use throttle::{ResendPermit, ResendThrottle};
pub use verify::{HttpVerificationApi, VerificationApi};
