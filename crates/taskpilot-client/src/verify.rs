// Verification API
//
// The four server operations behind the OTP flows, as a trait so the
// controller can run against an in-memory fake. The HTTP implementation
// rides on the gateway and inherits its error mapping.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use taskpilot_core::challenge::VerificationFlow;
use taskpilot_core::error::{ClientError, Result};

use crate::gateway::Gateway;

/// Shown when the expiry lookup fails or returns nothing usable
pub const EXPIRY_INVALID: &str = "OTP expired or invalid";

/// Server operations for one verification flow
#[async_trait]
pub trait VerificationApi: Send + Sync {
    /// Authoritative expiry of the outstanding code for this email
    ///
    /// Any failure here is fatal to the flow, so everything maps to
    /// `ClientError::Expired`.
    async fn otp_expiry(&self, flow: VerificationFlow, email: &str) -> Result<DateTime<Utc>>;

    /// Submit a code for verification
    async fn verify_code(&self, flow: VerificationFlow, email: &str, otp: &str) -> Result<()>;

    /// Ask the server to email a fresh code
    async fn resend_code(&self, flow: VerificationFlow, email: &str) -> Result<()>;

    /// Set a new password (forgot-password flow only)
    async fn reset_password(&self, email: &str, new_password: &str) -> Result<()>;
}

/// Endpoint prefix for a flow's verification routes
fn flow_prefix(flow: VerificationFlow) -> &'static str {
    match flow {
        VerificationFlow::Signup => "auth/signup",
        VerificationFlow::PasswordReset => "auth/forgot-password",
    }
}

/// HTTP implementation over the gateway
#[derive(Debug, Clone)]
pub struct HttpVerificationApi {
    gateway: Gateway,
}

impl HttpVerificationApi {
    /// Create an API over the given gateway
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl VerificationApi for HttpVerificationApi {
    async fn otp_expiry(&self, flow: VerificationFlow, email: &str) -> Result<DateTime<Utc>> {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("email", email)
            .finish();
        let path = format!("{}/otp-expiry?{}", flow_prefix(flow), query);
        let body = self
            .gateway
            .get(&path)
            .await
            .map_err(|err| {
                tracing::warn!(%flow, error = %err, "expiry lookup failed");
                ClientError::expired(EXPIRY_INVALID)
            })?;

        body.get("expiresAt")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| ClientError::expired(EXPIRY_INVALID))
    }

    async fn verify_code(&self, flow: VerificationFlow, email: &str, otp: &str) -> Result<()> {
        let path = format!("{}/verify", flow_prefix(flow));
        self.gateway
            .post(&path, &json!({ "email": email, "otp": otp }))
            .await
            .map(|_| ())
    }

    async fn resend_code(&self, flow: VerificationFlow, email: &str) -> Result<()> {
        let path = format!("{}/resend-otp", flow_prefix(flow));
        self.gateway
            .post(&path, &json!({ "email": email }))
            .await
            .map(|_| ())
    }

    async fn reset_password(&self, email: &str, new_password: &str) -> Result<()> {
        self.gateway
            .post(
                "auth/reset-password",
                &json!({ "email": email, "newPassword": new_password }),
            )
            .await
            .map(|_| ())
    }
}
