// Auth flow entry points
//
// Login, signup and forgot-password, layered over the gateway. Field
// validation runs first; a validation failure never reaches the network.
// On success these are the writers of the session store: login saves the
// credential and profile, signup and forgot-password record the pending
// verification email for the OTP flow that follows.

use serde_json::{json, Value};

use taskpilot_core::error::{ClientError, Result};
use taskpilot_core::session::UserProfile;
use taskpilot_core::store::SessionStore;
use taskpilot_core::validate::{normalize_email, validate_email, validate_password};

use crate::gateway::Gateway;

const LOGIN_FALLBACK: &str = "Login failed. Please try again.";

/// Entry points for the unauthenticated flows
#[derive(Debug, Clone)]
pub struct AuthClient {
    gateway: Gateway,
}

impl AuthClient {
    /// Create an auth client over the given gateway
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    fn sessions(&self) -> &SessionStore {
        self.gateway.sessions()
    }

    /// Log in and persist the session
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let email = normalize_email(email);
        validate_email(&email)?;
        if password.trim().is_empty() {
            return Err(ClientError::validation("Password is required"));
        }

        let body = self
            .gateway
            .post("auth/login", &json!({ "email": email, "password": password }))
            .await?;

        let token = body
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::rejected(LOGIN_FALLBACK))?;
        let profile: UserProfile = body
            .get("user")
            .cloned()
            .and_then(|u| serde_json::from_value(u).ok())
            .ok_or_else(|| ClientError::rejected(LOGIN_FALLBACK))?;

        self.sessions().save(token, &profile);
        tracing::info!(user = %profile.id, "logged in");
        Ok(profile)
    }

    /// Register an account and record the pending verification email
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(ClientError::validation("Name is required"));
        }
        let email = normalize_email(email);
        validate_email(&email)?;
        validate_password(password)?;

        self.gateway
            .post(
                "auth/signup",
                &json!({ "name": name.trim(), "email": email, "password": password }),
            )
            .await?;

        self.sessions().set_challenge_email(&email);
        Ok(())
    }

    /// Request a password-reset code and record the pending email
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        validate_email(&email)
            .map_err(|_| ClientError::validation("Please enter a valid email address"))?;

        self.gateway
            .post("auth/forgot-password", &json!({ "email": email }))
            .await?;

        self.sessions().set_challenge_email(&email);
        Ok(())
    }

    /// Destroy the session; no network call
    pub fn logout(&self) {
        self.sessions().clear();
        tracing::info!("logged out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use taskpilot_core::memory::RecordingNavigator;
    use url::Url;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> (AuthClient, SessionStore) {
        let sessions = SessionStore::in_memory();
        let base = Url::parse(&server.uri()).expect("mock server uri");
        let gateway = Gateway::new(base, sessions.clone(), Arc::new(RecordingNavigator::new()));
        (AuthClient::new(gateway), sessions)
    }

    #[tokio::test]
    async fn login_saves_credential_and_profile() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"email": "asha@test.com", "password": "Aa1!aaaa"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "tok-123",
                "user": {"id": "u1", "name": "Asha", "email": "asha@test.com"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, sessions) = client(&server).await;
        // Email is lowercased and trimmed before submission
        let profile = client.login(" Asha@Test.com ", "Aa1!aaaa").await.expect("login");

        assert_eq!(profile.name, "Asha");
        let session = sessions.get();
        assert_eq!(session.credential.as_deref(), Some("tok-123"));
        assert_eq!(session.profile, Some(profile));
    }

    #[tokio::test]
    async fn invalid_email_never_reaches_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (client, _) = client(&server).await;
        let err = client.login("not-an-email", "pw").await.expect_err("blocked");
        assert!(matches!(err, ClientError::Validation(_)));

        let err = client.login("asha@test.com", "   ").await.expect_err("blocked");
        assert_eq!(err.display_message(), "Password is required");
    }

    #[tokio::test]
    async fn login_rejection_surfaces_the_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401),
            )
            .mount(&server)
            .await;

        let (client, sessions) = client(&server).await;
        let err = client.login("asha@test.com", "wrong").await.expect_err("rejected");
        assert_eq!(err.display_message(), "Session expired. Please login again.");
        assert!(sessions.credential().is_none());
    }

    #[tokio::test]
    async fn login_bad_credentials_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let (client, _) = client(&server).await;
        let err = client.login("asha@test.com", "wrong").await.expect_err("rejected");
        assert_eq!(err.display_message(), "Invalid credentials");
    }

    #[tokio::test]
    async fn signup_records_the_pending_email() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/signup"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let (client, sessions) = client(&server).await;
        client
            .signup("Asha", "Asha@Test.com", "Aa1!aaaa")
            .await
            .expect("signup");
        assert_eq!(sessions.challenge_email().as_deref(), Some("asha@test.com"));
    }

    #[tokio::test]
    async fn weak_signup_password_is_blocked_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (client, sessions) = client(&server).await;
        let err = client.signup("Asha", "asha@test.com", "weak").await.expect_err("blocked");
        assert_eq!(
            err.display_message(),
            "Min 8 chars, 1 uppercase, 1 number, 1 special"
        );
        assert!(sessions.challenge_email().is_none());
    }

    #[tokio::test]
    async fn forgot_password_records_the_pending_email() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/forgot-password"))
            .and(body_json(json!({"email": "asha@test.com"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let (client, sessions) = client(&server).await;
        client.forgot_password("asha@test.com").await.expect("sent");
        assert_eq!(sessions.challenge_email().as_deref(), Some("asha@test.com"));
    }

    #[tokio::test]
    async fn logout_clears_the_session() {
        let server = MockServer::start().await;
        let (client, sessions) = client(&server).await;
        sessions.save(
            "tok-123",
            &UserProfile {
                id: "u1".to_string(),
                name: "Asha".to_string(),
                email: "asha@test.com".to_string(),
            },
        );

        client.logout();
        assert!(sessions.get().credential.is_none());
    }
}
