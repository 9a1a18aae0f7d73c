// Authentication endpoints
//
// Email/password login issues a bearer token that the client keeps for
// every later request. Logout is best-effort on the server side; the
// local token is always dropped.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::types::{LoginRequest, LoginResponse, User};

/// Token and profile returned by a successful login.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub token: SecretString,
    pub user: User,
}

impl ApiClient {
    /// Authenticate with email and password.
    ///
    /// `POST auth/login`. On success the issued token is installed on this
    /// client and returned alongside the user profile.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<LoginGrant, Error> {
        debug!(email, "logging in");
        // A stale token must not turn a credential failure into SessionExpired.
        self.set_token(None);

        let resp: LoginResponse = self
            .post(
                "auth/login",
                &LoginRequest {
                    email,
                    password: password.expose_secret(),
                },
            )
            .await
            .map_err(|e| match e {
                Error::Validation { message, .. } => Error::Authentication { message },
                other => other,
            })?;

        let token = SecretString::from(resp.token);
        self.set_token(Some(token.clone()));
        debug!(user_id = %resp.user.id, "login successful");

        Ok(LoginGrant {
            token,
            user: resp.user,
        })
    }

    /// `GET auth/profile` for the current token.
    pub async fn get_profile(&self) -> Result<User, Error> {
        self.get("auth/profile").await
    }

    /// End the current session.
    ///
    /// `POST auth/logout`. The local token is cleared even when the
    /// server call fails.
    pub async fn logout(&self) -> Result<(), Error> {
        debug!("logging out");
        let result = self.post_no_response("auth/logout").await;
        self.set_token(None);
        result
    }
}
