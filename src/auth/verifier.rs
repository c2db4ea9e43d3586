//! Pluggable password verification backends.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

use super::{creds::Credential, error::AuthError};

/// Decides whether a `(user, password)` pair is valid.
///
/// Implementations return `AuthenticationFailed` for a negative verdict and
/// reserve `Unavailable` for backends that could not decide.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, user: &str, password: SecretString) -> Result<Credential, AuthError>;
}

/// Accepts exactly one fixed pair.
pub struct StaticVerifier {
    user: String,
    password: SecretString,
    allow_empty_password: bool,
}

impl StaticVerifier {
    #[must_use]
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: SecretString::from(password.into()),
            allow_empty_password: false,
        }
    }

    #[must_use]
    pub fn allow_empty_password(mut self, allow: bool) -> Self {
        self.allow_empty_password = allow;
        self
    }
}

#[async_trait]
impl CredentialVerifier for StaticVerifier {
    #[instrument(skip(self, password))]
    async fn verify(&self, user: &str, password: SecretString) -> Result<Credential, AuthError> {
        if password.expose_secret().is_empty() && !self.allow_empty_password {
            debug!("empty password rejected by policy");
            return Err(AuthError::AuthenticationFailed);
        }

        let password_matches = secrets_match(
            password.expose_secret().as_bytes(),
            self.password.expose_secret().as_bytes(),
        );
        if user == self.user && password_matches {
            Ok(Credential::new(user, password))
        } else {
            Err(AuthError::AuthenticationFailed)
        }
    }
}

/// Constant-time comparison of the SHA-256 digests of both secrets.
fn secrets_match(given: &[u8], expected: &[u8]) -> bool {
    let given = Sha256::digest(given);
    let expected = Sha256::digest(expected);
    given
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    user: &'a str,
    password: &'a str,
}

/// Delegates the verdict to an HTTP endpoint.
///
/// The endpoint receives `{"user": .., "password": ..}` and answers with a
/// 2xx status to accept, 401 or 403 to reject. Anything else means the
/// backend is unavailable.
#[derive(Debug)]
pub struct RemoteVerifier {
    client: Client,
    url: Url,
    allow_empty_password: bool,
}

impl RemoteVerifier {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url,
            allow_empty_password: false,
        })
    }

    #[must_use]
    pub fn allow_empty_password(mut self, allow: bool) -> Self {
        self.allow_empty_password = allow;
        self
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl CredentialVerifier for RemoteVerifier {
    #[instrument(skip(self, password), fields(url = %self.url))]
    async fn verify(&self, user: &str, password: SecretString) -> Result<Credential, AuthError> {
        if password.expose_secret().is_empty() && !self.allow_empty_password {
            debug!("empty password rejected by policy");
            return Err(AuthError::AuthenticationFailed);
        }

        let request = VerifyRequest {
            user,
            password: password.expose_secret(),
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Error contacting verifier: {}", e);

                AuthError::Unavailable(e.to_string())
            })?;

        let status = response.status();

        if status.is_success() {
            Ok(Credential::new(user, password))
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            debug!("verifier rejected credentials: {}", status);

            Err(AuthError::AuthenticationFailed)
        } else {
            error!("Verifier returned unexpected status: {}", status);

            Err(AuthError::Unavailable(format!(
                "verifier returned {status}"
            )))
        }
    }
}
