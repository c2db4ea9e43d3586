//! Verified credentials shared between callers and the session store.

use secrecy::{ExposeSecret, SecretString};
use std::{fmt, sync::Arc};

struct Inner {
    user: String,
    password: SecretString,
}

/// A verified `(user, password)` pair.
///
/// Cloning hands out another reference to the same immutable value; the
/// secret is released when the last holder drops it.
#[derive(Clone)]
pub struct Credential {
    inner: Arc<Inner>,
}

impl Credential {
    /// Verifiers call this once the backend accepted the pair.
    #[must_use]
    pub fn new(user: impl Into<String>, password: SecretString) -> Self {
        Self {
            inner: Arc::new(Inner {
                user: user.into(),
                password,
            }),
        }
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.inner.user
    }

    #[must_use]
    pub fn password(&self) -> &str {
        self.inner.password.expose_secret()
    }

    /// Number of live references to this credential.
    #[must_use]
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.user() == other.user() && self.password() == other.password()
    }
}

impl Eq for Credential {}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user", &self.inner.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(user: &str, password: &str) -> Credential {
        Credential::new(user, SecretString::from(password.to_string()))
    }

    #[test]
    fn accessors_return_values() {
        let c = creds("me", "this is the password");
        assert_eq!(c.user(), "me");
        assert_eq!(c.password(), "this is the password");
    }

    #[test]
    fn equality_is_by_value() {
        assert_eq!(creds("me", "pw"), creds("me", "pw"));
        assert_ne!(creds("me", "pw"), creds("me", "other"));
        assert_ne!(creds("me", "pw"), creds("you", "pw"));
    }

    #[test]
    fn clones_share_and_release() {
        let first = creds("me", "pw");
        let second = first.clone();
        assert_eq!(first.holders(), 2);
        drop(second);
        assert_eq!(first.holders(), 1);
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", creds("me", "hunter2"));
        assert!(rendered.contains("me"));
        assert!(!rendered.contains("hunter2"));
    }
}
