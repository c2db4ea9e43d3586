//! Auth configuration.

#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    cookie_secure: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark issued cookies `Secure`; enable when served over HTTPS.
    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}
