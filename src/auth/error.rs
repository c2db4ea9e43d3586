use thiserror::Error;

/// Failures reported to a login caller.
///
/// Cookie checks never produce one of these; they collapse every problem into
/// "no credential".
#[derive(Debug, Error)]
pub enum AuthError {
    /// The login payload is structurally malformed.
    #[error("invalid login data: {0}")]
    InvalidData(&'static str),
    /// The verifier rejected well-formed credentials.
    #[error("authentication failed")]
    AuthenticationFailed,
    /// The verifier could not reach a verdict.
    #[error("authentication backend unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Short, stable label used in logs and response bodies.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidData(_) => "invalid-data",
            Self::AuthenticationFailed => "authentication-failed",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal",
        }
    }
}
