//! Password login and session cookies.
//!
//! Flow overview: `login` splits the payload, asks the configured
//! [`CredentialVerifier`], stores the resulting [`Credential`] under a fresh
//! session key and sets a versioned cookie. `check_cookie` walks the same
//! path backwards and returns the credential, or nothing.
//!
//! ## Cookie versions
//!
//! Only version 2 is issued and accepted. A new version gets its own arm in
//! the codec's dispatch; older arms keep decoding what they always decoded.
//!
//! > **Warning:** The cookie secret is generated per process. Restarting the
//! > service invalidates every issued cookie, together with the in-memory
//! > sessions they point to.

mod config;
mod cookie;
mod creds;
mod error;
mod service;
mod session;
mod store;
mod verifier;

pub use config::AuthConfig;
pub use cookie::{CookieCodec, CookieError, CookieVersion, COOKIE_NAME, COOKIE_SECRET_LEN};
pub use creds::Credential;
pub use error::AuthError;
pub use service::{spawn_session_reaper, AuthService};
pub use store::{SessionKey, SessionStore, DEFAULT_SESSION_TTL_SECONDS, SESSION_KEY_LEN};
pub use verifier::{CredentialVerifier, RemoteVerifier, StaticVerifier};
