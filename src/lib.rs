//! # wsauth (cookie session authentication)
//!
//! `wsauth` verifies a username/password pair against a pluggable backend and
//! issues a versioned session cookie, so later requests can recover the same
//! credential without sending the password again.
//!
//! ## Login and cookie check
//!
//! - **Login** is loud: a malformed payload fails with `InvalidData`, a rejected
//!   pair with `AuthenticationFailed`. No cookie is set on failure.
//! - **Cookie check** is silent: a missing, stale, forged or unsupported cookie
//!   looks exactly like an anonymous request.
//!
//! ## Sessions
//!
//! Sessions live in memory only and do not survive a restart. The cookie
//! carries the session key together with an HMAC tag keyed by a per-process
//! secret, and the store indexes entries by a digest of the key.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
