//! Versioned encoding of session keys into cookie values.
//!
//! A cookie value reads `v=<version>;k=<token>`. The version selects the
//! token format; versions this build does not implement are rejected outright.
//!
//! Version 2 tokens are `base64url(key || HMAC-SHA256(secret, "v=2;" || key))`.
//! The tag is checked before the key is handed to the session store.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{digest::generic_array::GenericArray, Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretBox};
use sha2::Sha256;
use std::fmt;
use thiserror::Error;

use super::store::{SessionKey, SESSION_KEY_LEN};

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "CockpitAuth";

/// HMAC-SHA256 block size; shorter secrets would be zero padded anyway.
pub const COOKIE_SECRET_LEN: usize = 64;

const TAG_LEN: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CookieVersion {
    V2,
}

impl CookieVersion {
    /// Version used for every newly issued cookie.
    pub const LATEST: Self = Self::V2;

    #[must_use]
    pub const fn number(self) -> u32 {
        match self {
            Self::V2 => 2,
        }
    }

    #[must_use]
    pub const fn from_number(number: u32) -> Option<Self> {
        match number {
            2 => Some(Self::V2),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CookieError {
    #[error("malformed cookie value")]
    Malformed,
    #[error("unsupported cookie version {0}")]
    UnsupportedVersion(u32),
    #[error("cookie integrity check failed")]
    Integrity,
}

pub struct CookieCodec {
    secret: SecretBox<[u8; COOKIE_SECRET_LEN]>,
}

impl CookieCodec {
    #[must_use]
    pub fn new(secret: [u8; COOKIE_SECRET_LEN]) -> Self {
        Self {
            secret: SecretBox::new(Box::new(secret)),
        }
    }

    /// Codec keyed by a random per-process secret.
    ///
    /// # Errors
    /// Returns an error if the OS random source fails.
    pub fn generate() -> Result<Self> {
        let mut secret = [0u8; COOKIE_SECRET_LEN];
        OsRng
            .try_fill_bytes(&mut secret)
            .context("failed to generate cookie secret")?;
        Ok(Self::new(secret))
    }

    /// Encode `key` as `v=<version>;k=<token>`.
    #[must_use]
    pub fn encode(&self, key: &SessionKey, version: CookieVersion) -> String {
        let token = match version {
            CookieVersion::V2 => self.encode_v2(key),
        };
        format!("v={};k={token}", version.number())
    }

    /// Parse and authenticate a cookie value.
    ///
    /// # Errors
    /// `Malformed` when the grammar does not match, `UnsupportedVersion` for a
    /// version this codec does not implement, `Integrity` when the token fails
    /// its version's checks.
    pub fn decode(&self, value: &str) -> Result<(CookieVersion, SessionKey), CookieError> {
        let (number, token) = split_value(value)?;
        let version =
            CookieVersion::from_number(number).ok_or(CookieError::UnsupportedVersion(number))?;
        let key = match version {
            CookieVersion::V2 => self.decode_v2(token)?,
        };
        Ok((version, key))
    }

    fn encode_v2(&self, key: &SessionKey) -> String {
        let mut raw = Vec::with_capacity(SESSION_KEY_LEN + TAG_LEN);
        raw.extend_from_slice(key.as_bytes());
        raw.extend_from_slice(&self.tag_v2(key.as_bytes()).finalize().into_bytes());
        Base64UrlUnpadded::encode_string(&raw)
    }

    fn decode_v2(&self, token: &str) -> Result<SessionKey, CookieError> {
        let raw = Base64UrlUnpadded::decode_vec(token).map_err(|_| CookieError::Integrity)?;
        if raw.len() != SESSION_KEY_LEN + TAG_LEN {
            return Err(CookieError::Integrity);
        }
        let (key, tag) = raw.split_at(SESSION_KEY_LEN);
        self.tag_v2(key)
            .verify_slice(tag)
            .map_err(|_| CookieError::Integrity)?;
        SessionKey::from_slice(key).ok_or(CookieError::Integrity)
    }

    fn tag_v2(&self, key: &[u8]) -> HmacSha256 {
        let mut mac =
            <HmacSha256 as Mac>::new(GenericArray::from_slice(self.secret.expose_secret()));
        mac.update(b"v=2;");
        mac.update(key);
        mac
    }
}

impl fmt::Debug for CookieCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieCodec").finish_non_exhaustive()
    }
}

fn split_value(value: &str) -> Result<(u32, &str), CookieError> {
    let rest = value.strip_prefix("v=").ok_or(CookieError::Malformed)?;
    let (digits, rest) = rest.split_once(';').ok_or(CookieError::Malformed)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CookieError::Malformed);
    }
    let number = digits.parse::<u32>().map_err(|_| CookieError::Malformed)?;
    let token = rest.strip_prefix("k=").ok_or(CookieError::Malformed)?;
    if token.is_empty() || token.contains(';') {
        return Err(CookieError::Malformed);
    }
    Ok((number, token))
}
