//! Login and cookie-check orchestration.

use axum::http::{header::SET_COOKIE, HeaderMap};
use secrecy::SecretString;
use std::{fmt, str, sync::Arc};
use tracing::{debug, error, info, instrument, warn};

use super::{
    config::AuthConfig,
    cookie::{CookieCodec, CookieVersion},
    creds::Credential,
    error::AuthError,
    session::{clear_session_cookie, extract_session_values, session_cookie},
    store::{SessionKey, SessionStore},
    verifier::CredentialVerifier,
};

pub struct AuthService {
    config: AuthConfig,
    verifier: Arc<dyn CredentialVerifier>,
    store: SessionStore,
    codec: CookieCodec,
}

impl AuthService {
    /// The store's TTL drives cookie `Max-Age`, expiry and reaping alike.
    #[must_use]
    pub fn new(
        config: AuthConfig,
        verifier: Arc<dyn CredentialVerifier>,
        store: SessionStore,
        codec: CookieCodec,
    ) -> Self {
        Self {
            config,
            verifier,
            store,
            codec,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Verify `user\npassword` and start a session.
    ///
    /// On success exactly one `Set-Cookie` entry is appended to `headers`; on
    /// failure `headers` is left untouched. The verifier call is the only
    /// point where this future yields.
    ///
    /// # Errors
    /// `InvalidData` for a malformed payload, `AuthenticationFailed` when the
    /// verifier rejects the pair, `Unavailable` when it cannot decide.
    #[instrument(skip_all)]
    pub async fn login(
        &self,
        input: &[u8],
        headers: &mut HeaderMap,
    ) -> Result<Credential, AuthError> {
        let (user, password) = parse_login(input).map_err(|err| {
            debug!("rejected login payload: {}", err);
            err
        })?;

        let credential = match self.verifier.verify(&user, password).await {
            Ok(credential) => credential,
            Err(err) => {
                warn!(user = %user, "login failed: {}", err);
                return Err(err);
            }
        };

        let key = self.store.create(credential.clone())?;
        let value = self.codec.encode(&key, CookieVersion::LATEST);

        let cookie = match session_cookie(&value, self.store.ttl(), self.config.cookie_secure()) {
            Ok(cookie) => cookie,
            Err(err) => {
                self.store.remove(&key);
                return Err(AuthError::Internal(
                    anyhow::Error::new(err).context("failed to build session cookie"),
                ));
            }
        };
        headers.append(SET_COOKIE, cookie);

        info!(user = %credential.user(), "login succeeded");

        Ok(credential)
    }

    /// Resolve the request's session cookie to a credential.
    ///
    /// Every failure (no cookie, unsupported version, bad tag, unknown or
    /// expired session) yields `None`, indistinguishable from an anonymous
    /// request. When several session cookies are sent, the first one naming
    /// a live session wins.
    #[must_use]
    pub fn check_cookie(&self, headers: &HeaderMap) -> Option<Credential> {
        let credential = extract_session_values(headers)
            .iter()
            .filter_map(|value| self.decode_key(value))
            .find_map(|key| self.store.lookup(&key));
        if credential.is_none() {
            debug!("no session cookie names a live session");
        }
        credential
    }

    /// End the sessions named by the request cookies, if any, and append a
    /// clearing `Set-Cookie` to `response` regardless.
    ///
    /// Returns whether a live session was removed.
    pub fn logout(&self, request: &HeaderMap, response: &mut HeaderMap) -> bool {
        let removed = extract_session_values(request)
            .iter()
            .filter_map(|value| self.decode_key(value))
            .fold(false, |removed, key| self.store.remove(&key) || removed);

        match clear_session_cookie(self.config.cookie_secure()) {
            Ok(cookie) => {
                response.append(SET_COOKIE, cookie);
            }
            Err(err) => error!("Failed to build clearing cookie: {}", err),
        }

        if removed {
            info!("session ended");
        }

        removed
    }

    fn decode_key(&self, value: &str) -> Option<SessionKey> {
        match self.codec.decode(value) {
            Ok((_, key)) => Some(key),
            Err(err) => {
                debug!("ignoring session cookie: {}", err);
                None
            }
        }
    }

    /// Drop expired sessions; returns how many were evicted.
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Split a login payload at its first `\n` into `(user, password)`.
///
/// The password is every remaining byte and may be empty; whether an empty
/// password is acceptable is the verifier's call.
pub(crate) fn parse_login(input: &[u8]) -> Result<(String, SecretString), AuthError> {
    let newline = input
        .iter()
        .position(|&byte| byte == b'\n')
        .ok_or(AuthError::InvalidData("missing newline delimiter"))?;

    let user = str::from_utf8(&input[..newline])
        .map_err(|_| AuthError::InvalidData("user is not valid UTF-8"))?;
    if user.is_empty() {
        return Err(AuthError::InvalidData("empty user"));
    }

    let password = String::from_utf8(input[newline + 1..].to_vec())
        .map_err(|_| AuthError::InvalidData("password is not valid UTF-8"))?;

    Ok((user.to_string(), SecretString::from(password)))
}

/// Spawn a task that evicts expired sessions every `period`.
///
/// Does nothing when sessions never expire.
pub fn spawn_session_reaper(service: Arc<AuthService>, period: std::time::Duration) {
    if service.store.ttl().is_none() {
        return;
    }
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let purged = service.purge_expired();
            if purged > 0 {
                debug!("purged {} expired sessions", purged);
            }
        }
    });
}
