//! In-memory session table.
//!
//! Entries are indexed by a SHA-256 digest of the session key, so the raw key
//! only ever lives in the client's cookie and in transit.

use anyhow::{anyhow, Context, Result};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::{
    collections::{hash_map::Entry, HashMap},
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::time::Instant;
use tracing::{debug, error};

use super::creds::Credential;

pub const SESSION_KEY_LEN: usize = 32;

/// Session lifetime used when none is configured.
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;

const MAX_KEY_ATTEMPTS: usize = 3;

type KeyDigest = [u8; 32];

/// Random identifier of one active login.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

impl SessionKey {
    /// Draw a fresh key from the OS random source.
    ///
    /// # Errors
    /// Returns an error if the OS random source fails.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; SESSION_KEY_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .context("failed to generate session key")?;
        Ok(Self(bytes))
    }

    /// Rebuild a key from decoded cookie bytes; `None` on a length mismatch.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; SESSION_KEY_LEN]>::try_from(bytes).ok().map(Self)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn digest(&self) -> KeyDigest {
        let mut out = [0u8; 32];
        out.copy_from_slice(&Sha256::digest(self.0));
        out
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

struct SessionEntry {
    credential: Credential,
    created_at: Instant,
}

pub struct SessionStore {
    ttl: Option<Duration>,
    key_source: fn() -> Result<SessionKey>,
    sessions: Mutex<HashMap<KeyDigest, SessionEntry>>,
}

impl SessionStore {
    /// Create an empty store. `ttl` of `None` keeps sessions until removed.
    #[must_use]
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            key_source: SessionKey::generate,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create an empty store whose sessions live `seconds`; `0` disables expiry.
    #[must_use]
    pub fn with_ttl_seconds(seconds: u64) -> Self {
        Self::new((seconds > 0).then(|| Duration::from_secs(seconds)))
    }

    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Register a credential under a freshly generated key.
    ///
    /// Key generation and insertion happen under the same lock, so two
    /// concurrent calls can never be handed the same key.
    ///
    /// # Errors
    /// Returns an error if the random source fails or keeps producing keys
    /// that are already live.
    pub fn create(&self, credential: Credential) -> Result<SessionKey> {
        let mut sessions = self.sessions();
        self.retain_live(&mut sessions);

        for _ in 0..MAX_KEY_ATTEMPTS {
            let key = (self.key_source)()?;
            match sessions.entry(key.digest()) {
                Entry::Occupied(_) => {
                    error!("session key collision with a live entry");
                }
                Entry::Vacant(slot) => {
                    slot.insert(SessionEntry {
                        credential,
                        created_at: Instant::now(),
                    });
                    debug!("session created, {} live", sessions.len());
                    return Ok(key);
                }
            }
        }

        Err(anyhow!(
            "session key collided with a live entry {MAX_KEY_ATTEMPTS} times"
        ))
    }

    /// Return a new reference to the credential behind `key`, if it is live.
    ///
    /// Expired entries are evicted on the way.
    #[must_use]
    pub fn lookup(&self, key: &SessionKey) -> Option<Credential> {
        let digest = key.digest();
        let mut sessions = self.sessions();
        let live = sessions
            .get(&digest)
            .map(|entry| self.is_live(entry))?;
        if live {
            sessions.get(&digest).map(|entry| entry.credential.clone())
        } else {
            sessions.remove(&digest);
            debug!("expired session evicted on lookup");
            None
        }
    }

    /// Drop the session behind `key`. Removing an unknown key is a no-op.
    ///
    /// Returns whether a live session was removed.
    pub fn remove(&self, key: &SessionKey) -> bool {
        self.sessions()
            .remove(&key.digest())
            .is_some_and(|entry| self.is_live(&entry))
    }

    /// Evict every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions();
        self.retain_live(&mut sessions)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_live(&self, entry: &SessionEntry) -> bool {
        self.ttl
            .map_or(true, |ttl| entry.created_at.elapsed() < ttl)
    }

    fn retain_live(&self, sessions: &mut HashMap<KeyDigest, SessionEntry>) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| self.is_live(entry));
        before - sessions.len()
    }

    // A panic while holding the lock cannot leave the map half-updated.
    fn sessions(&self) -> MutexGuard<'_, HashMap<KeyDigest, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("ttl", &self.ttl)
            .field("sessions", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn creds(user: &str) -> Credential {
        Credential::new(user, SecretString::from("pw".to_string()))
    }

    fn fixed_key() -> Result<SessionKey> {
        Ok(SessionKey([7u8; SESSION_KEY_LEN]))
    }

    #[test]
    fn create_then_lookup_returns_same_credential() -> Result<()> {
        let store = SessionStore::new(None);
        let credential = creds("me");
        let key = store.create(credential.clone())?;
        assert_eq!(store.lookup(&key), Some(credential));
        assert_eq!(store.len(), 1);
        Ok(())
    }

    #[test]
    fn keys_are_unique() -> Result<()> {
        let store = SessionStore::new(None);
        let first = store.create(creds("a"))?;
        let second = store.create(creds("b"))?;
        assert_ne!(first, second);
        assert_eq!(store.lookup(&first).map(|c| c.user().to_string()), Some("a".into()));
        assert_eq!(store.lookup(&second).map(|c| c.user().to_string()), Some("b".into()));
        Ok(())
    }

    #[test]
    fn unknown_key_is_absent() -> Result<()> {
        let store = SessionStore::new(None);
        store.create(creds("me"))?;
        assert!(store.lookup(&SessionKey::generate()?).is_none());
        Ok(())
    }

    #[test]
    fn remove_is_idempotent() -> Result<()> {
        let store = SessionStore::new(None);
        let key = store.create(creds("me"))?;
        assert!(store.remove(&key));
        assert!(!store.remove(&key));
        assert!(store.lookup(&key).is_none());
        assert!(store.is_empty());
        Ok(())
    }

    #[test]
    fn remove_releases_store_reference() -> Result<()> {
        let store = SessionStore::new(None);
        let credential = creds("me");
        let key = store.create(credential.clone())?;
        assert_eq!(credential.holders(), 2);
        store.remove(&key);
        assert_eq!(credential.holders(), 1);
        Ok(())
    }

    #[test]
    fn ttl_seconds_zero_disables_expiry() {
        assert_eq!(SessionStore::with_ttl_seconds(0).ttl(), None);
        assert_eq!(
            SessionStore::with_ttl_seconds(DEFAULT_SESSION_TTL_SECONDS).ttl(),
            Some(Duration::from_secs(12 * 60 * 60))
        );
    }

    #[test]
    fn expired_entries_are_not_returned() -> Result<()> {
        let store = SessionStore::new(Some(Duration::ZERO));
        let key = store.create(creds("me"))?;
        assert!(store.lookup(&key).is_none());
        assert!(store.is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_expired_entries() -> Result<()> {
        let store = SessionStore::new(Some(Duration::from_secs(60)));
        store.create(creds("a"))?;
        store.create(creds("b"))?;
        assert_eq!(store.purge_expired(), 0);

        tokio::time::advance(Duration::from_secs(30)).await;
        store.create(creds("c"))?;

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(store.purge_expired(), 2);
        assert_eq!(store.len(), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(store.purge_expired(), 1);
        assert!(store.is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn create_purges_expired_entries() -> Result<()> {
        let store = SessionStore::new(Some(Duration::from_secs(60)));
        store.create(creds("a"))?;
        tokio::time::advance(Duration::from_secs(61)).await;
        store.create(creds("b"))?;
        assert_eq!(store.len(), 1);
        assert_eq!(store.purge_expired(), 0);
        Ok(())
    }

    #[test]
    fn collision_never_overwrites() -> Result<()> {
        let store = SessionStore {
            ttl: None,
            key_source: fixed_key,
            sessions: Mutex::new(HashMap::new()),
        };
        let key = store.create(creds("first"))?;
        assert!(store.create(creds("second")).is_err());
        assert_eq!(
            store.lookup(&key).map(|c| c.user().to_string()),
            Some("first".to_string())
        );
        Ok(())
    }

    #[test]
    fn session_key_from_slice_checks_length() -> Result<()> {
        let key = SessionKey::generate()?;
        assert_eq!(SessionKey::from_slice(key.as_bytes()), Some(key));
        assert!(SessionKey::from_slice(&[0u8; 16]).is_none());
        Ok(())
    }

    #[test]
    fn session_key_debug_is_redacted() -> Result<()> {
        let key = SessionKey::generate()?;
        assert_eq!(format!("{key:?}"), "SessionKey([REDACTED])");
        Ok(())
    }
}
