//! Issued bearer sessions, capped per user.

use std::collections::HashMap;
use std::sync::Mutex;

use log::info;
use sha2::{Digest, Sha512};

/// Most sessions retained per user; the oldest is revoked first.
pub const SESSION_LIMIT: usize = 3;

/// One issued bearer session.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Session {
    /// Opaque bearer token.
    pub id: String,
    /// Shared secret established during login.
    pub secret: Vec<u8>,
}

impl Session {
    /// `SHA-512(username | secret)`: the possession proof handed out by
    /// the `whoami` endpoint.
    pub fn proof(&self, username: &str) -> Vec<u8> {
        let mut hasher = Sha512::new();
        hasher.update(username.as_bytes());
        hasher.update(&self.secret);
        hasher.finalize().to_vec()
    }
}

#[derive(Default)]
struct SessionsInner {
    // token -> username; gates all lookups
    tokens: HashMap<String, String>,
    user_sessions: HashMap<String, Vec<Session>>,
}

/// Registry of issued bearer tokens.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<SessionsInner>,
}

impl SessionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `token` is live.
    pub fn is_active(&self, token: &str) -> bool {
        self.inner.lock().unwrap().tokens.contains_key(token)
    }

    /// The session and owning username for `token`.
    pub fn get(&self, token: &str) -> Option<(Session, String)> {
        let inner = self.inner.lock().unwrap();
        let username = inner.tokens.get(token)?;
        let session = inner
            .user_sessions
            .get(username)?
            .iter()
            .find(|session| session.id == token)?
            .clone();
        Some((session, username.clone()))
    }

    /// Record a freshly issued `token` for `username`.
    ///
    /// Duplicate tokens are ignored. At [`SESSION_LIMIT`] the user's
    /// oldest session is revoked before the new one is appended.
    pub fn register(&self, username: &str, token: &str, secret: Vec<u8>) {
        let mut inner = self.inner.lock().unwrap();
        if inner.tokens.contains_key(token) {
            return;
        }

        let inner = &mut *inner;
        let sessions = inner.user_sessions.entry(username.to_owned()).or_default();
        if sessions.len() >= SESSION_LIMIT {
            let evicted = sessions.remove(0);
            inner.tokens.remove(&evicted.id);
            info!("revoked session token {}", evicted.id);
        }
        sessions.push(Session {
            id: token.to_owned(),
            secret,
        });
        inner.tokens.insert(token.to_owned(), username.to_owned());
        info!("issued session token {token}");
    }

    /// Revoke `token`. No-op when the token is not live.
    ///
    /// Only the reverse index is dropped; the per-user list is left as is
    /// and reachability stays gated through the index.
    pub fn remove(&self, token: &str) {
        let mut inner = self.inner.lock().unwrap();
        if inner.tokens.remove(token).is_some() {
            info!("revoked session token {token}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let registry = SessionRegistry::new();
        registry.register("alice", "tok-1", vec![1, 2, 3]);

        assert!(registry.is_active("tok-1"));
        let (session, username) = registry.get("tok-1").unwrap();
        assert_eq!(username, "alice");
        assert_eq!(session.secret, vec![1, 2, 3]);
    }

    #[test]
    fn duplicate_token_is_ignored() {
        let registry = SessionRegistry::new();
        registry.register("alice", "tok-1", vec![1]);
        registry.register("mallory", "tok-1", vec![2]);

        let (session, username) = registry.get("tok-1").unwrap();
        assert_eq!(username, "alice");
        assert_eq!(session.secret, vec![1]);
    }

    #[test]
    fn oldest_session_is_evicted_at_the_cap() {
        let registry = SessionRegistry::new();
        for i in 0..4 {
            registry.register("alice", &format!("tok-{i}"), vec![i as u8]);
        }

        assert!(!registry.is_active("tok-0"));
        assert!(registry.get("tok-0").is_none());
        for i in 1..4 {
            assert!(registry.is_active(&format!("tok-{i}")));
        }
    }

    #[test]
    fn removed_token_is_unreachable() {
        let registry = SessionRegistry::new();
        registry.register("alice", "tok-1", vec![1]);
        registry.remove("tok-1");

        assert!(!registry.is_active("tok-1"));
        assert!(registry.get("tok-1").is_none());
        // Removing again is a no-op.
        registry.remove("tok-1");
    }

    #[test]
    fn proof_binds_username_and_secret() {
        let session = Session {
            id: "tok-1".to_owned(),
            secret: vec![9, 9, 9],
        };
        let proof = session.proof("alice");
        assert_eq!(proof.len(), 64);
        assert_ne!(proof, session.proof("bob"));
    }
}
