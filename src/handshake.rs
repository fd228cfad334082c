//! Bounded tracking of in-flight login handshakes.
//!
//! A login spans two requests; between them the server holds the verifier
//! state. [`HandshakeRegistry`] keys that state by username and a UUID
//! handshake identifier, keeps at most [`HANDSHAKE_LIMIT`] pending entries
//! per user (the oldest is evicted first) and lets entries lapse after the
//! validity window.
//!
//! Consumption removes the entry before the staleness check, so an
//! expired handshake can never be replayed: it is taken out of the map
//! and then reported as absent. A single background worker, armed on
//! demand by the generate path, purges lapsed entries and stops itself
//! once the registry drains.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::{Duration, Instant};

use digest::Digest;
use log::info;
use uuid::Uuid;

use crate::credentials::CredentialStore;
use crate::engine::SrpEngine;
use crate::errors::AuthError;
use crate::verifier::SrpVerifier;

/// How long a generated handshake stays consumable.
pub const HANDSHAKE_VALIDITY: Duration = Duration::from_secs(10);

/// Most pending handshakes kept per user.
pub const HANDSHAKE_LIMIT: usize = 3;

/// One in-flight login: the verifier state held between the two messages.
pub struct HandshakeSession<D: Digest> {
    id: String,
    verifier: Mutex<SrpVerifier<D>>,
    public_key: Vec<u8>,
    expires_at: Instant,
}

impl<D: Digest> HandshakeSession<D> {
    /// Opaque handshake identifier echoed by the client.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Server public key `B` emitted for this login.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// The verifier state.
    ///
    /// The generate path installs the client public key here; the consume
    /// path later checks the proof against the same state.
    pub fn verifier(&self) -> &Mutex<SrpVerifier<D>> {
        &self.verifier
    }

    /// Whether the validity window has lapsed.
    pub fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

struct RegistryInner<D: Digest> {
    engine: Arc<SrpEngine<D>>,
    credentials: Arc<CredentialStore<D>>,
    active: Mutex<HashMap<String, Vec<Arc<HandshakeSession<D>>>>>,
    validity: Duration,
    worker_armed: AtomicBool,
}

/// Registry of pending handshakes, bounded per user and time-limited.
pub struct HandshakeRegistry<D: Digest> {
    inner: Arc<RegistryInner<D>>,
}

impl<D: Digest + Send + Sync + 'static> HandshakeRegistry<D> {
    /// Registry over the given engine and credential store.
    pub fn new(engine: Arc<SrpEngine<D>>, credentials: Arc<CredentialStore<D>>) -> Self {
        Self::with_validity(engine, credentials, HANDSHAKE_VALIDITY)
    }

    /// Registry with a non-default validity window.
    pub fn with_validity(
        engine: Arc<SrpEngine<D>>,
        credentials: Arc<CredentialStore<D>>,
        validity: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                engine,
                credentials,
                active: Mutex::new(HashMap::new()),
                validity,
                worker_armed: AtomicBool::new(false),
            }),
        }
    }

    /// Start a login for `username`.
    ///
    /// Returns `Ok(None)` when the user is unknown. On success the
    /// session is retained in the registry until consumed or expired and
    /// returned alongside the stored salt and the server public key `B`.
    /// Fails only when the RNG does.
    #[allow(clippy::type_complexity)]
    pub fn generate(
        &self,
        username: &str,
    ) -> Result<Option<(Arc<HandshakeSession<D>>, Vec<u8>, Vec<u8>)>, AuthError> {
        let Some((salt, verifier)) = self.inner.credentials.user_info(username) else {
            return Ok(None);
        };

        let mut state = SrpVerifier::new(self.inner.engine.clone(), username, &salt, &verifier);
        let public_key = state.init_public_key()?;
        let session = Arc::new(HandshakeSession {
            id: Uuid::new_v4().to_string(),
            verifier: Mutex::new(state),
            public_key: public_key.clone(),
            expires_at: Instant::now() + self.inner.validity,
        });

        let mut active = self.inner.active.lock().unwrap();
        let pending = active.entry(username.to_owned()).or_default();
        if pending.len() >= HANDSHAKE_LIMIT {
            pending.remove(0);
        }
        pending.push(session.clone());
        drop(active);

        self.arm_expiry_worker();
        Ok(Some((session, salt, public_key)))
    }

    /// Take the handshake `id` for `username` out of the registry.
    ///
    /// Removal is unconditional; an entry that lapsed is removed and then
    /// reported as absent. `None` for unknown users or identifiers.
    pub fn consume(&self, username: &str, id: &str) -> Option<Arc<HandshakeSession<D>>> {
        let mut active = self.inner.active.lock().unwrap();
        let pending = active.get_mut(username)?;
        let idx = pending.iter().position(|handshake| handshake.id == id)?;
        let session = pending.swap_remove(idx);
        if pending.is_empty() {
            active.remove(username);
        }
        drop(active);

        if session.is_expired() {
            return None;
        }
        Some(session)
    }

    fn arm_expiry_worker(&self) {
        if self
            .inner
            .worker_armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        info!("starting handshake expiry worker");
        let inner = Arc::downgrade(&self.inner);
        let validity = self.inner.validity;
        thread::spawn(move || expiry_worker(inner, validity));
    }
}

/// Purges lapsed handshakes every validity window; disarms and exits once
/// the registry drains so a later generation can re-arm it.
fn expiry_worker<D: Digest>(inner: Weak<RegistryInner<D>>, validity: Duration) {
    loop {
        thread::sleep(validity);
        let Some(inner) = inner.upgrade() else { return };

        let mut active = inner.active.lock().unwrap();
        let now = Instant::now();
        active.retain(|_, pending| {
            pending.retain(|handshake| now <= handshake.expires_at);
            !pending.is_empty()
        });
        if active.is_empty() {
            inner.worker_armed.store(false, Ordering::Release);
            info!("handshake expiry worker idle, stopping");
            return;
        }
    }
}
