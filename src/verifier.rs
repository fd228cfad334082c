//! Server role of the SRP-6a exchange.
//!
//! # Usage
//! Build one [`SrpVerifier`] per login attempt from the user's stored
//! `(salt, verifier)` record, then drive it through its single pass:
//!
//! ```rust
//! use std::sync::Arc;
//! use sha2::Sha512;
//! use srp_auth::engine::SrpEngine;
//! use srp_auth::groups::G_3072;
//! use srp_auth::verifier::SrpVerifier;
//!
//! # fn get_client_public() -> Vec<u8> { vec![9] }
//! # fn get_client_proof() -> Vec<u8> { vec![0; 64] }
//! let engine = Arc::new(SrpEngine::<Sha512>::new(&G_3072));
//! let salt = engine.random_salt().unwrap();
//! let v = engine.compute_verifier(&salt, "alice", "hunter2");
//!
//! let mut verifier = SrpVerifier::new(engine, "alice", &salt, &v);
//! let b_pub = verifier.init_public_key().unwrap();
//! // send `salt` and `b_pub` to the client, receive its public key...
//! verifier.set_client_public_key(&get_client_public()).unwrap();
//! // ...receive the client proof
//! if verifier.is_client_proof_valid(&get_client_proof()) {
//!     let _secret = verifier.session_secret().unwrap();
//!     let _m2 = verifier.server_proof().unwrap();
//! }
//! ```
//!
//! The verifier is single-use: `b` is drawn once and `B` never re-derived;
//! the client public key, scrambling parameter and proofs are set exactly
//! once. A malicious `A` (`A mod N == 0` or `u == 0`) poisons the state
//! and every later check fails.

use std::sync::Arc;

use digest::Digest;
use num_bigint::BigUint;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::engine::SrpEngine;
use crate::errors::AuthError;

/// Server-side state of a single SRP-6a login attempt.
pub struct SrpVerifier<D: Digest> {
    engine: Arc<SrpEngine<D>>,

    // Params from the credential store
    username: String,
    salt: Vec<u8>,
    v: BigUint,

    // Server ephemeral params
    b: Option<BigUint>,
    b_pub: Option<BigUint>,

    exchange: Option<Exchange>,
    poisoned: bool,
}

/// Values fixed when the client public key is installed; wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct Exchange {
    session_secret: Vec<u8>,
    session_secret_hash: Vec<u8>,
    expected_client_proof: Vec<u8>,
    server_proof: Vec<u8>,
}

impl<D: Digest> SrpVerifier<D> {
    /// Verifier for one login by `username` with the stored `(salt,
    /// verifier)` record.
    pub fn new(engine: Arc<SrpEngine<D>>, username: &str, salt: &[u8], verifier: &[u8]) -> Self {
        Self {
            engine,
            username: username.to_owned(),
            salt: salt.to_vec(),
            v: BigUint::from_bytes_be(verifier),
            b: None,
            b_pub: None,
            exchange: None,
            poisoned: false,
        }
    }

    /// Emit the server public key `B = (k*v + g^b) mod N` as minimal
    /// big-endian bytes.
    ///
    /// The private exponent `b` is drawn on the first call and kept for
    /// the lifetime of the verifier; repeat calls return the cached `B`.
    /// Fails only when the RNG does.
    pub fn init_public_key(&mut self) -> Result<Vec<u8>, AuthError> {
        if let Some(b_pub) = &self.b_pub {
            return Ok(b_pub.to_bytes_be());
        }

        let b = match self.b.take() {
            Some(b) => b,
            None => BigUint::from_bytes_be(&self.engine.random_salt()?),
        };
        let k = self.engine.compute_k();
        let b_pub = self.engine.mod_n(&(k * &self.v + self.engine.powm_g(&b)));
        let bytes = b_pub.to_bytes_be();
        self.b = Some(b);
        self.b_pub = Some(b_pub);
        Ok(bytes)
    }

    /// Install the client public key `A` and derive the shared secret and
    /// both proofs.
    ///
    /// `a_pub` is bound into the proofs exactly as received, so a client
    /// that sends leading zeros stays interoperable. The host aborts when
    /// `A mod N == 0` or the scrambling parameter hashes to zero; the
    /// verifier is then poisoned and every later check fails. Set-once: a
    /// second call fails, as does a call before
    /// [`init_public_key`](Self::init_public_key).
    pub fn set_client_public_key(&mut self, a_pub: &[u8]) -> Result<(), AuthError> {
        if self.poisoned || self.exchange.is_some() {
            return Err(AuthError::IllegalState);
        }
        let b_pub_bytes = match &self.b_pub {
            Some(b_pub) => b_pub.to_bytes_be(),
            None => return Err(AuthError::IllegalState),
        };
        let b = self.b.as_ref().ok_or(AuthError::IllegalState)?;

        let a = BigUint::from_bytes_be(a_pub);
        let a_padded = self.engine.pad(&a.to_bytes_be());
        let b_padded = self.engine.pad(&b_pub_bytes);
        let u = BigUint::from_bytes_be(
            &self
                .engine
                .hash(&[a_padded.as_slice(), b_padded.as_slice()]),
        );

        // The host MUST abort the authentication attempt if A mod N is
        // zero, and likewise for u.
        if self.engine.mod_n(&a) == BigUint::default() {
            self.poisoned = true;
            return Err(AuthError::IllegalParameter { name: "a_pub" });
        }
        if u == BigUint::default() {
            self.poisoned = true;
            return Err(AuthError::IllegalParameter { name: "u" });
        }

        // S = (A * v^u)^b mod N
        let base = self.engine.mod_n(&(&a * self.engine.powm(&self.v, &u)));
        let session_secret = self.engine.powm(&base, b).to_bytes_be();
        let session_secret_hash = self.engine.hash(&[session_secret.as_slice()]).to_vec();

        let identity_hash = self.engine.hash(&[self.username.as_bytes()]).to_vec();
        let params_xor = self.engine.params_xor();
        let expected_client_proof = self
            .engine
            .hash(&[
                params_xor.as_slice(),
                identity_hash.as_slice(),
                self.salt.as_slice(),
                a_pub,
                b_pub_bytes.as_slice(),
                session_secret_hash.as_slice(),
            ])
            .to_vec();
        let server_proof = self
            .engine
            .hash(&[
                a_pub,
                expected_client_proof.as_slice(),
                session_secret_hash.as_slice(),
            ])
            .to_vec();

        self.exchange = Some(Exchange {
            session_secret,
            session_secret_hash,
            expected_client_proof,
            server_proof,
        });
        Ok(())
    }

    /// Constant-time check of the client proof `M1`.
    ///
    /// `false` whenever the exchange has not been established.
    pub fn is_client_proof_valid(&self, proof: &[u8]) -> bool {
        match &self.exchange {
            Some(exchange) => proof.ct_eq(&exchange.expected_client_proof).unwrap_u8() == 1,
            None => false,
        }
    }

    /// Shared secret `S`; `None` until the client public key has been
    /// installed.
    pub fn session_secret(&self) -> Option<&[u8]> {
        self.exchange
            .as_ref()
            .map(|exchange| exchange.session_secret.as_slice())
    }

    /// Server proof `M2`; `None` until the client public key has been
    /// installed.
    pub fn server_proof(&self) -> Option<&[u8]> {
        self.exchange
            .as_ref()
            .map(|exchange| exchange.server_proof.as_slice())
    }

    /// Username this verifier authenticates.
    pub fn username(&self) -> &str {
        &self.username
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::G_2048;
    use sha2::Sha512;

    fn verifier_for(username: &str, password: &str) -> SrpVerifier<Sha512> {
        let engine = Arc::new(SrpEngine::<Sha512>::new(&G_2048));
        let salt = vec![3u8; engine.n_byte_len()];
        let v = engine.compute_verifier(&salt, username, password);
        SrpVerifier::new(engine, username, &salt, &v)
    }

    #[test]
    fn public_key_is_stable() {
        let mut verifier = verifier_for("alice", "hunter2");
        let first = verifier.init_public_key().unwrap();
        let second = verifier.init_public_key().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn secrets_unreadable_before_establishment() {
        let mut verifier = verifier_for("alice", "hunter2");
        assert!(verifier.session_secret().is_none());
        assert!(verifier.server_proof().is_none());
        assert!(!verifier.is_client_proof_valid(&[0u8; 64]));
        verifier.init_public_key().unwrap();
        assert!(verifier.session_secret().is_none());
    }

    #[test]
    fn client_key_before_public_key_is_rejected() {
        let mut verifier = verifier_for("alice", "hunter2");
        assert!(matches!(
            verifier.set_client_public_key(&[9]),
            Err(AuthError::IllegalState)
        ));
    }

    #[test]
    fn a_multiple_of_n_poisons_the_verifier() {
        let mut verifier = verifier_for("alice", "hunter2");
        verifier.init_public_key().unwrap();

        let n_bytes = G_2048.n.to_bytes_be();
        assert!(matches!(
            verifier.set_client_public_key(&n_bytes),
            Err(AuthError::IllegalParameter { name: "a_pub" })
        ));
        assert!(verifier.session_secret().is_none());
        assert!(!verifier.is_client_proof_valid(&[0u8; 64]));
        // Poisoned state is terminal.
        assert!(matches!(
            verifier.set_client_public_key(&[9]),
            Err(AuthError::IllegalState)
        ));
    }

    #[test]
    fn client_key_is_set_once() {
        let mut verifier = verifier_for("alice", "hunter2");
        verifier.init_public_key().unwrap();
        verifier.set_client_public_key(&[9]).unwrap();
        let secret = verifier.session_secret().unwrap().to_vec();
        assert!(matches!(
            verifier.set_client_public_key(&[11]),
            Err(AuthError::IllegalState)
        ));
        assert_eq!(verifier.session_secret().unwrap(), secret);
    }
}
