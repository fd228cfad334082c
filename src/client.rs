//! Client role of the SRP-6a exchange.
//!
//! # Usage
//! Draw a random ephemeral `a` (32 bytes is plenty) and send the public
//! value together with the username:
//!
//! ```rust
//! use std::sync::Arc;
//! use sha2::Sha512;
//! use srp_auth::client::SrpClient;
//! use srp_auth::engine::SrpEngine;
//! use srp_auth::groups::G_3072;
//!
//! let engine = Arc::new(SrpEngine::<Sha512>::new(&G_3072));
//! let client = SrpClient::new(engine);
//! let a = [2u8; 32];
//! let a_pub = client.compute_public_ephemeral(&a);
//! ```
//!
//! After the server answers with `salt` and its public key `b_pub`,
//! derive the proofs (`process_reply` rejects a malicious `b_pub`), send
//! `proof()` and check the server's answer with `verify_server`:
//!
//! ```rust
//! # use std::sync::Arc;
//! # use sha2::Sha512;
//! # use srp_auth::client::SrpClient;
//! # use srp_auth::engine::SrpEngine;
//! # use srp_auth::groups::G_3072;
//! # let engine = Arc::new(SrpEngine::<Sha512>::new(&G_3072));
//! # let client = SrpClient::new(engine.clone());
//! # let a = [2u8; 32];
//! # let salt = vec![7u8; 384];
//! # let b_pub = vec![9u8];
//! let verifier = client
//!     .process_reply(&a, "alice", "hunter2", &salt, &b_pub)
//!     .unwrap();
//! let m1 = verifier.proof();
//! ```
//!
//! For registration, `compute_verifier` yields the value the server
//! stores; it never needs to see the password.

use std::sync::Arc;

use digest::Digest;
use num_bigint::BigUint;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::engine::SrpEngine;
use crate::errors::AuthError;

/// SRP client state before the handshake with the server.
pub struct SrpClient<D: Digest> {
    engine: Arc<SrpEngine<D>>,
}

/// SRP client state after the handshake with the server.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SrpClientVerifier {
    proof: Vec<u8>,
    server_proof: Vec<u8>,
    key: Vec<u8>,
    secret: Vec<u8>,
}

impl<D: Digest> SrpClient<D> {
    /// Client over the given engine.
    pub fn new(engine: Arc<SrpEngine<D>>) -> Self {
        Self { engine }
    }

    /// Password verifier for user registration on the server.
    pub fn compute_verifier(&self, username: &str, password: &str, salt: &[u8]) -> Vec<u8> {
        self.engine.compute_verifier(salt, username, password)
    }

    /// Public ephemeral `A = PAD(g^a mod N)` for the handshake message.
    ///
    /// The padded form is what the deployed client sends on the wire.
    pub fn compute_public_ephemeral(&self, a: &[u8]) -> Vec<u8> {
        let a = BigUint::from_bytes_be(a);
        self.engine.pad(&self.engine.powm_g(&a).to_bytes_be())
    }

    /// Process the server reply to the handshake.
    pub fn process_reply(
        &self,
        a: &[u8],
        username: &str,
        password: &str,
        salt: &[u8],
        b_pub: &[u8],
    ) -> Result<SrpClientVerifier, AuthError> {
        let a_num = BigUint::from_bytes_be(a);
        let b_pub_num = BigUint::from_bytes_be(b_pub);

        // Safeguard against malicious B
        if self.engine.mod_n(&b_pub_num) == BigUint::default() {
            return Err(AuthError::IllegalParameter { name: "b_pub" });
        }

        let a_pub = self.engine.pad(&self.engine.powm_g(&a_num).to_bytes_be());
        let x = BigUint::from_bytes_be(&self.engine.hashed_credentials(salt, username, password));
        let b_padded = self.engine.pad(&b_pub_num.to_bytes_be());
        let u = BigUint::from_bytes_be(
            &self.engine.hash(&[a_pub.as_slice(), b_padded.as_slice()]),
        );
        let k = self.engine.compute_k();

        // S = (B - k*g^x)^(a + u*x) mod N
        let n = &self.engine.group().n;
        let interm = self.engine.mod_n(&(k * self.engine.powm_g(&x)));
        // Because we do operations in modulo N we can get: (kv + g^b) < kv
        let base = if b_pub_num > interm {
            (&b_pub_num - &interm) % n
        } else {
            (n + &b_pub_num - &interm) % n
        };
        let secret = self
            .engine
            .powm(&base, &(a_num + &u * &x))
            .to_bytes_be();
        let key = self.engine.hash(&[secret.as_slice()]).to_vec();

        let identity_hash = self.engine.hash(&[username.as_bytes()]).to_vec();
        let params_xor = self.engine.params_xor();
        let proof = self
            .engine
            .hash(&[
                params_xor.as_slice(),
                identity_hash.as_slice(),
                salt,
                a_pub.as_slice(),
                b_pub,
                key.as_slice(),
            ])
            .to_vec();
        let server_proof = self
            .engine
            .hash(&[a_pub.as_slice(), proof.as_slice(), key.as_slice()])
            .to_vec();

        Ok(SrpClientVerifier {
            proof,
            server_proof,
            key,
            secret,
        })
    }
}

impl SrpClientVerifier {
    /// Client proof `M1` for the verify message.
    pub fn proof(&self) -> &[u8] {
        &self.proof
    }

    /// Hash of the shared secret.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Shared secret `S`.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Check the server proof `M2` returned on a successful verify.
    pub fn verify_server(&self, reply: &[u8]) -> Result<(), AuthError> {
        if self.server_proof.ct_eq(reply).unwrap_u8() == 1 {
            Ok(())
        } else {
            Err(AuthError::BadRecordMac { peer: "server" })
        }
    }
}
