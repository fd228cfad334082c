//! Group arithmetic and hashing shared by every SRP role.
//!
//! An [`SrpEngine`] is the immutable configuration of the protocol: the
//! group `(N, g)` plus the digest choice `D`. Verifiers, clients and the
//! credential store all compute through one shared engine, so every
//! byte-exact convention (padding width, credential representation, the
//! `k` multiplier) is defined in a single place.

use std::marker::PhantomData;

use digest::{Digest, Output};
use num_bigint::BigUint;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::errors::AuthError;
use crate::types::SrpGroup;

/// SRP computation engine over a fixed group and digest.
pub struct SrpEngine<D: Digest> {
    group: SrpGroup,
    n_byte_len: usize,
    d: PhantomData<D>,
}

impl<D: Digest> SrpEngine<D> {
    /// Create an engine over the given group.
    pub fn new(group: &SrpGroup) -> Self {
        Self {
            n_byte_len: group.n_byte_len(),
            group: group.clone(),
            d: PhantomData,
        }
    }

    /// The group this engine computes in.
    pub fn group(&self) -> &SrpGroup {
        &self.group
    }

    /// Byte length of the group modulus.
    pub fn n_byte_len(&self) -> usize {
        self.n_byte_len
    }

    /// Left-pad `input` with zero bytes to the modulus width.
    ///
    /// Inputs at least that wide are returned unchanged, never truncated.
    pub fn pad(&self, input: &[u8]) -> Vec<u8> {
        if input.len() >= self.n_byte_len {
            return input.to_vec();
        }
        let mut out = vec![0u8; self.n_byte_len];
        out[self.n_byte_len - input.len()..].copy_from_slice(input);
        out
    }

    /// Feed `parts` in order into one fresh digest.
    pub fn hash(&self, parts: &[&[u8]]) -> Output<D> {
        let mut d = D::new();
        for part in parts {
            d.update(part);
        }
        d.finalize()
    }

    /// `H(salt | username ":" password)`.
    ///
    /// The credential representation is literally the colon-joined byte
    /// string, matching the deployed client.
    pub fn hashed_credentials(&self, salt: &[u8], username: &str, password: &str) -> Output<D> {
        let creds = format!("{username}:{password}");
        self.hash(&[salt, creds.as_bytes()])
    }

    /// Password verifier `g^H(salt | username ":" password) mod N` as
    /// minimal big-endian bytes.
    pub fn compute_verifier(&self, salt: &[u8], username: &str, password: &str) -> Vec<u8> {
        let x = BigUint::from_bytes_be(&self.hashed_credentials(salt, username, password));
        self.powm_g(&x).to_bytes_be()
    }

    /// Multiplier `k = H(N | PAD(g))`. `N` is fed unpadded, `g` padded.
    pub fn compute_k(&self) -> BigUint {
        let n_bytes = self.group.n.to_bytes_be();
        let g_padded = self.pad(&self.group.g.to_bytes_be());
        BigUint::from_bytes_be(&self.hash(&[n_bytes.as_slice(), g_padded.as_slice()]))
    }

    /// `g^exp mod N`.
    pub fn powm_g(&self, exp: &BigUint) -> BigUint {
        self.group.g.modpow(exp, &self.group.n)
    }

    /// `base^exp mod N`.
    pub fn powm(&self, base: &BigUint, exp: &BigUint) -> BigUint {
        base.modpow(exp, &self.group.n)
    }

    /// `value mod N`.
    pub fn mod_n(&self, value: &BigUint) -> BigUint {
        value % &self.group.n
    }

    /// `PAD(g) XOR PAD(N)`: the group fingerprint bound into `M1`.
    pub fn params_xor(&self) -> Vec<u8> {
        let g = self.pad(&self.group.g.to_bytes_be());
        let n = self.pad(&self.group.n.to_bytes_be());
        g.iter().zip(n.iter()).map(|(x1, x2)| x1 ^ x2).collect()
    }

    /// Draw a modulus-width byte string from the operating system CSPRNG.
    pub fn random_salt(&self) -> Result<Vec<u8>, AuthError> {
        let mut salt = vec![0u8; self.n_byte_len];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|_| AuthError::EntropyUnavailable)?;
        Ok(salt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::{G_2048, G_3072};
    use sha1::Sha1;
    use sha2::Sha512;

    #[test]
    fn pad_is_idempotent() {
        let engine = SrpEngine::<Sha512>::new(&G_3072);
        let padded = engine.pad(&[1, 2, 3]);
        assert_eq!(padded.len(), 384);
        assert_eq!(engine.pad(&padded), padded);
    }

    #[test]
    fn pad_never_truncates() {
        let engine = SrpEngine::<Sha512>::new(&G_2048);
        let wide = vec![0xab; 300];
        assert_eq!(engine.pad(&wide), wide);
    }

    #[test]
    fn verifier_is_deterministic() {
        let engine = SrpEngine::<Sha512>::new(&G_3072);
        let salt = [7u8; 384];
        let v1 = engine.compute_verifier(&salt, "admin", "password1234");
        let v2 = engine.compute_verifier(&salt, "admin", "password1234");
        assert_eq!(v1, v2);
        assert_ne!(v1, engine.compute_verifier(&salt, "admin", "password1235"));
    }

    #[test]
    fn verifier_depends_on_salt() {
        let engine = SrpEngine::<Sha512>::new(&G_3072);
        let v1 = engine.compute_verifier(&[1u8; 384], "admin", "password1234");
        let v2 = engine.compute_verifier(&[2u8; 384], "admin", "password1234");
        assert_ne!(v1, v2);
    }

    #[test]
    fn k_depends_on_digest() {
        let sha512 = SrpEngine::<Sha512>::new(&G_2048);
        let sha1 = SrpEngine::<Sha1>::new(&G_2048);
        assert_ne!(
            sha512.compute_k().to_bytes_be(),
            sha1.compute_k().to_bytes_be()
        );
    }

    #[test]
    fn params_xor_spans_the_modulus() {
        let engine = SrpEngine::<Sha512>::new(&G_3072);
        let fingerprint = engine.params_xor();
        assert_eq!(fingerprint.len(), 384);
        // PAD(g) starts with zeros and N starts with 0xff, so the leading
        // byte is N's.
        assert_eq!(fingerprint[0], 0xff);
        assert_eq!(fingerprint[383], 0xff ^ 5);
    }

    #[test]
    fn random_salt_is_modulus_width() {
        let engine = SrpEngine::<Sha512>::new(&G_3072);
        let salt = engine.random_salt().unwrap();
        assert_eq!(salt.len(), 384);
        assert_ne!(salt, engine.random_salt().unwrap());
    }
}
