//! Server-side [SRP-6a](https://tools.ietf.org/html/rfc5054) authentication.
//!
//! A client proves knowledge of a password to a server that stores only a
//! password *verifier*, never the password itself. One login is a
//! two-message exchange: the handshake message carries the username and the
//! client public key `A` and returns the stored salt, the server public key
//! `B` and a handshake identifier; the verify message carries the client
//! proof `M1` and, on success, returns the server proof `M2`. Both sides
//! end up with the same shared secret, which is never transmitted.
//!
//! The protocol arithmetic lives in [`engine`] and the per-login state
//! machine in [`verifier`]; [`client`] implements the counterpart role.
//! Around the protocol sit the stateful pieces a server needs:
//! [`credentials`] persists `username -> (salt, verifier)` records as a
//! versioned JSON file, [`handshake`] tracks in-flight logins with a
//! per-user cap and a validity window, and [`session`] tracks issued
//! bearer tokens.
//!
//! All registries are safe to share across request threads. The transport
//! layer (HTTP routing, TLS, serialization of request bodies) is out of
//! scope for this crate.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod client;
pub mod credentials;
pub mod engine;
pub mod errors;
pub mod groups;
pub mod handshake;
pub mod session;
pub mod types;
pub mod verifier;

pub use crate::engine::SrpEngine;
pub use crate::errors::{AuthError, StoreError};
pub use crate::types::SrpGroup;
