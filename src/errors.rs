//! Error types.

use core::fmt;
use std::{error, io};

/// SRP authentication error.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AuthError {
    /// A protocol value failed validation.
    IllegalParameter {
        /// Parameter name
        name: &'static str,
    },
    /// A peer's proof did not match the expected value.
    BadRecordMac {
        /// Which peer's proof is invalid
        peer: &'static str,
    },
    /// A verifier operation was driven outside its single-use order.
    IllegalState,
    /// The operating system RNG failed to produce bytes.
    EntropyUnavailable,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalParameter { name } => {
                write!(f, "illegal_parameter: bad '{name}' value")
            }
            Self::BadRecordMac { peer } => {
                write!(f, "bad_record_mac: incorrect '{peer}' proof")
            }
            Self::IllegalState => f.write_str("illegal_state: operation out of order"),
            Self::EntropyUnavailable => f.write_str("entropy source unavailable"),
        }
    }
}

impl error::Error for AuthError {}

/// Credential store error.
#[derive(Debug)]
pub enum StoreError {
    /// The username is already registered.
    UserExists,
    /// The username is not registered.
    UnknownUser,
    /// The credential file carries an unsupported version tag.
    Version {
        /// Version tag found in the file
        found: u32,
    },
    /// Reading or writing the credential file failed.
    Io(io::Error),
    /// The credential file is not well-formed JSON.
    Json(serde_json::Error),
    /// Salt generation failed.
    Entropy,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserExists => f.write_str("user already exists"),
            Self::UnknownUser => f.write_str("user does not exist"),
            Self::Version { found } => {
                write!(f, "credential file has the wrong version: {found}")
            }
            Self::Io(err) => write!(f, "credential file i/o error: {err}"),
            Self::Json(err) => write!(f, "credential file is malformed: {err}"),
            Self::Entropy => f.write_str("entropy source unavailable"),
        }
    }
}

impl error::Error for StoreError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}
