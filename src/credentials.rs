//! Persistent `username -> (salt, verifier)` records.
//!
//! The store is an in-memory map wrapped around a versioned JSON file.
//! Reads run concurrently; mutations and saves serialize behind a write
//! lock. Loading is forgiving (a missing, malformed or wrong-version file
//! logs a warning and leaves the store empty) while admin operations
//! report their failures to the caller.
//!
//! A failed load does not gate later mutations: the store stays usable
//! and the next [`CredentialStore::save`] overwrites whatever is on disk.
//! [`CredentialStore::is_initialized`] tells an operator whether the disk
//! state was adopted.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use digest::Digest;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::engine::SrpEngine;
use crate::errors::StoreError;

/// Version tag the credential file must carry.
pub const CRED_DATA_VERSION: u32 = 3;

/// One stored credential record.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserCredential {
    /// Per-user random salt, one modulus width long.
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,
    /// Password verifier `g^x mod N` as minimal big-endian bytes.
    #[serde(with = "base64_bytes")]
    pub verifier: Vec<u8>,
}

#[derive(Deserialize)]
struct CredentialFile {
    version: u32,
    users: HashMap<String, UserCredential>,
}

#[derive(Serialize)]
struct CredentialFileRef<'a> {
    version: u32,
    users: &'a HashMap<String, UserCredential>,
}

/// Reads and writes the versioned credential file.
pub struct CredentialSerializer {
    path: PathBuf,
}

impl CredentialSerializer {
    /// Serializer over the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the user map.
    ///
    /// Fails on I/O errors, malformed JSON or a version tag other than
    /// [`CRED_DATA_VERSION`].
    pub fn load(&self) -> Result<HashMap<String, UserCredential>, StoreError> {
        let data = fs::read(&self.path)?;
        let container: CredentialFile = serde_json::from_slice(&data)?;
        if container.version != CRED_DATA_VERSION {
            return Err(StoreError::Version {
                found: container.version,
            });
        }
        Ok(container.users)
    }

    /// Overwrite the file with `{"version": 3, "users": ...}`, mode 0644.
    pub fn save(&self, users: &HashMap<String, UserCredential>) -> Result<(), StoreError> {
        let data = serde_json::to_vec(&CredentialFileRef {
            version: CRED_DATA_VERSION,
            users,
        })?;
        write_file(&self.path, &data)?;
        Ok(())
    }
}

#[cfg(unix)]
fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)?;
    file.write_all(data)
}

#[cfg(not(unix))]
fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    fs::write(path, data)
}

/// In-memory credential map backed by the file serializer.
pub struct CredentialStore<D: Digest> {
    engine: Arc<SrpEngine<D>>,
    users: RwLock<HashMap<String, UserCredential>>,
    serializer: CredentialSerializer,
    initialized: AtomicBool,
}

impl<D: Digest> CredentialStore<D> {
    /// Store over `path`, deriving salts and verifiers with `engine`.
    pub fn new(path: impl Into<PathBuf>, engine: Arc<SrpEngine<D>>) -> Self {
        Self {
            engine,
            users: RwLock::new(HashMap::new()),
            serializer: CredentialSerializer::new(path),
            initialized: AtomicBool::new(false),
        }
    }

    /// Adopt the on-disk user map.
    ///
    /// Any load failure is logged and leaves the store empty and
    /// non-initialized.
    pub fn init(&self) {
        info!("loading credential db from disk");
        match self.serializer.load() {
            Ok(users) => {
                *self.users.write().unwrap() = users;
                self.initialized.store(true, Ordering::Release);
            }
            Err(err) => warn!("failed to load credential db: {err}"),
        }
    }

    /// Whether the last [`init`](Self::init) adopted the on-disk file.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Write the current map to disk. Best-effort: failures are logged,
    /// never propagated.
    pub fn save(&self) {
        info!("saving credential db to disk");
        let users = self.users.read().unwrap();
        if let Err(err) = self.serializer.save(&users) {
            warn!("failed to save credential db: {err}");
        }
    }

    /// Register a new user under a fresh salt.
    pub fn add_user(&self, username: &str, password: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().unwrap();
        if users.contains_key(username) {
            return Err(StoreError::UserExists);
        }
        let credential = self.fresh_credential(username, password)?;
        users.insert(username.to_owned(), credential);
        Ok(())
    }

    /// Re-salt and re-derive the verifier of an existing user.
    ///
    /// Handshakes and sessions issued against the old verifier stay live;
    /// revoking them is the caller's policy.
    pub fn update_user(&self, username: &str, password: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().unwrap();
        if !users.contains_key(username) {
            return Err(StoreError::UnknownUser);
        }
        let credential = self.fresh_credential(username, password)?;
        users.insert(username.to_owned(), credential);
        Ok(())
    }

    /// Remove a user.
    pub fn delete_user(&self, username: &str) -> Result<(), StoreError> {
        match self.users.write().unwrap().remove(username) {
            Some(_) => Ok(()),
            None => Err(StoreError::UnknownUser),
        }
    }

    /// `(salt, verifier)` for `username`, or `None` when unknown.
    pub fn user_info(&self, username: &str) -> Option<(Vec<u8>, Vec<u8>)> {
        self.users
            .read()
            .unwrap()
            .get(username)
            .map(|credential| (credential.salt.clone(), credential.verifier.clone()))
    }

    fn fresh_credential(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserCredential, StoreError> {
        let salt = self
            .engine
            .random_salt()
            .map_err(|_| StoreError::Entropy)?;
        let verifier = self.engine.compute_verifier(&salt, username, password);
        Ok(UserCredential { salt, verifier })
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_rejects_wrong_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, br#"{"version":2,"users":{}}"#).unwrap();

        let serializer = CredentialSerializer::new(&path);
        assert!(matches!(
            serializer.load(),
            Err(StoreError::Version { found: 2 })
        ));
    }

    #[test]
    fn load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, b"{ nope").unwrap();

        let serializer = CredentialSerializer::new(&path);
        assert!(matches!(serializer.load(), Err(StoreError::Json(_))));
    }

    #[test]
    fn load_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let serializer = CredentialSerializer::new(dir.path().join("absent.json"));
        assert!(matches!(serializer.load(), Err(StoreError::Io(_))));
    }

    #[test]
    fn byte_fields_are_base64_strings() {
        let mut users = HashMap::new();
        users.insert(
            "admin".to_owned(),
            UserCredential {
                salt: vec![0, 1, 2],
                verifier: vec![0xff],
            },
        );
        let json = serde_json::to_string(&CredentialFileRef {
            version: CRED_DATA_VERSION,
            users: &users,
        })
        .unwrap();
        assert!(json.contains(r#""salt":"AAEC""#));
        assert!(json.contains(r#""verifier":"/w==""#));
    }

    #[cfg(unix)]
    #[test]
    fn save_sets_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        let serializer = CredentialSerializer::new(&path);
        serializer.save(&HashMap::new()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
