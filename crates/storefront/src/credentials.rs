//! Persisted credential holder.
//!
//! Stores the opaque bearer token the remote API issued, together with a
//! mirror of the identity it belongs to. Read at startup, written on
//! login/register/profile-update, erased on logout or invalidation. The
//! identity mirror is display-only staleness tolerance - `restore()`
//! always re-fetches the profile.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::types::Identity;

/// A persisted credential: the opaque token plus the identity it was
/// issued for.
#[derive(Clone)]
pub struct StoredCredential {
    /// Opaque bearer token.
    pub token: SecretString,
    /// Identity mirror from the last successful auth operation.
    pub identity: Identity,
}

impl std::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredential")
            .field("token", &"[REDACTED]")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Storage for the persisted credential.
pub trait CredentialStore {
    /// Load the stored credential, or `None` if absent or unreadable.
    fn load(&self) -> Option<StoredCredential>;

    /// Persist a credential. Failures are logged, not surfaced.
    fn save(&self, credential: &StoredCredential);

    /// Erase any stored credential.
    fn clear(&self);
}

/// On-disk JSON shape. The token must be written in the clear, so the
/// conversion is explicit rather than serializing `SecretString`.
#[derive(Serialize, Deserialize)]
struct StoredCredentialFile {
    token: String,
    identity: Identity,
}

/// Credential store persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store backed by the given file path.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<StoredCredential> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), "failed to read credential file: {e}");
                return None;
            }
        };

        match serde_json::from_str::<StoredCredentialFile>(&raw) {
            Ok(file) => Some(StoredCredential {
                token: SecretString::from(file.token),
                identity: file.identity,
            }),
            Err(e) => {
                warn!(path = %self.path.display(), "discarding corrupt credential file: {e}");
                None
            }
        }
    }

    fn save(&self, credential: &StoredCredential) {
        let file = StoredCredentialFile {
            token: credential.token.expose_secret().to_owned(),
            identity: credential.identity.clone(),
        };
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let raw = serde_json::to_vec(&file).map_err(std::io::Error::other)?;
            fs::write(&self.path, raw)
        };
        if let Err(e) = write() {
            warn!(path = %self.path.display(), "failed to save credential file: {e}");
        }
    }

    fn clear(&self) {
        if let Err(e) = fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), "failed to clear credential file: {e}");
        }
    }
}

/// In-process credential store, for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    slot: Arc<Mutex<Option<StoredCredential>>>,
}

impl MemoryCredentialStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<StoredCredential> {
        self.slot.lock().map(|slot| slot.clone()).unwrap_or(None)
    }

    fn save(&self, credential: &StoredCredential) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(credential.clone());
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use rose_shop_core::{Email, UserId};

    fn identity() -> Identity {
        Identity {
            user_id: UserId::new(1),
            username: "lan".to_owned(),
            email: Email::parse("lan@example.com").unwrap(),
            profile: None,
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rose-shop-cred-{name}-{}", std::process::id()))
    }

    #[test]
    fn test_file_store_roundtrip() {
        let path = temp_path("roundtrip");
        let store = FileCredentialStore::new(path.clone());

        store.save(&StoredCredential {
            token: SecretString::from("tok-123"),
            identity: identity(),
        });

        let loaded = store.load().unwrap();
        assert_eq!(loaded.token.expose_secret(), "tok-123");
        assert_eq!(loaded.identity.username, "lan");

        store.clear();
        assert!(store.load().is_none());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_file_store_corrupt_data_treated_as_absent() {
        let path = temp_path("corrupt");
        fs::write(&path, b"xx").unwrap();
        let store = FileCredentialStore::new(path.clone());
        assert!(store.load().is_none());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_debug_redacts_token() {
        let credential = StoredCredential {
            token: SecretString::from("super-secret"),
            identity: identity(),
        };
        let output = format!("{credential:?}");
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("super-secret"));
    }
}
