//! Persistent key-value storage for the access and refresh tokens.
//!
//! Three backends implement [`CredentialStore`]:
//! - [`KeyringStore`]: OS keychain via `keyring`
//! - [`FileStore`]: a JSON file shared by every process using the same directory
//! - [`MemoryStore`]: process-local, nothing survives a restart

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;

/// Default keychain service name
pub const DEFAULT_SERVICE_NAME: &str = "data-for-dummies";

/// Credential file name inside the store directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Logical slot names in the credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    Access,
    Refresh,
}

impl TokenKey {
    pub const ALL: [TokenKey; 2] = [TokenKey::Access, TokenKey::Refresh];

    pub fn as_str(self) -> &'static str {
        match self {
            TokenKey::Access => "access",
            TokenKey::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistent key-value area holding the token slots.
///
/// Implementations hold no expiry metadata; an expired token is only
/// discovered when the server rejects it.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: TokenKey) -> Result<Option<String>>;

    fn set(&self, key: TokenKey, value: &str) -> Result<()>;

    /// Remove a slot. Clearing an empty slot succeeds.
    fn clear(&self, key: TokenKey) -> Result<()>;
}

// ============================================================================
// Keyring
// ============================================================================

/// Tokens stored in the OS keychain, one entry per slot.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: TokenKey) -> Result<Entry> {
        Entry::new(&self.service, key.as_str()).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store token in keychain")
    }

    fn clear(&self, key: TokenKey) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

// ============================================================================
// File
// ============================================================================

/// Tokens stored as a small JSON object on disk.
///
/// Every process pointed at the same directory sees the same tokens, so a
/// token rotated by one process goes stale in the in-memory copy of another.
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CREDENTIALS_FILE),
            lock: Mutex::new(()),
        }
    }

    /// Store under the platform cache directory.
    pub fn in_cache_dir() -> Result<Self> {
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(Self::new(cache_dir.join(DEFAULT_SERVICE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents =
            std::fs::read_to_string(&self.path).context("Failed to read credentials file")?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&contents).context("Failed to parse credentials file")
    }

    /// Replace the file in one rename so readers never see a partial write.
    /// The temp file is created 0600 on unix before any token is written to it.
    fn write_slots(&self, slots: &HashMap<String, String>) -> Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Credentials path has no parent directory"))?;
        std::fs::create_dir_all(dir)?;

        let contents = serde_json::to_vec_pretty(slots)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .context("Failed to create temporary credentials file")?;
        tmp.write_all(&contents)
            .context("Failed to write credentials file")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .context("Failed to replace credentials file")?;
        Ok(())
    }

    fn modify(&self, f: impl FnOnce(&mut HashMap<String, String>)) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut slots = self.read_all()?;
        f(&mut slots);
        if slots.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).context("Failed to remove credentials file")?;
            }
            return Ok(());
        }
        self.write_slots(&slots)
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key.as_str()))
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        self.modify(|slots| {
            slots.insert(key.as_str().to_string(), value.to_string());
        })
    }

    fn clear(&self, key: TokenKey) -> Result<()> {
        self.modify(|slots| {
            slots.remove(key.as_str());
        })
    }
}

// ============================================================================
// Memory
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<TokenKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store, handy for resuming a known session.
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        let store = Self::new();
        {
            let mut slots = store.slots.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(access) = access {
                slots.insert(TokenKey::Access, access.to_string());
            }
            if let Some(refresh) = refresh {
                slots.insert(TokenKey::Refresh, refresh.to_string());
            }
        }
        store
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Ok(slots.get(&key).cloned())
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.insert(key, value.to_string());
        Ok(())
    }

    fn clear(&self, key: TokenKey) -> Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_key_names() {
        assert_eq!(TokenKey::Access.as_str(), "access");
        assert_eq!(TokenKey::Refresh.to_string(), "refresh");
    }

    #[test]
    fn test_memory_store_set_get_clear() {
        let store = MemoryStore::new();
        assert_eq!(store.get(TokenKey::Access).unwrap(), None);

        store.set(TokenKey::Access, "a1").unwrap();
        assert_eq!(store.get(TokenKey::Access).unwrap().as_deref(), Some("a1"));
        assert_eq!(store.get(TokenKey::Refresh).unwrap(), None);

        store.clear(TokenKey::Access).unwrap();
        assert_eq!(store.get(TokenKey::Access).unwrap(), None);
        // Clearing again is fine
        store.clear(TokenKey::Access).unwrap();
    }

    #[test]
    fn test_memory_store_with_tokens() {
        let store = MemoryStore::with_tokens(Some("a"), None);
        assert_eq!(store.get(TokenKey::Access).unwrap().as_deref(), Some("a"));
        assert_eq!(store.get(TokenKey::Refresh).unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::new(dir.path());
        store.set(TokenKey::Access, "access-1").unwrap();
        store.set(TokenKey::Refresh, "refresh-1").unwrap();

        let reopened = FileStore::new(dir.path());
        assert_eq!(reopened.get(TokenKey::Access).unwrap().as_deref(), Some("access-1"));
        assert_eq!(reopened.get(TokenKey::Refresh).unwrap().as_deref(), Some("refresh-1"));
    }

    #[test]
    fn test_file_store_removes_file_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.set(TokenKey::Access, "a").unwrap();
        assert!(store.path().exists());

        store.clear(TokenKey::Access).unwrap();
        store.clear(TokenKey::Refresh).unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.get(TokenKey::Access).unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CREDENTIALS_FILE), "not json").unwrap();

        let store = FileStore::new(dir.path());
        assert!(store.get(TokenKey::Access).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.set(TokenKey::Refresh, "r").unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_replaces_readable_file_atomically() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CREDENTIALS_FILE);
        std::fs::write(&path, r#"{"access": "old"}"#).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileStore::new(dir.path());
        store.set(TokenKey::Access, "new").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.get(TokenKey::Access).unwrap().as_deref(), Some("new"));

        // No temp files left behind next to the credentials file
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
