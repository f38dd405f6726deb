use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::storage::{CredentialStorage, Slot, StorageError};

/// Bearer token plus the identity it was issued for.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub user_id: String,
}

impl Credential {
    pub fn new(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

// Keep tokens out of logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

impl SessionState {
    fn of(credential: &Option<Credential>) -> Self {
        if credential.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Refusing to store an empty token")]
    EmptyToken,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Single source of truth for the current credential.
///
/// Storage is always written before the in-memory state so a crash never
/// leaves storage claiming a session that was logged out. Readers go
/// through a watch channel and never touch storage.
pub struct SessionStore {
    storage: Box<dyn CredentialStorage>,
    current: watch::Sender<Option<Credential>>,
    // Serialises login/logout/restore so storage and memory agree
    write_lock: Mutex<()>,
}

impl SessionStore {
    /// Create an unauthenticated store. Call `restore()` to pick up a
    /// persisted credential.
    pub fn new(storage: impl CredentialStorage + 'static) -> Self {
        Self::from_boxed(Box::new(storage))
    }

    pub fn from_boxed(storage: Box<dyn CredentialStorage>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            storage,
            current,
            write_lock: Mutex::new(()),
        }
    }

    /// Load a previously persisted credential. Never contacts the backend.
    ///
    /// Unreadable or half-written storage is discarded and the session
    /// starts unauthenticated.
    pub fn restore(&self) -> SessionState {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let restored = match self.read_stored() {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable stored session");
                self.clear_storage_quietly();
                None
            }
        };

        debug!(authenticated = restored.is_some(), "Session restored");
        self.publish(restored);
        self.state()
    }

    /// Store a newly issued credential and mark the session authenticated.
    pub fn login(&self, credential: Credential) -> Result<(), SessionError> {
        if credential.token.is_empty() {
            return Err(SessionError::EmptyToken);
        }

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        self.storage.set(Slot::Token, &credential.token)?;
        if let Err(e) = self.storage.set(Slot::UserId, &credential.user_id) {
            // Don't leave a token behind without its identity
            let _ = self.storage.remove(Slot::Token);
            return Err(e.into());
        }

        info!(user_id = %credential.user_id, "Logged in");
        self.publish(Some(credential));
        Ok(())
    }

    /// Clear the credential from storage and memory.
    ///
    /// Returns `Ok(true)` if a session was ended, `Ok(false)` if there was
    /// nothing to clear. Memory is cleared even when storage fails.
    pub fn logout(&self) -> Result<bool, SessionError> {
        let (was_authenticated, result) = self.clear();
        result?;
        Ok(was_authenticated)
    }

    /// Logout used by the 401 path: storage failures are logged, not returned,
    /// so the caller still sees the authorization failure.
    pub(crate) fn invalidate(&self) -> bool {
        let (was_authenticated, result) = self.clear();
        if let Err(e) = result {
            warn!(error = %e, "Failed to clear stored session after 401");
        }
        was_authenticated
    }

    /// Current credential, if any.
    pub fn credential(&self) -> Option<Credential> {
        self.current.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.current.borrow().as_ref().map(|c| c.token.clone())
    }

    pub fn user_id(&self) -> Option<String> {
        self.current.borrow().as_ref().map(|c| c.user_id.clone())
    }

    pub fn state(&self) -> SessionState {
        SessionState::of(&self.current.borrow())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Subscribe to credential changes. Only real changes wake receivers.
    pub fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.current.subscribe()
    }

    fn read_stored(&self) -> Result<Option<Credential>, StorageError> {
        let token = self.storage.get(Slot::Token)?.filter(|t| !t.is_empty());
        let user_id = self.storage.get(Slot::UserId)?.filter(|u| !u.is_empty());

        match (token, user_id) {
            (Some(token), Some(user_id)) => Ok(Some(Credential { token, user_id })),
            (None, None) => Ok(None),
            _ => {
                warn!("Stored session is incomplete, discarding");
                self.clear_storage_quietly();
                Ok(None)
            }
        }
    }

    fn clear(&self) -> (bool, Result<(), StorageError>) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut result = Ok(());
        for slot in Slot::ALL {
            if let Err(e) = self.storage.remove(slot) {
                result = Err(e);
            }
        }

        let was_authenticated = self.current.borrow().is_some();
        if was_authenticated {
            info!("Logged out");
        }
        self.publish(None);
        (was_authenticated, result)
    }

    fn clear_storage_quietly(&self) {
        for slot in Slot::ALL {
            if let Err(e) = self.storage.remove(slot) {
                warn!(slot = slot.key(), error = %e, "Failed to clear storage slot");
            }
        }
    }

    fn publish(&self, credential: Option<Credential>) {
        self.current.send_if_modified(|current| {
            if *current == credential {
                false
            } else {
                *current = credential;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::storage::{FileStorage, MemoryStorage};

    /// Storage that shares its slots with the test so they can be inspected
    #[derive(Clone, Default)]
    struct SharedStorage(Arc<MemoryStorage>);

    impl CredentialStorage for SharedStorage {
        fn get(&self, slot: Slot) -> Result<Option<String>, StorageError> {
            self.0.get(slot)
        }
        fn set(&self, slot: Slot, value: &str) -> Result<(), StorageError> {
            self.0.set(slot, value)
        }
        fn remove(&self, slot: Slot) -> Result<(), StorageError> {
            self.0.remove(slot)
        }
    }

    /// Storage whose writes always fail
    struct BrokenStorage;

    impl CredentialStorage for BrokenStorage {
        fn get(&self, _slot: Slot) -> Result<Option<String>, StorageError> {
            Err(std::io::Error::other("disk gone").into())
        }
        fn set(&self, _slot: Slot, _value: &str) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk gone").into())
        }
        fn remove(&self, _slot: Slot) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk gone").into())
        }
    }

    #[test]
    fn test_restore_empty_storage() {
        let store = SessionStore::new(MemoryStorage::new());
        assert_eq!(store.restore(), SessionState::Unauthenticated);
        assert!(store.credential().is_none());
    }

    #[test]
    fn test_restore_persisted_credential() {
        let store = SessionStore::new(MemoryStorage::with_credential("abc123", "u1"));
        assert_eq!(store.restore(), SessionState::Authenticated);
        assert_eq!(store.credential(), Some(Credential::new("abc123", "u1")));
    }

    #[test]
    fn test_restore_is_idempotent() {
        let store = SessionStore::new(MemoryStorage::with_credential("abc123", "u1"));
        let first = store.restore();
        let first_credential = store.credential();
        let second = store.restore();
        assert_eq!(first, second);
        assert_eq!(first_credential, store.credential());

        let empty = SessionStore::new(MemoryStorage::new());
        assert_eq!(empty.restore(), empty.restore());
    }

    #[test]
    fn test_restore_discards_half_written_pair() {
        let storage = SharedStorage::default();
        storage.set(Slot::Token, "orphan").unwrap();
        let store = SessionStore::new(storage.clone());

        assert_eq!(store.restore(), SessionState::Unauthenticated);
        assert_eq!(storage.get(Slot::Token).unwrap(), None);
    }

    #[test]
    fn test_restore_unreadable_storage() {
        let store = SessionStore::new(BrokenStorage);
        assert_eq!(store.restore(), SessionState::Unauthenticated);
    }

    #[test]
    fn test_login_sets_state_and_storage() {
        let storage = SharedStorage::default();
        let store = SessionStore::new(storage.clone());
        store.restore();

        for (token, user) in [("abc123", "u1"), ("x", "u9"), ("eyJhbGciOi.J9", "64f0c2")] {
            store.login(Credential::new(token, user)).unwrap();
            assert_eq!(store.credential(), Some(Credential::new(token, user)));
            assert!(store.is_authenticated());
            assert_eq!(storage.get(Slot::Token).unwrap().as_deref(), Some(token));
            assert_eq!(storage.get(Slot::UserId).unwrap().as_deref(), Some(user));
        }
    }

    #[test]
    fn test_login_replaces_previous_credential() {
        let store = SessionStore::new(MemoryStorage::new());
        store.login(Credential::new("first", "u1")).unwrap();
        store.login(Credential::new("second", "u2")).unwrap();
        assert_eq!(store.token().as_deref(), Some("second"));
        assert_eq!(store.user_id().as_deref(), Some("u2"));
    }

    #[test]
    fn test_login_rejects_empty_token() {
        let store = SessionStore::new(MemoryStorage::new());
        let result = store.login(Credential::new("", "u1"));
        assert!(matches!(result, Err(SessionError::EmptyToken)));
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_login_storage_failure_keeps_unauthenticated() {
        let store = SessionStore::new(BrokenStorage);
        let result = store.login(Credential::new("abc", "u1"));
        assert!(matches!(result, Err(SessionError::Storage(_))));
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_logout_clears_and_is_idempotent() {
        let storage = SharedStorage::default();
        let store = SessionStore::new(storage.clone());
        store.login(Credential::new("abc123", "u1")).unwrap();

        assert!(store.logout().unwrap());
        assert!(store.credential().is_none());
        assert_eq!(store.state(), SessionState::Unauthenticated);
        assert_eq!(storage.get(Slot::Token).unwrap(), None);
        assert_eq!(storage.get(Slot::UserId).unwrap(), None);

        assert!(!store.logout().unwrap());
        assert!(store.credential().is_none());
        assert_eq!(store.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn test_logout_clears_memory_when_storage_fails() {
        let store = SessionStore::new(BrokenStorage);
        store.publish(Some(Credential::new("abc", "u1")));

        assert!(store.logout().is_err());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_subscribe_sees_transitions() {
        let store = SessionStore::new(MemoryStorage::new());
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.login(Credential::new("abc", "u1")).unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_some());

        // Logging out twice only notifies once
        store.logout().unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_none());
        store.logout().unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_file_backed_session_survives_reload() {
        let dir = tempfile::tempdir().expect("tempdir");

        let store = SessionStore::new(FileStorage::new(dir.path().to_path_buf()));
        store.restore();
        store.login(Credential::new("abc123", "u1")).unwrap();
        drop(store);

        let reloaded = SessionStore::new(FileStorage::new(dir.path().to_path_buf()));
        assert_eq!(reloaded.restore(), SessionState::Authenticated);
        assert_eq!(reloaded.credential(), Some(Credential::new("abc123", "u1")));

        reloaded.logout().unwrap();
        let after_logout = SessionStore::new(FileStorage::new(dir.path().to_path_buf()));
        assert_eq!(after_logout.restore(), SessionState::Unauthenticated);
    }

    #[test]
    fn test_credential_debug_redacts_token() {
        let debug = format!("{:?}", Credential::new("secret-token", "u1"));
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("u1"));
    }
}
