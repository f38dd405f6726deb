//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionStore`: the current credential, its derived session state and
//!   change notification
//! - `CredentialStorage`: durable two-slot storage (file, OS keychain, memory)
//!
//! A persisted credential is restored at startup without contacting the
//! backend; the backend decides validity by answering 401.

pub mod credentials;
pub mod session;
pub mod storage;

pub use credentials::KeyringStorage;
pub use session::{Credential, SessionError, SessionState, SessionStore};
pub use storage::{CredentialStorage, FileStorage, MemoryStorage, Slot, StorageError};
