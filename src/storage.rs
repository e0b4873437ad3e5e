//! Storage shim (§6): a key/value contract the rules engine persists
//! through. Keys are `user:<token>` and `map:<token>`; values are
//! JSON-serialized blobs. The real interface is assumed linearisable per
//! key and may block — there is no cancellation. `MemoryStore` is the
//! trivial in-process implementation used by the server binary and tests;
//! a production deployment would swap in a real KV store behind the same
//! trait.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::GameError;

pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, GameError>;
    fn set(&self, key: &str, value: &str) -> Result<(), GameError>;
    fn delete(&self, key: &str) -> Result<bool, GameError>;
    fn flush(&self) -> Result<(), GameError>;
}

/// In-memory `Storage`, guarded by a single mutex the way the teacher
/// guards its in-process game state with `tokio::sync::Mutex`. Values
/// never touch disk; `flush` is a no-op kept for interface parity.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Remove every key for a token (`user:<token>` and `map:<token>`),
    /// used by `GET /reset?wipe`.
    pub fn wipe_token(&self, token: &str) -> Result<(), GameError> {
        self.delete(&format!("user:{token}"))?;
        self.delete(&format!("map:{token}"))?;
        Ok(())
    }
}

impl Storage for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, GameError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| GameError::System("storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), GameError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| GameError::System("storage lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, GameError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| GameError::System("storage lock poisoned".to_string()))?;
        Ok(entries.remove(key).is_some())
    }

    fn flush(&self) -> Result<(), GameError> {
        Ok(())
    }
}
