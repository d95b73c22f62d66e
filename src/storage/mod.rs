//! Key-value persistence for the connection store.
//!
//! The store never talks to a storage medium directly. It goes through the [`StateStorage`]
//! contract injected by the host. [`MemoryStorage`] is the ephemeral per-session default and
//! [`FileStorage`] keeps values across process restarts.

/// JSON-file backed storage
mod file;
/// Persisted session identity used for silent reconnect
mod session;

pub use file::FileStorage;
pub use session::SessionRecord;

use std::collections::HashMap;
use std::sync::Mutex;

/// Errors raised by a storage backend
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("Storage error: {0}")]
	Backend(String),
}

/// Key-value contract used to persist the session record.
pub trait StateStorage: Send + Sync {
	fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

	fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

	fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Ephemeral storage that lives as long as the value itself.
#[derive(Debug, Default)]
pub struct MemoryStorage {
	items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.items.lock().map(|items| items.len()).unwrap_or(0)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl StateStorage for MemoryStorage {
	fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
		let items = self
			.items
			.lock()
			.map_err(|e| StorageError::Backend(format!("Memory storage poisoned: {}", e)))?;
		Ok(items.get(key).cloned())
	}

	fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
		let mut items = self
			.items
			.lock()
			.map_err(|e| StorageError::Backend(format!("Memory storage poisoned: {}", e)))?;
		items.insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove_item(&self, key: &str) -> Result<(), StorageError> {
		let mut items = self
			.items
			.lock()
			.map_err(|e| StorageError::Backend(format!("Memory storage poisoned: {}", e)))?;
		items.remove(key);
		Ok(())
	}
}
