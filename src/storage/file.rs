use super::{StateStorage, StorageError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// File-based implementation of StateStorage
///
/// All keys live in a single JSON object on disk. Every write rewrites the file through a
/// temporary sibling and a rename, so a crash never leaves a half-written document behind.
pub struct FileStorage {
	path: PathBuf,
	// serialises read-modify-write cycles within this process
	write_lock: Mutex<()>,
}

impl FileStorage {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			write_lock: Mutex::new(()),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
		if !self.path.exists() {
			return Ok(BTreeMap::new());
		}

		let content = std::fs::read_to_string(&self.path)?;
		if content.trim().is_empty() {
			return Ok(BTreeMap::new());
		}

		Ok(serde_json::from_str(&content)?)
	}

	fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent)?;
			}
		}

		let tmp = self.path.with_extension("json.tmp");
		std::fs::write(&tmp, serde_json::to_string_pretty(items)?)?;
		std::fs::rename(&tmp, &self.path)?;

		debug!("Wrote {} keys to {:?}", items.len(), self.path);
		Ok(())
	}
}

impl StateStorage for FileStorage {
	fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
		Ok(self.read_all()?.get(key).cloned())
	}

	fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
		let mut items = self.read_all()?;
		items.insert(key.to_string(), value.to_string());
		self.write_all(&items)?;
		info!("Saved key {} to {:?}", key, self.path);
		Ok(())
	}

	fn remove_item(&self, key: &str) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
		let mut items = self.read_all()?;
		if items.remove(key).is_some() {
			self.write_all(&items)?;
			info!("Removed key {} from {:?}", key, self.path);
		}
		Ok(())
	}
}
