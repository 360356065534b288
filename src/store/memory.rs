//! Thread-safe in-memory [`KeyValueStorage`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{KeyValueStorage, StoreError},
};

/// Storage backend that keeps values in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(Arc<RwLock<HashMap<String, String>>>);
impl MemoryStorage {
	/// Returns the number of stored keys.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl KeyValueStorage for MemoryStorage {
	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.0.read().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		self.0.write().insert(key.to_owned(), value.to_owned());

		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StoreError> {
		self.0.write().remove(key);

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn clones_share_the_same_map() {
		let storage = MemoryStorage::default();
		let clone = storage.clone();

		storage.set("k", "v").expect("Memory storage writes should succeed.");

		assert_eq!(clone.get("k").expect("Memory storage reads should succeed."), Some("v".into()));
		assert_eq!(clone.len(), 1);

		clone.remove("k").expect("Memory storage removals should succeed.");
		clone.remove("k").expect("Removing a missing key should succeed.");

		assert!(storage.is_empty());
	}
}
