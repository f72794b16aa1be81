//! In-memory storage backend.
//!
//! Suitable for tests and single-process deployments where durability of
//! the audit trail is not required.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryStorage {
	entries: DashMap<String, Vec<u8>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.entries
			.get(key)
			.map(|entry| entry.clone())
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.entries.insert(key.to_string(), value);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.entries.contains_key(key))
	}
}

/// Factory function to create a memory backend from configuration.
pub fn create_storage(_config: &toml::Value) -> Box<dyn StorageInterface> {
	Box::new(MemoryStorage::new())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_memory_roundtrip() {
		let storage = MemoryStorage::new();

		assert!(matches!(
			storage.get_bytes("missing").await,
			Err(StorageError::NotFound)
		));

		storage.set_bytes("key", vec![1, 2, 3]).await.unwrap();
		assert_eq!(storage.get_bytes("key").await.unwrap(), vec![1, 2, 3]);
		assert!(storage.exists("key").await.unwrap());

		// Overwrite replaces the value
		storage.set_bytes("key", vec![9]).await.unwrap();
		assert_eq!(storage.get_bytes("key").await.unwrap(), vec![9]);
	}
}
