//! Per-user nonce tracking.
//!
//! Each user owns a strictly increasing counter; every successful intent
//! creation consumes exactly one value. Check, increment, and write-through
//! all run under the user's lock, so two creations racing on the same
//! expected nonce cannot both succeed, and persisted values land in
//! consumption order.

use coordinator_storage::{StorageError, StorageService};
use coordinator_types::{Address, CoordinatorError, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

const NONCE_NAMESPACE: &str = "nonces";

pub struct NonceTracker {
	counters: DashMap<Address, Arc<Mutex<u64>>>,
	storage: Arc<StorageService>,
}

impl NonceTracker {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			counters: DashMap::new(),
			storage,
		}
	}

	/// The user's current (last consumed) nonce; 0 for a fresh user.
	pub async fn current(&self, user: &Address) -> Result<u64> {
		let counter = self.counter(user).await?;
		let value = *counter.lock().await;
		Ok(value)
	}

	/// Atomically consumes `expected_next` if and only if it is exactly one
	/// past the current value. On a mismatch the caller must re-read and
	/// re-sign; the value is never silently reused.
	///
	/// The new value is persisted before the in-memory commit and while the
	/// user's lock is held, so the stored counter can never fall behind a
	/// value a restarted tracker would rehydrate and hand out again.
	pub async fn consume(&self, user: &Address, expected_next: u64) -> Result<u64> {
		let counter = self.counter(user).await?;
		let mut guard = counter.lock().await;

		let next = *guard + 1;
		if expected_next != next {
			return Err(CoordinatorError::StaleNonce {
				expected: next,
				provided: expected_next,
			});
		}

		self.storage
			.store(NONCE_NAMESPACE, &user.to_string(), &next)
			.await
			.map_err(|e| CoordinatorError::Storage(e.to_string()))?;
		*guard = next;

		Ok(next)
	}

	/// The user's counter, hydrated from storage on first access.
	async fn counter(&self, user: &Address) -> Result<Arc<Mutex<u64>>> {
		if let Some(counter) = self.counters.get(user) {
			return Ok(counter.clone());
		}

		let loaded = self.load(user).await?;
		// A racing hydration inserts the same persisted value, so first
		// insert wins harmlessly.
		Ok(self
			.counters
			.entry(user.clone())
			.or_insert_with(|| Arc::new(Mutex::new(loaded)))
			.clone())
	}

	async fn load(&self, user: &Address) -> Result<u64> {
		match self
			.storage
			.retrieve::<u64>(NONCE_NAMESPACE, &user.to_string())
			.await
		{
			Ok(value) => Ok(value),
			Err(StorageError::NotFound) => Ok(0),
			Err(e) => Err(CoordinatorError::Storage(e.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use coordinator_storage::implementations::memory::MemoryStorage;
	use coordinator_storage::StorageInterface;
	use std::result::Result;
	use std::time::Duration;

	fn tracker() -> NonceTracker {
		NonceTracker::new(Arc::new(StorageService::new(Box::new(MemoryStorage::new()))))
	}

	fn user() -> Address {
		"0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap()
	}

	#[tokio::test]
	async fn test_sequence_is_strictly_increasing() {
		let tracker = tracker();
		let user = user();

		assert_eq!(tracker.current(&user).await.unwrap(), 0);
		assert_eq!(tracker.consume(&user, 1).await.unwrap(), 1);
		assert_eq!(tracker.consume(&user, 2).await.unwrap(), 2);
		assert_eq!(tracker.current(&user).await.unwrap(), 2);
	}

	#[tokio::test]
	async fn test_stale_and_skipped_nonces_are_rejected() {
		let tracker = tracker();
		let user = user();

		tracker.consume(&user, 1).await.unwrap();

		// Reuse of a consumed value
		let reuse = tracker.consume(&user, 1).await;
		assert!(matches!(
			reuse,
			Err(CoordinatorError::StaleNonce {
				expected: 2,
				provided: 1
			})
		));

		// Skipping ahead is equally invalid
		let skipped = tracker.consume(&user, 5).await;
		assert!(matches!(skipped, Err(CoordinatorError::StaleNonce { .. })));

		// The failed attempts consumed nothing
		assert_eq!(tracker.current(&user).await.unwrap(), 1);
	}

	#[tokio::test]
	async fn test_concurrent_consume_has_one_winner() {
		let tracker = Arc::new(tracker());
		let user = user();

		let (a, b) = tokio::join!(tracker.consume(&user, 1), tracker.consume(&user, 1));
		assert_ne!(a.is_ok(), b.is_ok());
		assert_eq!(tracker.current(&user).await.unwrap(), 1);
	}

	#[tokio::test]
	async fn test_counter_survives_rehydration() {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let user = user();

		let first = NonceTracker::new(storage.clone());
		first.consume(&user, 1).await.unwrap();
		first.consume(&user, 2).await.unwrap();

		// A fresh tracker over the same storage picks up where we left off
		let second = NonceTracker::new(storage);
		assert_eq!(second.current(&user).await.unwrap(), 2);
		assert_eq!(second.consume(&user, 3).await.unwrap(), 3);
	}

	/// Backend whose write of the serialized value `1` stalls long enough
	/// for a later write to overtake it if writes ever leave the critical
	/// section.
	struct SlowFirstWrite {
		inner: MemoryStorage,
	}

	#[async_trait]
	impl StorageInterface for SlowFirstWrite {
		async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
			self.inner.get_bytes(key).await
		}

		async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
			if value == b"1" {
				tokio::time::sleep(Duration::from_millis(100)).await;
			}
			self.inner.set_bytes(key, value).await
		}

		async fn exists(&self, key: &str) -> Result<bool, StorageError> {
			self.inner.exists(key).await
		}
	}

	#[tokio::test]
	async fn test_persisted_counter_never_regresses_under_slow_writes() {
		let storage = Arc::new(StorageService::new(Box::new(SlowFirstWrite {
			inner: MemoryStorage::new(),
		})));
		let tracker = Arc::new(NonceTracker::new(storage.clone()));
		let user = user();

		let first = {
			let tracker = tracker.clone();
			let user = user.clone();
			tokio::spawn(async move { tracker.consume(&user, 1).await })
		};
		// Let the first consume reach its (stalled) write before the second
		tokio::time::sleep(Duration::from_millis(25)).await;
		tracker.consume(&user, 2).await.unwrap();
		first.await.unwrap().unwrap();

		// A fresh tracker over the same storage must see the latest value:
		// the slow write of 1 cannot land after the write of 2, so no
		// consumed nonce ever becomes consumable again after a restart
		let rehydrated = NonceTracker::new(storage);
		assert_eq!(rehydrated.current(&user).await.unwrap(), 2);
		assert!(matches!(
			rehydrated.consume(&user, 2).await,
			Err(CoordinatorError::StaleNonce { .. })
		));
		assert_eq!(rehydrated.consume(&user, 3).await.unwrap(), 3);
	}

	#[tokio::test]
	async fn test_failed_persist_consumes_nothing() {
		struct FailingWrites;

		#[async_trait]
		impl StorageInterface for FailingWrites {
			async fn get_bytes(&self, _key: &str) -> Result<Vec<u8>, StorageError> {
				Err(StorageError::NotFound)
			}

			async fn set_bytes(&self, _key: &str, _value: Vec<u8>) -> Result<(), StorageError> {
				Err(StorageError::Backend("disk full".to_string()))
			}

			async fn exists(&self, _key: &str) -> Result<bool, StorageError> {
				Ok(false)
			}
		}

		let tracker = NonceTracker::new(Arc::new(StorageService::new(Box::new(FailingWrites))));
		let user = user();

		let result = tracker.consume(&user, 1).await;
		assert!(matches!(result, Err(CoordinatorError::Storage(_))));
		// The in-memory counter did not advance past what storage holds
		assert_eq!(tracker.current(&user).await.unwrap(), 0);
	}
}
