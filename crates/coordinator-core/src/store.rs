//! The intent store: single source of truth for intent records.
//!
//! Mutations run as an atomic check-and-transition under the record's
//! exclusive map entry; that commit is the serialization point that decides
//! which of two racing terminal transitions wins. After the commit the
//! record is written through to the storage backend as an audit trail.
//! Records are never deleted.

use coordinator_storage::StorageService;
use coordinator_types::{CoordinatorError, Intent, IntentId, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::error;

const INTENT_NAMESPACE: &str = "intents";

pub struct IntentStore {
	intents: DashMap<IntentId, Intent>,
	storage: Arc<StorageService>,
}

impl IntentStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			intents: DashMap::new(),
			storage,
		}
	}

	/// Inserts a freshly created record. Ids are derived from a
	/// just-consumed nonce so a collision cannot occur; the guard exists so
	/// a record can never be silently replaced.
	pub async fn insert(&self, intent: Intent) -> Result<()> {
		use dashmap::mapref::entry::Entry;

		match self.intents.entry(intent.id) {
			Entry::Occupied(_) => {
				return Err(CoordinatorError::Storage(format!(
					"intent id collision: {}",
					intent.id
				)))
			}
			Entry::Vacant(slot) => {
				slot.insert(intent.clone());
			}
		}

		self.persist(&intent).await;
		Ok(())
	}

	pub fn get(&self, intent_id: &IntentId) -> Option<Intent> {
		self.intents.get(intent_id).map(|entry| entry.clone())
	}

	/// Applies a guarded mutation to the record under its exclusive entry.
	///
	/// The closure runs synchronously while the entry is held and mutates a
	/// copy; the copy replaces the stored record only if the closure
	/// succeeds, so a failed precondition leaves the record untouched.
	/// Returns the committed record.
	pub async fn transition<F>(&self, intent_id: &IntentId, apply: F) -> Result<Intent>
	where
		F: FnOnce(&mut Intent) -> Result<()>,
	{
		let updated = {
			let mut entry = self
				.intents
				.get_mut(intent_id)
				.ok_or(CoordinatorError::NotFound(*intent_id))?;
			let mut candidate = entry.clone();
			apply(&mut candidate)?;
			*entry = candidate.clone();
			candidate
		};

		self.persist(&updated).await;
		Ok(updated)
	}

	/// Write-through after the in-memory commit. The commit stands even if
	/// the write fails; the in-memory record is authoritative and the
	/// persisted copy is an audit trail.
	async fn persist(&self, intent: &Intent) {
		if let Err(e) = self
			.storage
			.store(INTENT_NAMESPACE, &intent.id.to_string(), intent)
			.await
		{
			error!(intent_id = %intent.id, error = %e, "failed to write through intent record");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use coordinator_storage::implementations::memory::MemoryStorage;
	use coordinator_types::{Address, IntentStatus};

	fn store() -> IntentStore {
		IntentStore::new(Arc::new(StorageService::new(Box::new(MemoryStorage::new()))))
	}

	fn pending_intent() -> Intent {
		let user: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
			.parse()
			.unwrap();
		Intent {
			id: IntentId::derive(&user, 1, 2, 1, 100),
			user_address: user,
			creator_agent_id: 1,
			target_agent_id: 2,
			created_at: 100,
			expires_at: 400,
			status: IntentStatus::Pending,
			can_revoke: true,
			lock_expiry: None,
			nonce: 1,
			failure_reason: None,
		}
	}

	#[tokio::test]
	async fn test_insert_and_get() {
		let store = store();
		let intent = pending_intent();
		let id = intent.id;

		store.insert(intent).await.unwrap();
		assert_eq!(store.get(&id).unwrap().status, IntentStatus::Pending);

		// A record is never silently replaced
		assert!(store.insert(pending_intent()).await.is_err());
	}

	#[tokio::test]
	async fn test_failed_transition_leaves_record_untouched() {
		let store = store();
		let intent = pending_intent();
		let id = intent.id;
		store.insert(intent).await.unwrap();

		let result = store
			.transition(&id, |record| {
				record.status = IntentStatus::Executed;
				Err(CoordinatorError::NotPending {
					intent_id: id,
					status: IntentStatus::Executed,
				})
			})
			.await;

		assert!(result.is_err());
		// The failed transition rolled back: the stored record is unchanged
		assert_eq!(store.get(&id).unwrap().status, IntentStatus::Pending);
	}

	#[tokio::test]
	async fn test_unknown_intent_is_not_found() {
		let store = store();
		let id = pending_intent().id;

		assert!(store.get(&id).is_none());
		let result = store.transition(&id, |_| Ok(())).await;
		assert!(matches!(result, Err(CoordinatorError::NotFound(_))));
	}
}
