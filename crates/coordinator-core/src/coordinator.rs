//! The intent lifecycle coordinator.
//!
//! State machine governing an intent from creation through revocation
//! locking, execution/failure reporting, expiry, and revocation. The three
//! terminal transitions (`mark_executed`, `mark_failed`, `revoke_intent`)
//! are mutually exclusive and guarded by a `Pending` precondition, so
//! whichever commits first under the store's serialization wins; the loser
//! observes `NotPending` and must treat it as "someone else already
//! resolved it", not as retryable.

use crate::nonce::NonceTracker;
use crate::store::IntentStore;
use coordinator_auth::{IntentPayload, SignatureVerifier, SigningDomain};
use coordinator_identity::{IdentityError, IdentityService};
use coordinator_storage::StorageService;
use coordinator_types::{
	now_secs, Address, AgentId, CoordinatorError, EventBus, Intent, IntentEvent, IntentId,
	IntentStatus, IntentTransition, Result, Signature, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// A signed intent-creation submission.
///
/// The signature covers the canonical payload built from exactly these
/// fields plus the deployment's signing domain; the coordinator rebuilds
/// the payload and re-verifies on every submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIntentRequest {
	pub creator_agent_id: AgentId,
	pub target_agent_id: AgentId,
	pub expires_at: Timestamp,
	pub user_address: Address,
	pub nonce: u64,
	pub signature: Signature,
}

pub struct IntentCoordinator {
	store: IntentStore,
	nonces: NonceTracker,
	verifier: SignatureVerifier,
	identity: Arc<IdentityService>,
	event_bus: EventBus,
	lock_window_secs: u64,
	trusted_relays: Vec<Address>,
	check_agent_existence: bool,
}

impl IntentCoordinator {
	pub fn new(
		storage: Arc<StorageService>,
		identity: Arc<IdentityService>,
		verifier: SignatureVerifier,
		lock_window_secs: u64,
		trusted_relays: Vec<Address>,
		check_agent_existence: bool,
	) -> Self {
		Self {
			store: IntentStore::new(storage.clone()),
			nonces: NonceTracker::new(storage),
			verifier,
			identity,
			event_bus: EventBus::new(1024),
			lock_window_secs,
			trusted_relays,
			check_agent_existence,
		}
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn signing_domain(&self) -> &SigningDomain {
		self.verifier.domain()
	}

	/// The user's current nonce; creators read this to build the next
	/// signable payload with `nonce = current + 1`.
	pub async fn user_nonce(&self, user: &Address) -> Result<u64> {
		self.nonces.current(user).await
	}

	/// Verifies the signature and nonce, persists a Pending record, and
	/// returns the derived intent id.
	pub async fn create_intent(&self, request: CreateIntentRequest) -> Result<IntentId> {
		let now = now_secs();
		if request.expires_at <= now {
			return Err(CoordinatorError::ExpiryInPast {
				expires_at: request.expires_at,
				now,
			});
		}

		if self.check_agent_existence {
			for agent_id in [request.creator_agent_id, request.target_agent_id] {
				let exists = self
					.identity
					.agent_exists(agent_id)
					.await
					.map_err(|e| CoordinatorError::Identity(e.to_string()))?;
				if !exists {
					return Err(CoordinatorError::UnknownAgent(agent_id));
				}
			}
		}

		let payload = IntentPayload {
			user_address: request.user_address.clone(),
			creator_agent_id: request.creator_agent_id,
			target_agent_id: request.target_agent_id,
			nonce: request.nonce,
			expires_at: request.expires_at,
		};
		if !self
			.verifier
			.verify(&payload, &request.signature, &request.user_address)
		{
			return Err(CoordinatorError::InvalidSignature {
				claimed: request.user_address,
			});
		}

		// The atomic check-and-increment is the contention point: of two
		// submissions racing on the same nonce, exactly one passes.
		self.nonces
			.consume(&request.user_address, request.nonce)
			.await?;

		let intent_id = IntentId::derive(
			&request.user_address,
			request.creator_agent_id,
			request.target_agent_id,
			request.nonce,
			now,
		);
		let intent = Intent {
			id: intent_id,
			user_address: request.user_address.clone(),
			creator_agent_id: request.creator_agent_id,
			target_agent_id: request.target_agent_id,
			created_at: now,
			expires_at: request.expires_at,
			status: IntentStatus::Pending,
			can_revoke: true,
			lock_expiry: None,
			nonce: request.nonce,
			failure_reason: None,
		};
		self.store.insert(intent).await?;

		info!(intent_id = %intent_id, user = %request.user_address, nonce = request.nonce, "intent created");
		self.event_bus.publish(IntentEvent::Created(IntentTransition {
			intent_id,
			previous_status: None,
			new_status: IntentStatus::Pending,
			timestamp: now,
			acting_principal: request.user_address,
		}));

		Ok(intent_id)
	}

	/// Suspends the user's ability to revoke for the configured lock
	/// window. Creator-only. Idempotent while an unexpired lock is in
	/// place; re-locking after the window elapsed refreshes it.
	pub async fn lock_revocation(&self, intent_id: IntentId, caller: &Address) -> Result<()> {
		let intent = self
			.store
			.get(&intent_id)
			.ok_or(CoordinatorError::NotFound(intent_id))?;

		let owner = self.agent_owner(intent.creator_agent_id).await?;
		if owner != *caller {
			return Err(CoordinatorError::Unauthorized {
				caller: caller.clone(),
				action: "lock revocation",
			});
		}

		let now = now_secs();
		let lock_window = self.lock_window_secs;
		let mut refreshed = false;
		let updated = self
			.store
			.transition(&intent_id, |intent| {
				if intent.status != IntentStatus::Pending {
					return Err(CoordinatorError::NotPending {
						intent_id,
						status: intent.status,
					});
				}
				// Expired intents are invalid for new lock operations
				if now > intent.expires_at {
					return Err(CoordinatorError::ExpiryInPast {
						expires_at: intent.expires_at,
						now,
					});
				}
				match intent.lock_expiry {
					Some(lock_expiry) if !intent.can_revoke && now < lock_expiry => {
						// Active lock: no-op, window not extended
					}
					_ => {
						intent.can_revoke = false;
						intent.lock_expiry = Some(now + lock_window);
						refreshed = true;
					}
				}
				Ok(())
			})
			.await?;

		if refreshed {
			info!(intent_id = %intent_id, lock_expiry = ?updated.lock_expiry, "revocation locked");
			self.event_bus
				.publish(IntentEvent::RevocationLocked(IntentTransition {
					intent_id,
					previous_status: Some(IntentStatus::Pending),
					new_status: IntentStatus::Pending,
					timestamp: now,
					acting_principal: caller.clone(),
				}));
		}
		Ok(())
	}

	/// Records successful execution. Target-only (or a trusted relay).
	///
	/// Deliberately no expiry check: an execution that started before
	/// expiry stays recordable after it. Not idempotent; a second terminal
	/// call fails with `NotPending`, since execution and failure are
	/// mutually exclusive factual claims.
	pub async fn mark_executed(&self, intent_id: IntentId, caller: &Address) -> Result<()> {
		let intent = self
			.store
			.get(&intent_id)
			.ok_or(CoordinatorError::NotFound(intent_id))?;
		self.authorize_target(&intent, caller, "mark intent executed")
			.await?;

		let now = now_secs();
		self.store
			.transition(&intent_id, |intent| {
				if intent.status != IntentStatus::Pending {
					return Err(CoordinatorError::NotPending {
						intent_id,
						status: intent.status,
					});
				}
				intent.status = IntentStatus::Executed;
				Ok(())
			})
			.await?;

		info!(intent_id = %intent_id, caller = %caller, "intent executed");
		self.event_bus.publish(IntentEvent::Executed(IntentTransition {
			intent_id,
			previous_status: Some(IntentStatus::Pending),
			new_status: IntentStatus::Executed,
			timestamp: now,
			acting_principal: caller.clone(),
		}));
		Ok(())
	}

	/// Records failure with a reason. Target-only (or a trusted relay);
	/// same expiry and idempotency policy as `mark_executed`.
	pub async fn mark_failed(
		&self,
		intent_id: IntentId,
		reason: String,
		caller: &Address,
	) -> Result<()> {
		let intent = self
			.store
			.get(&intent_id)
			.ok_or(CoordinatorError::NotFound(intent_id))?;
		self.authorize_target(&intent, caller, "mark intent failed")
			.await?;

		let now = now_secs();
		let recorded_reason = reason.clone();
		self.store
			.transition(&intent_id, |intent| {
				if intent.status != IntentStatus::Pending {
					return Err(CoordinatorError::NotPending {
						intent_id,
						status: intent.status,
					});
				}
				intent.status = IntentStatus::Failed;
				intent.failure_reason = Some(recorded_reason);
				Ok(())
			})
			.await?;

		info!(intent_id = %intent_id, caller = %caller, reason = %reason, "intent failed");
		self.event_bus.publish(IntentEvent::Failed {
			transition: IntentTransition {
				intent_id,
				previous_status: Some(IntentStatus::Pending),
				new_status: IntentStatus::Failed,
				timestamp: now,
				acting_principal: caller.clone(),
			},
			reason,
		});
		Ok(())
	}

	/// Revokes a pending intent. User-only. Blocked while a lock is in
	/// force; an expired lock restores revocability, so a creator cannot
	/// freeze the user's authorization by locking and never resolving.
	pub async fn revoke_intent(&self, intent_id: IntentId, caller: &Address) -> Result<()> {
		let intent = self
			.store
			.get(&intent_id)
			.ok_or(CoordinatorError::NotFound(intent_id))?;
		if intent.user_address != *caller {
			return Err(CoordinatorError::Unauthorized {
				caller: caller.clone(),
				action: "revoke intent",
			});
		}

		let now = now_secs();
		self.store
			.transition(&intent_id, |intent| {
				if intent.status != IntentStatus::Pending {
					return Err(CoordinatorError::NotPending {
						intent_id,
						status: intent.status,
					});
				}
				if !intent.is_revocable_at(now) {
					// lock_expiry is always set when can_revoke is false
					return Err(CoordinatorError::StillLocked {
						intent_id,
						lock_expiry: intent.lock_expiry.unwrap_or(intent.expires_at),
					});
				}
				intent.status = IntentStatus::Revoked;
				Ok(())
			})
			.await?;

		info!(intent_id = %intent_id, "intent revoked");
		self.event_bus.publish(IntentEvent::Revoked(IntentTransition {
			intent_id,
			previous_status: Some(IntentStatus::Pending),
			new_status: IntentStatus::Revoked,
			timestamp: now,
			acting_principal: caller.clone(),
		}));
		Ok(())
	}

	/// Derived validity, computed at read time: still pending and not past
	/// expiry. Unknown ids are simply not valid. No background sweep ever
	/// mutates stored status.
	pub fn is_intent_valid(&self, intent_id: &IntentId) -> bool {
		self.store
			.get(intent_id)
			.map(|intent| intent.is_valid_at(now_secs()))
			.unwrap_or(false)
	}

	pub fn get_intent(&self, intent_id: &IntentId) -> Result<Intent> {
		self.store
			.get(intent_id)
			.ok_or(CoordinatorError::NotFound(*intent_id))
	}

	async fn agent_owner(&self, agent_id: AgentId) -> Result<Address> {
		self.identity.owner_of(agent_id).await.map_err(|e| match e {
			IdentityError::AgentNotFound(id) => CoordinatorError::UnknownAgent(id),
			other => CoordinatorError::Identity(other.to_string()),
		})
	}

	async fn authorize_target(
		&self,
		intent: &Intent,
		caller: &Address,
		action: &'static str,
	) -> Result<()> {
		if self.trusted_relays.contains(caller) {
			return Ok(());
		}
		let owner = self.agent_owner(intent.target_agent_id).await?;
		if owner != *caller {
			return Err(CoordinatorError::Unauthorized {
				caller: caller.clone(),
				action,
			});
		}
		Ok(())
	}
}
