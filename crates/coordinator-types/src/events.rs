//! Immutable transition events emitted by the coordinator.
//!
//! Validators and reputation consumers subscribe to these to correlate
//! off-process work evidence with the coordinator's disposition of each
//! intent.

use crate::common::{Address, IntentId, Timestamp};
use crate::intent::IntentStatus;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Common fields carried by every transition event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentTransition {
	pub intent_id: IntentId,
	/// `None` for creation; the prior stored status otherwise.
	pub previous_status: Option<IntentStatus>,
	pub new_status: IntentStatus,
	pub timestamp: Timestamp,
	/// The principal whose call caused the transition.
	pub acting_principal: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IntentEvent {
	Created(IntentTransition),
	/// Not a status change: the creator suspended the user's ability to
	/// revoke for the lock window.
	RevocationLocked(IntentTransition),
	Executed(IntentTransition),
	Failed {
		transition: IntentTransition,
		reason: String,
	},
	Revoked(IntentTransition),
}

impl IntentEvent {
	pub fn transition(&self) -> &IntentTransition {
		match self {
			Self::Created(t)
			| Self::RevocationLocked(t)
			| Self::Executed(t)
			| Self::Revoked(t) => t,
			Self::Failed { transition, .. } => transition,
		}
	}
}

pub struct EventBus {
	sender: broadcast::Sender<IntentEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<IntentEvent> {
		self.sender.subscribe()
	}

	/// Publishing never fails the operation that emitted the event; a send
	/// error only means there are no subscribers right now.
	pub fn publish(&self, event: IntentEvent) {
		let _ = self.sender.send(event);
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}
