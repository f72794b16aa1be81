//! The intent record and its lifecycle status.

use crate::common::{Address, AgentId, IntentId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an intent.
///
/// `Pending` is the only non-terminal state; every other state is final and
/// no transition out of it is ever permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentStatus {
	Pending,
	Executed,
	Failed,
	Revoked,
}

impl IntentStatus {
	pub fn is_terminal(&self) -> bool {
		!matches!(self, IntentStatus::Pending)
	}
}

impl fmt::Display for IntentStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Pending => write!(f, "Pending"),
			Self::Executed => write!(f, "Executed"),
			Self::Failed => write!(f, "Failed"),
			Self::Revoked => write!(f, "Revoked"),
		}
	}
}

/// A signed, time-bounded authorization for one agent to request work from
/// another, tracked through its lifecycle to a terminal outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
	/// Deterministically derived at creation; immutable, never reused.
	pub id: IntentId,
	/// The authorizing principal; owns the nonce sequence and signing key.
	pub user_address: Address,
	pub creator_agent_id: AgentId,
	pub target_agent_id: AgentId,
	pub created_at: Timestamp,
	pub expires_at: Timestamp,
	pub status: IntentStatus,
	/// True until explicitly locked by the creator.
	pub can_revoke: bool,
	/// Once locked, revocation is blocked until this timestamp elapses.
	pub lock_expiry: Option<Timestamp>,
	/// The user nonce consumed when this intent was created.
	pub nonce: u64,
	/// Recorded by a failure report; absent otherwise.
	pub failure_reason: Option<String>,
}

impl Intent {
	/// Derived validity: still pending and not past its expiry.
	///
	/// Validity is never stored; expiry does not mutate `status`.
	pub fn is_valid_at(&self, now: Timestamp) -> bool {
		self.status == IntentStatus::Pending && now <= self.expires_at
	}

	/// Whether the user may revoke at `now`: either never locked, or the
	/// lock window has elapsed.
	pub fn is_revocable_at(&self, now: Timestamp) -> bool {
		if self.can_revoke {
			return true;
		}
		matches!(self.lock_expiry, Some(lock_expiry) if now >= lock_expiry)
	}
}
