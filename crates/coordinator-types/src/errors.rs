//! Error taxonomy for coordinator operations.
//!
//! Every public operation returns one of these variants; callers get a
//! closed set of outcomes to handle rather than ad-hoc success flags.

use crate::common::{Address, AgentId, IntentId, Timestamp};
use crate::intent::IntentStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoordinatorError>;

#[derive(Debug, Error)]
pub enum CoordinatorError {
	/// The signature does not recover to the claimed signer.
	#[error("signature does not match claimed signer {claimed}")]
	InvalidSignature { claimed: Address },

	/// The supplied nonce is not the next value in the user's sequence.
	/// The caller must re-read the nonce and re-sign, never reuse.
	#[error("stale nonce: expected {expected}, got {provided}")]
	StaleNonce { expected: u64, provided: u64 },

	#[error("expiry {expires_at} is not in the future (now {now})")]
	ExpiryInPast {
		expires_at: Timestamp,
		now: Timestamp,
	},

	/// Attempted transition on a non-Pending intent. For terminal
	/// transitions this means someone else already resolved it; it is not
	/// retryable.
	#[error("intent {intent_id} is {status}, not Pending")]
	NotPending {
		intent_id: IntentId,
		status: IntentStatus,
	},

	#[error("intent {0} not found")]
	NotFound(IntentId),

	#[error("agent {0} is not registered")]
	UnknownAgent(AgentId),

	#[error("caller {caller} is not authorized to {action}")]
	Unauthorized {
		caller: Address,
		action: &'static str,
	},

	/// Revocation attempted while the creator's lock is still in force.
	#[error("intent {intent_id} revocation is locked until {lock_expiry}")]
	StillLocked {
		intent_id: IntentId,
		lock_expiry: Timestamp,
	},

	#[error("storage error: {0}")]
	Storage(String),

	#[error("identity registry error: {0}")]
	Identity(String),
}
