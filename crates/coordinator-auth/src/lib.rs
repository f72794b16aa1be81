//! Signature verification for intent creation.
//!
//! An intent is authorized by the user signing a keccak-256 digest of a
//! canonical fixed-width encoding of the creation parameters. The encoding
//! includes the chain id and the coordinator's contract address so a
//! signature produced for one deployment can never be replayed against
//! another. The coordinator always re-verifies; it never trusts a
//! caller-supplied "valid" flag.

use alloy_primitives::{keccak256, utils::eip191_hash_message, B256, U256};
use alloy_primitives::{Signature as RecoverableSignature, SignatureError};
use coordinator_types::{Address, AgentId, Signature, Timestamp};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
	#[error("malformed signature: {0}")]
	MalformedSignature(#[source] SignatureError),
	#[error("signer recovery failed: {0}")]
	Recovery(#[source] SignatureError),
}

/// Deployment identity mixed into every signed payload.
#[derive(Debug, Clone)]
pub struct SigningDomain {
	pub chain_id: u64,
	pub coordinator_address: Address,
}

/// The structured message a user signs to authorize intent creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentPayload {
	pub user_address: Address,
	pub creator_agent_id: AgentId,
	pub target_agent_id: AgentId,
	pub nonce: u64,
	pub expires_at: Timestamp,
}

impl IntentPayload {
	/// Canonical digest: the 20-byte user address, five 32-byte big-endian
	/// words (creator agent id, target agent id, nonce, expiry, chain id),
	/// then the 20-byte coordinator address, hashed with keccak-256.
	pub fn message_hash(&self, domain: &SigningDomain) -> B256 {
		let mut packed = Vec::with_capacity(20 + 32 * 5 + 20);
		packed.extend_from_slice(&self.user_address.0);
		packed.extend_from_slice(&U256::from(self.creator_agent_id).to_be_bytes::<32>());
		packed.extend_from_slice(&U256::from(self.target_agent_id).to_be_bytes::<32>());
		packed.extend_from_slice(&U256::from(self.nonce).to_be_bytes::<32>());
		packed.extend_from_slice(&U256::from(self.expires_at).to_be_bytes::<32>());
		packed.extend_from_slice(&U256::from(domain.chain_id).to_be_bytes::<32>());
		packed.extend_from_slice(&domain.coordinator_address.0);
		keccak256(&packed)
	}
}

/// Verifies that a canonical payload was signed by the claimed user address.
pub struct SignatureVerifier {
	domain: SigningDomain,
}

impl SignatureVerifier {
	pub fn new(domain: SigningDomain) -> Self {
		Self { domain }
	}

	pub fn domain(&self) -> &SigningDomain {
		&self.domain
	}

	/// Recovers the address that signed `payload` as an EIP-191 personal
	/// message over the canonical digest.
	pub fn recover(
		&self,
		payload: &IntentPayload,
		signature: &Signature,
	) -> Result<Address, AuthError> {
		let recoverable = RecoverableSignature::from_raw(&signature.0)
			.map_err(AuthError::MalformedSignature)?;

		let digest = payload.message_hash(&self.domain);
		let prehash = eip191_hash_message(digest.as_slice());

		let recovered = recoverable
			.recover_address_from_prehash(&prehash)
			.map_err(AuthError::Recovery)?;

		Ok(Address(recovered.as_slice().to_vec()))
	}

	/// Whether `signature` over `payload` recovers to `claimed_signer`.
	///
	/// Addresses are compared as raw bytes, so hex-case differences in how
	/// the claimed address was supplied cannot cause a mismatch. Malformed
	/// signatures verify as false.
	pub fn verify(
		&self,
		payload: &IntentPayload,
		signature: &Signature,
		claimed_signer: &Address,
	) -> bool {
		match self.recover(payload, signature) {
			Ok(recovered) => recovered == *claimed_signer,
			Err(_) => false,
		}
	}
}
