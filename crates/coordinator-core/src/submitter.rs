//! Creator-side intent submission.
//!
//! The nonce is part of the signed payload, so recovering from a stale
//! nonce requires a fresh signature; the retry loop therefore lives here,
//! next to the key holder, rather than inside the coordinator. On
//! `StaleNonce` the submitter re-reads the nonce, rebuilds and re-signs the
//! payload, and retries up to a small bounded count before surfacing the
//! error. Every other error surfaces verbatim on first occurrence.

use crate::coordinator::{CreateIntentRequest, IntentCoordinator};
use coordinator_account::{AccountError, AccountService};
use coordinator_auth::IntentPayload;
use coordinator_types::{AgentId, CoordinatorError, IntentId, Timestamp};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SubmitError {
	#[error(transparent)]
	Coordinator(#[from] CoordinatorError),
	#[error("account error: {0}")]
	Account(#[from] AccountError),
}

pub struct IntentSubmitter {
	coordinator: Arc<IntentCoordinator>,
	account: Arc<AccountService>,
	max_nonce_retries: u32,
}

impl IntentSubmitter {
	pub fn new(
		coordinator: Arc<IntentCoordinator>,
		account: Arc<AccountService>,
		max_nonce_retries: u32,
	) -> Self {
		Self {
			coordinator,
			account,
			max_nonce_retries,
		}
	}

	/// Builds, signs, and submits an intent authorizing `creator_agent_id`
	/// to delegate to `target_agent_id` until `expires_at`.
	pub async fn submit(
		&self,
		creator_agent_id: AgentId,
		target_agent_id: AgentId,
		expires_at: Timestamp,
	) -> Result<IntentId, SubmitError> {
		let user = self.account.address().await?;
		let mut attempt = 0;

		loop {
			let nonce = self.coordinator.user_nonce(&user).await? + 1;
			let payload = IntentPayload {
				user_address: user.clone(),
				creator_agent_id,
				target_agent_id,
				nonce,
				expires_at,
			};
			let hash = payload.message_hash(self.coordinator.signing_domain());
			let signature = self.account.sign_message(hash.as_slice()).await?;

			let request = CreateIntentRequest {
				creator_agent_id,
				target_agent_id,
				expires_at,
				user_address: user.clone(),
				nonce,
				signature,
			};
			match self.coordinator.create_intent(request).await {
				Ok(intent_id) => return Ok(intent_id),
				Err(CoordinatorError::StaleNonce { expected, provided })
					if attempt < self.max_nonce_retries =>
				{
					attempt += 1;
					debug!(attempt, expected, provided, "stale nonce, re-signing with a fresh read");
				}
				Err(e) => return Err(e.into()),
			}
		}
	}
}
