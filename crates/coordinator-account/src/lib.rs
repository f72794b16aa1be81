//! Signing boundary for the intent coordinator.
//!
//! Intent creation is authorized by a user signature over a canonical
//! payload; this crate abstracts the key holder producing that signature so
//! the creator-side submission path and tests can sign without knowing the
//! key storage mechanism.

use async_trait::async_trait;
use coordinator_types::{Address, Signature};
use thiserror::Error;

pub mod implementations {
	pub mod local;
}

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
}

#[async_trait]
pub trait AccountInterface: Send + Sync {
	async fn address(&self) -> Result<Address, AccountError>;
	/// Signs a message as an EIP-191 personal message.
	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError>;
}

pub struct AccountService {
	provider: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(provider: Box<dyn AccountInterface>) -> Self {
		Self { provider }
	}

	pub async fn address(&self) -> Result<Address, AccountError> {
		self.provider.address().await
	}

	pub async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError> {
		self.provider.sign_message(message).await
	}
}
