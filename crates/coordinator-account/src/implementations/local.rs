//! Local wallet implementation using Alloy's in-process signer.

use crate::{AccountError, AccountInterface};
use alloy::signers::{local::PrivateKeySigner, Signer};
use async_trait::async_trait;
use coordinator_types::{Address, Signature};

pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let signer = private_key_hex
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;

		Ok(Self { signer })
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(Address(self.signer.address().as_slice().to_vec()))
	}

	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError> {
		// Alloy applies the EIP-191 prefix internally
		let signature = self.signer.sign_message(message).await.map_err(|e| {
			AccountError::SigningFailed(format!("Failed to sign message: {}", e))
		})?;

		Ok(Signature(signature.as_bytes().to_vec()))
	}
}

/// Factory function to create a local wallet from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex-encoded private key
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidKey("private_key not configured".to_string()))?;

	Ok(Box::new(LocalWallet::new(private_key)?))
}

#[cfg(test)]
mod tests {
	use super::*;

	// First well-known anvil development key
	const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	#[tokio::test]
	async fn test_local_wallet_address_and_signature_shape() {
		let wallet = LocalWallet::new(TEST_KEY).unwrap();

		let address = wallet.address().await.unwrap();
		assert_eq!(address.0.len(), 20);
		assert_eq!(
			address.to_string(),
			"0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
		);

		let signature = wallet.sign_message(b"hello").await.unwrap();
		// r (32) + s (32) + v (1)
		assert_eq!(signature.0.len(), 65);
	}

	#[test]
	fn test_invalid_key_is_rejected() {
		assert!(LocalWallet::new("not-a-key").is_err());
	}
}
