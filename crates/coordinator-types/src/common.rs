//! Common types used throughout the coordinator system.

use alloy_primitives::{keccak256, B256, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifier into the external agent identity registry.
pub type AgentId = u64;

/// Timestamp (Unix seconds)
pub type Timestamp = u64;

/// Current Unix time in seconds.
pub fn now_secs() -> Timestamp {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or_default()
}

/// Blockchain address representation.
///
/// Stores addresses as raw bytes; equality is byte equality, so comparison
/// is inherently case-insensitive with respect to hex display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(pub Vec<u8>);

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

impl FromStr for Address {
	type Err = hex::FromHexError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let stripped = s.strip_prefix("0x").unwrap_or(s);
		let bytes = hex::decode(stripped)?;
		// Addresses are exactly 20 bytes; anything else can never match a
		// recovered signer
		if bytes.len() != 20 {
			return Err(hex::FromHexError::InvalidStringLength);
		}
		Ok(Address(bytes))
	}
}

impl Serialize for Address {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for Address {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// Cryptographic signature in the standard Ethereum format (r, s, v).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(pub Vec<u8>);

impl fmt::Display for Signature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

impl FromStr for Signature {
	type Err = hex::FromHexError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let stripped = s.strip_prefix("0x").unwrap_or(s);
		Ok(Signature(hex::decode(stripped)?))
	}
}

impl Serialize for Signature {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for Signature {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// Unique identifier of an intent.
///
/// Derived deterministically at creation from the authorizing user, the two
/// agent identifiers, the consumed nonce, and the creation timestamp; never
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntentId(pub B256);

impl IntentId {
	pub fn derive(
		user_address: &Address,
		creator_agent_id: AgentId,
		target_agent_id: AgentId,
		nonce: u64,
		created_at: Timestamp,
	) -> Self {
		let mut packed = Vec::with_capacity(20 + 32 * 4);
		packed.extend_from_slice(&user_address.0);
		packed.extend_from_slice(&U256::from(creator_agent_id).to_be_bytes::<32>());
		packed.extend_from_slice(&U256::from(target_agent_id).to_be_bytes::<32>());
		packed.extend_from_slice(&U256::from(nonce).to_be_bytes::<32>());
		packed.extend_from_slice(&U256::from(created_at).to_be_bytes::<32>());
		IntentId(keccak256(&packed))
	}
}

impl fmt::Display for IntentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for IntentId {
	type Err = <B256 as FromStr>::Err;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(IntentId(B256::from_str(s)?))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_address_roundtrip() {
		let addr: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
			.parse()
			.unwrap();
		assert_eq!(addr.0.len(), 20);
		// Display is lowercase; parsing it back yields the same bytes
		let reparsed: Address = addr.to_string().parse().unwrap();
		assert_eq!(addr, reparsed);
	}

	#[test]
	fn test_address_must_be_twenty_bytes() {
		assert!("0xab".parse::<Address>().is_err());
		assert!("not hex".parse::<Address>().is_err());
		// 19 and 21 bytes are equally malformed
		assert!("0xf39fd6e51aad88f6f4ce6ab8827279cfffb922"
			.parse::<Address>()
			.is_err());
		assert!("0xf39fd6e51aad88f6f4ce6ab8827279cfffb9226600"
			.parse::<Address>()
			.is_err());
	}

	#[test]
	fn test_address_case_insensitive_equality() {
		let checksummed: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
			.parse()
			.unwrap();
		let lowercase: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
			.parse()
			.unwrap();
		assert_eq!(checksummed, lowercase);
	}

	#[test]
	fn test_intent_id_derivation_is_deterministic() {
		let user: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
			.parse()
			.unwrap();
		let a = IntentId::derive(&user, 1, 2, 6, 1_700_000_000);
		let b = IntentId::derive(&user, 1, 2, 6, 1_700_000_000);
		assert_eq!(a, b);

		// A different nonce yields a different id
		let c = IntentId::derive(&user, 1, 2, 7, 1_700_000_000);
		assert_ne!(a, c);
	}
}
