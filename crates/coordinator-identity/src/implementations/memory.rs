//! In-memory identity registry.
//!
//! Seeded from configuration for local deployments and used directly by
//! tests. Production deployments would back this trait with the on-chain
//! registry contract instead.

use crate::{IdentityError, IdentityInterface};
use async_trait::async_trait;
use coordinator_types::{Address, AgentId};
use dashmap::DashMap;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct AgentRecord {
	pub owner: Address,
	pub metadata: HashMap<String, Vec<u8>>,
}

#[derive(Default)]
pub struct MemoryIdentityRegistry {
	agents: DashMap<AgentId, AgentRecord>,
}

impl MemoryIdentityRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&self, agent_id: AgentId, owner: Address) {
		self.agents.insert(
			agent_id,
			AgentRecord {
				owner,
				metadata: HashMap::new(),
			},
		);
	}

	pub fn set_metadata(&self, agent_id: AgentId, key: &str, value: Vec<u8>) {
		if let Some(mut record) = self.agents.get_mut(&agent_id) {
			record.metadata.insert(key.to_string(), value);
		}
	}
}

#[async_trait]
impl IdentityInterface for MemoryIdentityRegistry {
	async fn owner_of(&self, agent_id: AgentId) -> Result<Address, IdentityError> {
		self.agents
			.get(&agent_id)
			.map(|record| record.owner.clone())
			.ok_or(IdentityError::AgentNotFound(agent_id))
	}

	async fn agent_exists(&self, agent_id: AgentId) -> Result<bool, IdentityError> {
		Ok(self.agents.contains_key(&agent_id))
	}

	async fn get_metadata(&self, agent_id: AgentId, key: &str) -> Result<Vec<u8>, IdentityError> {
		let record = self
			.agents
			.get(&agent_id)
			.ok_or(IdentityError::AgentNotFound(agent_id))?;
		Ok(record.metadata.get(key).cloned().unwrap_or_default())
	}
}

/// Factory function to create a registry seeded from configuration.
///
/// Configuration shape:
///
/// ```toml
/// [[identity.config.agents]]
/// id = 1
/// owner = "0x..."
/// domain = "http://localhost:4001"
/// ```
pub fn create_registry(config: &toml::Value) -> Result<Box<dyn IdentityInterface>, IdentityError> {
	let registry = MemoryIdentityRegistry::new();

	if let Some(agents) = config.get("agents").and_then(|v| v.as_array()) {
		for agent in agents {
			let id = agent
				.get("id")
				.and_then(|v| v.as_integer())
				.ok_or_else(|| IdentityError::Registry("agent entry missing id".to_string()))?
				as AgentId;
			let owner: Address = agent
				.get("owner")
				.and_then(|v| v.as_str())
				.ok_or_else(|| IdentityError::Registry("agent entry missing owner".to_string()))?
				.parse()
				.map_err(|e| IdentityError::Registry(format!("invalid owner address: {}", e)))?;

			registry.register(id, owner);

			if let Some(domain) = agent.get("domain").and_then(|v| v.as_str()) {
				registry.set_metadata(id, "domain", domain.as_bytes().to_vec());
			}
		}
	}

	Ok(Box::new(registry))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_registry_lookup() {
		let registry = MemoryIdentityRegistry::new();
		let owner: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
			.parse()
			.unwrap();
		registry.register(1, owner.clone());
		registry.set_metadata(1, "domain", b"http://localhost:4001".to_vec());

		assert!(registry.agent_exists(1).await.unwrap());
		assert!(!registry.agent_exists(2).await.unwrap());
		assert_eq!(registry.owner_of(1).await.unwrap(), owner);
		assert_eq!(
			registry.get_metadata(1, "domain").await.unwrap(),
			b"http://localhost:4001".to_vec()
		);
		// Unknown key reads back empty, unknown agent is an error
		assert!(registry.get_metadata(1, "missing").await.unwrap().is_empty());
		assert!(matches!(
			registry.owner_of(2).await,
			Err(IdentityError::AgentNotFound(2))
		));
	}

	#[tokio::test]
	async fn test_factory_seeds_from_config() {
		let config: toml::Value = toml::from_str(
			r#"
			[[agents]]
			id = 1
			owner = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
			domain = "http://localhost:4001"

			[[agents]]
			id = 2
			owner = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"
			"#,
		)
		.unwrap();

		let registry = create_registry(&config).unwrap();
		assert!(registry.agent_exists(1).await.unwrap());
		assert!(registry.agent_exists(2).await.unwrap());
		assert_eq!(
			registry.get_metadata(1, "domain").await.unwrap(),
			b"http://localhost:4001".to_vec()
		);
	}
}
