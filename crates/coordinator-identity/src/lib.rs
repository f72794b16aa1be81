//! Identity registry boundary.
//!
//! Agent identities live in an external registry; the coordinator consumes
//! it read-only, to authorize lock and outcome-reporting callers against
//! agent ownership. It never writes to the registry.

use async_trait::async_trait;
use coordinator_types::{Address, AgentId};
use thiserror::Error;

pub mod implementations {
	pub mod memory;
}

#[derive(Debug, Error)]
pub enum IdentityError {
	#[error("agent {0} not found")]
	AgentNotFound(AgentId),
	#[error("Registry error: {0}")]
	Registry(String),
}

#[async_trait]
pub trait IdentityInterface: Send + Sync {
	/// Controlling account of the given agent.
	async fn owner_of(&self, agent_id: AgentId) -> Result<Address, IdentityError>;

	async fn agent_exists(&self, agent_id: AgentId) -> Result<bool, IdentityError>;

	/// Registry metadata for the agent, e.g. the `domain` key holding the
	/// URL of the agent's server.
	async fn get_metadata(&self, agent_id: AgentId, key: &str) -> Result<Vec<u8>, IdentityError>;
}

pub struct IdentityService {
	registry: Box<dyn IdentityInterface>,
}

impl IdentityService {
	pub fn new(registry: Box<dyn IdentityInterface>) -> Self {
		Self { registry }
	}

	pub async fn owner_of(&self, agent_id: AgentId) -> Result<Address, IdentityError> {
		self.registry.owner_of(agent_id).await
	}

	pub async fn agent_exists(&self, agent_id: AgentId) -> Result<bool, IdentityError> {
		self.registry.agent_exists(agent_id).await
	}

	pub async fn get_metadata(
		&self,
		agent_id: AgentId,
		key: &str,
	) -> Result<Vec<u8>, IdentityError> {
		self.registry.get_metadata(agent_id, key).await
	}
}
