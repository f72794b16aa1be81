//! Factory wiring from configuration to a running coordinator.
//!
//! Backend implementations are injected as factories keyed by the backend
//! name in configuration, keeping this crate free of any particular
//! storage or registry choice.

use crate::coordinator::IntentCoordinator;
use coordinator_auth::{SignatureVerifier, SigningDomain};
use coordinator_config::Config;
use coordinator_identity::{IdentityError, IdentityInterface, IdentityService};
use coordinator_storage::{StorageInterface, StorageService};
use coordinator_types::Address;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
	#[error("Configuration error: {0}")]
	Config(String),
}

type StorageFactory = Box<dyn Fn(&toml::Value) -> Box<dyn StorageInterface> + Send>;
type IdentityFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn IdentityInterface>, IdentityError> + Send>;

pub struct CoordinatorBuilder {
	config: Config,
	storage_factories: HashMap<String, StorageFactory>,
	identity_factories: HashMap<String, IdentityFactory>,
}

impl CoordinatorBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			storage_factories: HashMap::new(),
			identity_factories: HashMap::new(),
		}
	}

	pub fn with_storage_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Box<dyn StorageInterface> + Send + 'static,
	{
		self.storage_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_identity_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn IdentityInterface>, IdentityError> + Send + 'static,
	{
		self.identity_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn build(self) -> Result<IntentCoordinator, BuildError> {
		let settings = &self.config.coordinator;

		let storage_factory = self
			.storage_factories
			.get(&self.config.storage.backend)
			.ok_or_else(|| {
				BuildError::Config(format!(
					"No factory for storage backend '{}'",
					self.config.storage.backend
				))
			})?;
		let storage = Arc::new(StorageService::new(storage_factory(
			&self.config.storage.config,
		)));

		let identity_factory = self
			.identity_factories
			.get(&self.config.identity.backend)
			.ok_or_else(|| {
				BuildError::Config(format!(
					"No factory for identity backend '{}'",
					self.config.identity.backend
				))
			})?;
		let registry = identity_factory(&self.config.identity.config)
			.map_err(|e| BuildError::Config(format!("Identity backend: {}", e)))?;
		let identity = Arc::new(IdentityService::new(registry));

		let coordinator_address: Address = settings.contract_address.parse().map_err(|e| {
			BuildError::Config(format!("Invalid contract_address: {}", e))
		})?;
		let verifier = SignatureVerifier::new(SigningDomain {
			chain_id: settings.chain_id,
			coordinator_address,
		});

		let mut trusted_relays = Vec::with_capacity(settings.trusted_relays.len());
		for relay in &settings.trusted_relays {
			trusted_relays.push(relay.parse::<Address>().map_err(|e| {
				BuildError::Config(format!("Invalid trusted relay '{}': {}", relay, e))
			})?);
		}

		Ok(IntentCoordinator::new(
			storage,
			identity,
			verifier,
			settings.lock_window_secs,
			trusted_relays,
			settings.check_agent_existence,
		))
	}
}
