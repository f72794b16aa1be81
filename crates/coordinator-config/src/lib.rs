//! Configuration loading for the coordinator service.
//!
//! Loads a TOML file, substitutes `${VAR}` environment references,
//! applies environment overrides, and validates the result.

use coordinator_types::Address;
use std::env;
use std::path::Path;
use thiserror::Error;

pub mod types;

pub use types::{BackendConfig, Config, CoordinatorSettings};

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution
#[derive(Default)]
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "COORDINATOR_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		let mut config = if let Some(file_path) = &self.file_path {
			self.load_from_file(file_path).await?
		} else {
			return Err(ConfigError::FileNotFound(
				"No configuration file specified".to_string(),
			));
		};

		self.apply_env_overrides(&mut config)?;
		self.validate_config(&config)?;

		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<Config, ConfigError> {
		let content = tokio::fs::read_to_string(file_path).await?;

		let substituted_content = self.substitute_env_vars(&content)?;

		let config: Config = toml::from_str(&substituted_content)
			.map_err(|e| ConfigError::ParseError(e.to_string()))?;

		Ok(config)
	}

	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		let mut result = content.to_string();

		// Find and replace ${VAR_NAME} patterns
		let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();

		for cap in re.captures_iter(content) {
			let full_match = &cap[0];
			let var_name = &cap[1];

			let env_value = env::var(var_name)
				.map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

			result = result.replace(full_match, &env_value);
		}

		Ok(result)
	}

	fn apply_env_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			config.coordinator.log_level = log_level;
		}

		if let Ok(http_port) = env::var(format!("{}HTTP_PORT", self.env_prefix)) {
			config.coordinator.http_port = http_port
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid HTTP port: {}", e)))?;
		}

		Ok(())
	}

	fn validate_config(&self, config: &Config) -> Result<(), ConfigError> {
		if config.coordinator.chain_id == 0 {
			return Err(ConfigError::ValidationError(
				"chain_id must be non-zero".to_string(),
			));
		}

		let contract: Result<Address, _> = config.coordinator.contract_address.parse();
		if contract.is_err() {
			return Err(ConfigError::ValidationError(format!(
				"contract_address is not a valid address: {}",
				config.coordinator.contract_address
			)));
		}

		if config.coordinator.lock_window_secs == 0 {
			return Err(ConfigError::ValidationError(
				"lock_window_secs must be greater than zero".to_string(),
			));
		}

		for relay in &config.coordinator.trusted_relays {
			if relay.parse::<Address>().is_err() {
				return Err(ConfigError::ValidationError(format!(
					"trusted relay is not a valid address: {}",
					relay
				)));
			}
		}

		if !matches!(config.storage.backend.as_str(), "memory" | "file") {
			return Err(ConfigError::ValidationError(format!(
				"unknown storage backend: {}",
				config.storage.backend
			)));
		}

		if config.identity.backend != "memory" {
			return Err(ConfigError::ValidationError(format!(
				"unknown identity backend: {}",
				config.identity.backend
			)));
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const SAMPLE: &str = r#"
[coordinator]
name = "agent-intent-coordinator"
chain_id = 296
contract_address = "0xbcdcefd400af9f2412932503a738f990b244757e"
lock_window_secs = 300

[storage]
backend = "memory"

[identity]
backend = "memory"

[[identity.config.agents]]
id = 1
owner = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"
"#;

	fn write_config(content: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(content.as_bytes()).unwrap();
		file
	}

	#[tokio::test]
	async fn test_load_with_defaults() {
		let file = write_config(SAMPLE);
		let config = ConfigLoader::new().with_file(file.path()).load().await.unwrap();

		assert_eq!(config.coordinator.chain_id, 296);
		assert_eq!(config.coordinator.lock_window_secs, 300);
		// Defaulted fields
		assert_eq!(config.coordinator.max_nonce_retries, 3);
		assert!(config.coordinator.check_agent_existence);
		assert!(config.coordinator.trusted_relays.is_empty());
		assert_eq!(config.coordinator.http_port, 8080);
		assert!(config.account.is_none());
	}

	#[tokio::test]
	async fn test_env_substitution() {
		env::set_var("TEST_COORDINATOR_CONTRACT", "0xbcdcefd400af9f2412932503a738f990b244757e");
		let file = write_config(&SAMPLE.replace(
			"\"0xbcdcefd400af9f2412932503a738f990b244757e\"",
			"\"${TEST_COORDINATOR_CONTRACT}\"",
		));

		let config = ConfigLoader::new().with_file(file.path()).load().await.unwrap();
		assert_eq!(
			config.coordinator.contract_address,
			"0xbcdcefd400af9f2412932503a738f990b244757e"
		);
	}

	#[tokio::test]
	async fn test_missing_env_var_fails() {
		let file = write_config(&SAMPLE.replace(
			"\"0xbcdcefd400af9f2412932503a738f990b244757e\"",
			"\"${COORDINATOR_UNSET_VAR_FOR_TEST}\"",
		));

		let result = ConfigLoader::new().with_file(file.path()).load().await;
		assert!(matches!(result, Err(ConfigError::EnvVarNotFound(_))));
	}

	#[tokio::test]
	async fn test_validation_rejects_zero_lock_window() {
		let file = write_config(&SAMPLE.replace("lock_window_secs = 300", "lock_window_secs = 0"));

		let result = ConfigLoader::new().with_file(file.path()).load().await;
		assert!(matches!(result, Err(ConfigError::ValidationError(_))));
	}

	#[tokio::test]
	async fn test_validation_rejects_truncated_contract_address() {
		let file = write_config(&SAMPLE.replace(
			"\"0xbcdcefd400af9f2412932503a738f990b244757e\"",
			"\"0xbcdc\"",
		));

		let result = ConfigLoader::new().with_file(file.path()).load().await;
		assert!(matches!(result, Err(ConfigError::ValidationError(_))));
	}

	#[tokio::test]
	async fn test_validation_rejects_unknown_storage_backend() {
		let file = write_config(&SAMPLE.replace("backend = \"memory\"\n\n[identity]", "backend = \"redis\"\n\n[identity]"));

		let result = ConfigLoader::new().with_file(file.path()).load().await;
		assert!(matches!(result, Err(ConfigError::ValidationError(_))));
	}
}
