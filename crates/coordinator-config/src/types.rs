//! Configuration types for the coordinator service.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub coordinator: CoordinatorSettings,
	pub storage: BackendConfig,
	pub identity: BackendConfig,
	/// Optional local signing account enabling the creator-side submitter.
	#[serde(default)]
	pub account: Option<BackendConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorSettings {
	pub name: String,
	/// Chain identifier mixed into every signed payload.
	pub chain_id: u64,
	/// Coordinator contract identity mixed into every signed payload.
	pub contract_address: String,
	/// How long a creator-initiated lock suspends revocation.
	#[serde(default = "default_lock_window_secs")]
	pub lock_window_secs: u64,
	/// Bounded stale-nonce retry count for the creator-side submitter.
	#[serde(default = "default_max_nonce_retries")]
	pub max_nonce_retries: u32,
	#[serde(default = "default_check_agent_existence")]
	pub check_agent_existence: bool,
	/// Addresses allowed to report outcomes on behalf of target agents.
	#[serde(default)]
	pub trusted_relays: Vec<String>,
	#[serde(default = "default_http_port")]
	pub http_port: u16,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

/// A named backend plus its backend-specific configuration table.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
	pub backend: String,
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

fn default_lock_window_secs() -> u64 {
	300
}

fn default_max_nonce_retries() -> u32 {
	3
}

fn default_check_agent_existence() -> bool {
	true
}

fn default_http_port() -> u16 {
	8080
}

fn default_log_level() -> String {
	"info".to_string()
}

fn empty_table() -> toml::Value {
	toml::Value::Table(Default::default())
}
