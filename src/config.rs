//! Provider configuration.

use crate::adapter::SupportChain;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Storage key used when the host does not pick one.
pub const DEFAULT_STORAGE_KEY: &str = "wallet-connect-kit:wallet-connect-info";

/// How the provider picks the initially selected wallet after discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "policy", content = "wallet")]
pub enum DefaultWalletPolicy {
	/// First discovered wallet serving the configured chain, then the fallback wallet, then
	/// the first discovered wallet.
	#[default]
	FirstForChain,
	/// The named wallet when discovered, otherwise as `FirstForChain`.
	Named(String),
	/// The fallback wallet whenever one is supplied, otherwise as `FirstForChain`.
	Fallback,
}

/// Configuration for the wallet provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletProviderConfig {
	/// Chain the application works against.
	pub chain: SupportChain,
	/// Reconnect to the most recently used wallet on mount.
	pub auto_connect: bool,
	/// Key under which the session record is stored.
	pub storage_key: String,
	/// Upper bound for a single wallet's install probe.
	pub probe_timeout_ms: u64,
	/// Upper bound for a connect or silent reconnect, retries included.
	pub reconnect_timeout_ms: u64,
	pub default_selection: DefaultWalletPolicy,
}

impl Default for WalletProviderConfig {
	fn default() -> Self {
		Self {
			chain: SupportChain::Bitcoin,
			auto_connect: false,
			storage_key: DEFAULT_STORAGE_KEY.to_string(),
			probe_timeout_ms: 3_000,
			reconnect_timeout_ms: 5_000,
			default_selection: DefaultWalletPolicy::default(),
		}
	}
}

impl WalletProviderConfig {
	pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	pub fn probe_timeout(&self) -> Duration {
		Duration::from_millis(self.probe_timeout_ms)
	}

	pub fn reconnect_timeout(&self) -> Duration {
		Duration::from_millis(self.reconnect_timeout_ms)
	}
}
