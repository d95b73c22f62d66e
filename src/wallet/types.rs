use crate::adapter::AdapterError;
use crate::storage::StorageError;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection status owned by the connection store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
	#[default]
	Disconnected,
	Connecting,
	Connected,
}

impl fmt::Display for ConnectionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConnectionStatus::Disconnected => write!(f, "disconnected"),
			ConnectionStatus::Connecting => write!(f, "connecting"),
			ConnectionStatus::Connected => write!(f, "connected"),
		}
	}
}

/// Error types for wallet connection management
#[derive(Debug, thiserror::Error)]
pub enum WalletKitError {
	#[error("Invalid configuration: {0}")]
	InvalidConfiguration(String),

	#[error("Wallet not found: {0}")]
	WalletNotFound(String),

	#[error("Silent reconnect failed: {0}")]
	SilentReconnectFailed(String),

	#[error("Wallet error: {0}")]
	Adapter(#[from] AdapterError),

	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),

	#[error("Timed out: {0}")]
	Timeout(String),
}
