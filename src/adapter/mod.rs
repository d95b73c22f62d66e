//! Wallet adapter contract.
//!
//! Every concrete wallet kind (browser extension, hardware signer, in-process test double) is
//! exposed to the rest of the crate through the [`WalletAdapter`] trait. The connection store,
//! discovery and resync logic only ever hold `Arc<dyn WalletAdapter>` and never depend on a
//! concrete wallet kind, so new wallets plug in without touching the state machine.

/// In-process adapter used by the demo binary and the test-suite
mod memory;

pub use memory::MemoryWallet;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Chains a wallet can serve accounts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SupportChain {
	#[default]
	Bitcoin,
	Ethereum,
}

impl fmt::Display for SupportChain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SupportChain::Bitcoin => write!(f, "bitcoin"),
			SupportChain::Ethereum => write!(f, "ethereum"),
		}
	}
}

/// One addressable account exposed by a wallet.
///
/// Accounts are immutable snapshots: when the user switches accounts inside the wallet a new
/// `WalletAccount` is produced. Identity is the address, compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAccount {
	/// Opaque address string as reported by the wallet.
	pub address: String,
	/// Public key, when the wallet discloses it.
	#[serde(rename = "publicKey", skip_serializing_if = "Option::is_none")]
	pub public_key: Option<String>,
	/// Adapter-specific extras (labels, derivation paths, ...).
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub metadata: BTreeMap<String, String>,
}

impl WalletAccount {
	pub fn new(address: impl Into<String>) -> Self {
		Self {
			address: address.into(),
			public_key: None,
			metadata: BTreeMap::new(),
		}
	}

	pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
		self.public_key = Some(public_key.into());
		self
	}

	pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}

	/// Whether both accounts refer to the same address.
	pub fn same_address(&self, other: &WalletAccount) -> bool {
		self.address == other.address
	}
}

/// Errors reported by a wallet adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
	#[error("Wallet not installed: {0}")]
	NotInstalled(String),

	#[error("Request rejected by user: {0}")]
	Rejected(String),

	#[error("Wallet returned no accounts")]
	NoAccounts,

	#[error("Provider error: {0}")]
	Provider(String),
}

impl AdapterError {
	/// Errors worth retrying. A rejection or an empty account set will not change on retry.
	pub fn is_transient(&self) -> bool {
		matches!(self, AdapterError::Provider(_))
	}
}

/// Handle returned by [`WalletAdapter::on_accounts_changed`], used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Callback invoked by an adapter whenever its account set changes.
///
/// The sequence is ordered most-preferred first and may be empty when the user locked the
/// wallet or revoked access.
pub type AccountsChangedHandler = Arc<dyn Fn(Vec<WalletAccount>) + Send + Sync>;

/// Capability set every wallet kind implements.
#[async_trait::async_trait]
pub trait WalletAdapter: Send + Sync {
	/// Stable identity of this wallet, unique within a provider.
	fn name(&self) -> &str;

	/// Chain this wallet serves.
	fn chain(&self) -> SupportChain;

	/// Probe the environment for this wallet.
	async fn check_installed(&self) -> bool;

	/// Whether [`get_accounts`](Self::get_accounts) resolves previously authorised accounts
	/// without prompting the user.
	fn supports_silent_reconnect(&self) -> bool {
		false
	}

	/// Request access, prompting the user if needed.
	async fn connect(&self) -> Result<Vec<WalletAccount>, AdapterError>;

	/// Release the connection on the wallet side.
	async fn disconnect(&self) -> Result<(), AdapterError> {
		Ok(())
	}

	/// Accounts currently authorised for this application.
	async fn get_accounts(&self) -> Result<Vec<WalletAccount>, AdapterError>;

	/// Register a listener for account changes.
	fn on_accounts_changed(&self, handler: AccountsChangedHandler) -> ListenerId;

	/// Remove a listener previously registered with [`on_accounts_changed`](Self::on_accounts_changed).
	fn remove_accounts_changed(&self, listener: ListenerId);
}

/// Shared handle to a wallet adapter.
pub type SharedWallet = Arc<dyn WalletAdapter>;
