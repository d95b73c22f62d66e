use super::{StateStorage, StorageError};
use crate::adapter::{SupportChain, WalletAccount, WalletAdapter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimal identity needed to silently reconnect on the next start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
	/// Name of the wallet that was connected.
	#[serde(rename = "walletName")]
	pub wallet_name: String,
	/// Chain the session was opened on.
	pub chain: SupportChain,
	/// Last selected account, preferred when the wallet still reports it.
	#[serde(rename = "accountAddress", default)]
	pub account_address: Option<String>,
	#[serde(rename = "connectedAt")]
	pub connected_at: DateTime<Utc>,
}

impl SessionRecord {
	pub fn new(wallet: &dyn WalletAdapter, chain: SupportChain, account: &WalletAccount) -> Self {
		Self {
			wallet_name: wallet.name().to_string(),
			chain,
			account_address: Some(account.address.clone()),
			connected_at: Utc::now(),
		}
	}

	pub fn load(storage: &dyn StateStorage, key: &str) -> Result<Option<Self>, StorageError> {
		match storage.get_item(key)? {
			Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
			None => Ok(None),
		}
	}

	pub fn save(&self, storage: &dyn StateStorage, key: &str) -> Result<(), StorageError> {
		storage.set_item(key, &serde_json::to_string(self)?)
	}

	pub fn clear(storage: &dyn StateStorage, key: &str) -> Result<(), StorageError> {
		storage.remove_item(key)
	}
}
