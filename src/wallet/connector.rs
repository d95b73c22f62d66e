//! User-initiated connect and disconnect.
//!
//! Unlike auto-connect these calls may prompt the user and report failures to the caller. Both
//! paths only mutate state through the store's operations.

use crate::adapter::{AdapterError, WalletAccount};
use crate::wallet::{ConnectionStatus, ConnectionStore, WalletKitError};

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone)]
pub struct WalletConnector {
	store: Arc<ConnectionStore>,
	timeout: Duration,
}

impl WalletConnector {
	pub fn new(store: Arc<ConnectionStore>, timeout: Duration) -> Self {
		Self { store, timeout }
	}

	/// Connect to the discovered wallet called `name`, selecting it first if needed.
	///
	/// Connecting to the wallet that is already connected returns the current account
	/// without prompting again.
	pub async fn connect_wallet(&self, name: &str) -> Result<WalletAccount, WalletKitError> {
		if self.store.is_connected() && self.store.current_wallet().name() == name {
			if let Some(account) = self.store.current_account() {
				return Ok(account);
			}
		}

		let wallet = self.store.set_current_wallet(name)?;

		info!(wallet = %name, "Connecting wallet");
		self.store.set_connection_status(ConnectionStatus::Connecting);

		let result = match tokio::time::timeout(self.timeout, wallet.connect()).await {
			Ok(Ok(accounts)) if accounts.is_empty() => Err(AdapterError::NoAccounts.into()),
			Ok(Ok(accounts)) => self.store.set_wallet_connected(&wallet, accounts, None),
			Ok(Err(e)) => Err(e.into()),
			Err(_) => Err(WalletKitError::Timeout(format!(
				"{} did not answer within {:?}",
				name, self.timeout
			))),
		};

		if let Err(e) = &result {
			warn!(wallet = %name, "Connect failed: {}", e);
			if self.store.connection_status() == ConnectionStatus::Connecting {
				self.store.set_connection_status(ConnectionStatus::Disconnected);
			}
		}

		result
	}

	/// Disconnect the current wallet. Wallet-side errors are logged; the store always ends
	/// disconnected with the session record erased.
	pub async fn disconnect_wallet(&self) {
		let wallet = self.store.current_wallet();
		if let Err(e) = wallet.disconnect().await {
			warn!(wallet = %wallet.name(), "Wallet refused to disconnect cleanly: {}", e);
		}
		self.store.set_wallet_disconnected();
	}
}
