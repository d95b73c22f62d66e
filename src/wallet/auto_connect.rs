//! Silent reconnect to the most recently used wallet.

use crate::adapter::{AdapterError, SharedWallet, WalletAccount};
use crate::wallet::{ConnectionStatus, ConnectionStore, WalletKitError};

use backoff::ExponentialBackoffBuilder;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How an auto-connect run ended. Never an error: the store is either connected or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoConnectOutcome {
	/// Auto-connect is switched off for this store.
	Disabled,
	/// No session record was persisted.
	NoSession,
	/// The recorded wallet is not among the discovered wallets.
	WalletUnavailable(String),
	/// The store was already connecting or connected.
	AlreadyConnected,
	/// Reconnected silently.
	Connected(WalletAccount),
	/// The wallet could not be reconnected; the store is left disconnected.
	Failed,
}

pub struct AutoConnectSequencer {
	store: Arc<ConnectionStore>,
	timeout: Duration,
}

impl AutoConnectSequencer {
	pub fn new(store: Arc<ConnectionStore>, timeout: Duration) -> Self {
		Self { store, timeout }
	}

	/// Run once after discovery and store initialization.
	pub async fn run(&self) -> AutoConnectOutcome {
		if !self.store.auto_connect_enabled() {
			return AutoConnectOutcome::Disabled;
		}

		let Some(record) = self.store.persisted_session().cloned() else {
			debug!("No persisted session, skipping auto-connect");
			return AutoConnectOutcome::NoSession;
		};

		if self.store.connection_status() != ConnectionStatus::Disconnected {
			return AutoConnectOutcome::AlreadyConnected;
		}

		let chain = self.store.chain();
		let wallet = match self.store.wallet(&record.wallet_name) {
			Some(wallet) if record.chain == chain && wallet.chain() == chain => wallet,
			_ => {
				info!(
					wallet = %record.wallet_name,
					chain = %record.chain,
					"Persisted wallet not available, skipping auto-connect"
				);
				return AutoConnectOutcome::WalletUnavailable(record.wallet_name);
			}
		};

		if let Err(e) = self.store.set_current_wallet(wallet.name()) {
			warn!("Auto-connect could not select {}: {}", wallet.name(), e);
			return AutoConnectOutcome::Failed;
		}

		info!(wallet = %wallet.name(), "Attempting silent reconnect");
		self.store.set_connection_status(ConnectionStatus::Connecting);

		match self.silent_reconnect(&wallet).await {
			Ok(accounts) => {
				let selected = record
					.account_address
					.as_deref()
					.and_then(|address| accounts.iter().find(|a| a.address == address))
					.unwrap_or(&accounts[0])
					.clone();

				// a notification-driven disconnect may have won the race while we waited
				if self.store.connection_status() != ConnectionStatus::Connecting {
					return AutoConnectOutcome::Failed;
				}

				self.store.update_wallet_accounts(accounts);
				self.store.set_account_switched(selected.clone());
				info!(
					wallet = %wallet.name(),
					address = %selected.address,
					"Silent reconnect succeeded"
				);
				AutoConnectOutcome::Connected(selected)
			}
			Err(e) => {
				warn!(wallet = %wallet.name(), "{}", e);
				if self.store.connection_status() == ConnectionStatus::Connecting {
					self.store.set_connection_status(ConnectionStatus::Disconnected);
				}
				AutoConnectOutcome::Failed
			}
		}
	}

	/// Ask the wallet for its authorised accounts without prompting when it can, retrying
	/// transient provider errors until `timeout` runs out.
	async fn silent_reconnect(
		&self,
		wallet: &SharedWallet,
	) -> Result<Vec<WalletAccount>, WalletKitError> {
		let policy = ExponentialBackoffBuilder::new()
			.with_initial_interval(Duration::from_millis(100))
			.with_max_elapsed_time(Some(self.timeout))
			.build();

		let attempt = move || async move {
			let result = if wallet.supports_silent_reconnect() {
				wallet.get_accounts().await
			} else {
				wallet.connect().await
			};

			match result {
				Ok(accounts) if accounts.is_empty() => {
					Err(backoff::Error::permanent(AdapterError::NoAccounts))
				}
				Ok(accounts) => Ok(accounts),
				Err(e) if e.is_transient() => {
					debug!(wallet = %wallet.name(), "Retrying silent reconnect: {}", e);
					Err(backoff::Error::transient(e))
				}
				Err(e) => Err(backoff::Error::permanent(e)),
			}
		};

		match tokio::time::timeout(self.timeout, backoff::future::retry(policy, attempt)).await {
			Ok(Ok(accounts)) => Ok(accounts),
			Ok(Err(e)) => Err(WalletKitError::SilentReconnectFailed(e.to_string())),
			Err(_) => Err(WalletKitError::SilentReconnectFailed(format!(
				"no answer from {} within {:?}",
				wallet.name(),
				self.timeout
			))),
		}
	}
}
