//! Composition root for the wallet connection lifecycle.
//!
//! `WalletProvider` wires discovery, the connection store, the resync manager and the
//! auto-connect sequencer together:
//!
//! 1. discovery resolves the installed wallets for the configured chain,
//! 2. the store is initialized with the wallet picked by the default-selection policy,
//! 3. the resync manager starts following the store's status,
//! 4. auto-connect optionally promotes the store to `connected`.
//!
//! The result is an explicitly owned [`WalletSession`] that is shut down explicitly.

use crate::adapter::{SharedWallet, SupportChain};
use crate::config::{DefaultWalletPolicy, WalletProviderConfig};
use crate::storage::{MemoryStorage, StateStorage};
use crate::wallet::{
	AutoConnectOutcome, AutoConnectSequencer, ConnectionStore, ResyncHandle, ResyncManager,
	StoreInit, WalletConnector, WalletDiscovery, WalletKitError,
};

use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of mounting the provider.
pub enum MountOutcome {
	Ready(WalletSession),
	/// Discovery found nothing to connect to. Not an error; mount again once wallets show up.
	NoWallets,
}

pub struct WalletProvider {
	config: WalletProviderConfig,
	discovery: Arc<WalletDiscovery>,
	storage: Arc<dyn StateStorage>,
	fallback: Option<SharedWallet>,
}

impl WalletProvider {
	/// Provider over `adapters`, persisting into ephemeral memory storage.
	pub fn new(config: WalletProviderConfig, adapters: Vec<SharedWallet>) -> Self {
		let discovery = Arc::new(WalletDiscovery::new(adapters, config.probe_timeout()));
		Self {
			config,
			discovery,
			storage: Arc::new(MemoryStorage::new()),
			fallback: None,
		}
	}

	pub fn with_storage(mut self, storage: Arc<dyn StateStorage>) -> Self {
		self.storage = storage;
		self
	}

	/// Wallet selected when the policy finds no discovered wallet for the chain.
	pub fn with_fallback_wallet(mut self, wallet: SharedWallet) -> Self {
		self.fallback = Some(wallet);
		self
	}

	pub fn config(&self) -> &WalletProviderConfig {
		&self.config
	}

	pub fn discovery(&self) -> &WalletDiscovery {
		&self.discovery
	}

	/// Discover wallets, build the store and start the session.
	pub async fn mount(&self) -> Result<MountOutcome, WalletKitError> {
		let chain = self.config.chain;
		let wallets = self.discovery.discover(chain).await;
		if wallets.is_empty() {
			info!(chain = %chain, "No wallets installed, nothing to mount");
			return Ok(MountOutcome::NoWallets);
		}

		let default_wallet = select_default_wallet(
			&self.config.default_selection,
			chain,
			&wallets,
			self.fallback.as_ref(),
		);
		debug!(
			default = ?default_wallet.as_ref().map(|w| w.name().to_string()),
			"Resolved default wallet"
		);

		let store = Arc::new(ConnectionStore::initialize(StoreInit {
			chain,
			wallets,
			default_wallet,
			auto_connect_enabled: self.config.auto_connect,
			storage: self.storage.clone(),
			storage_key: self.config.storage_key.clone(),
		})?);

		let resync = ResyncManager::spawn(store.clone());
		let auto_connect = AutoConnectSequencer::new(store.clone(), self.config.reconnect_timeout())
			.run()
			.await;
		info!(outcome = ?auto_connect, "Wallet session mounted");

		Ok(MountOutcome::Ready(WalletSession {
			connector: WalletConnector::new(store.clone(), self.config.reconnect_timeout()),
			store,
			resync,
			auto_connect,
		}))
	}

	/// Re-run discovery for the session's chain and hand the result to its store.
	///
	/// Returns the number of wallets now known. When nothing is installed any more the store
	/// keeps its previous set.
	pub async fn refresh_wallets(&self, session: &WalletSession) -> Result<usize, WalletKitError> {
		let chain = session.store.chain();
		self.discovery.invalidate(chain);
		let wallets = self.discovery.discover(chain).await;
		if wallets.is_empty() {
			warn!(chain = %chain, "Rediscovery found no wallets, keeping the current set");
			return Ok(session.store.wallets().len());
		}

		let count = wallets.len();
		session.store.set_wallets(wallets)?;
		info!(chain = %chain, wallets = count, "Wallet set refreshed");
		Ok(count)
	}

	/// Tear `session` down and mount again against `chain`, re-running discovery.
	pub async fn switch_chain(
		&mut self,
		mut session: WalletSession,
		chain: SupportChain,
	) -> Result<MountOutcome, WalletKitError> {
		session.shutdown();
		info!(from = %self.config.chain, to = %chain, "Switching chain");
		self.config.chain = chain;
		self.discovery.invalidate(chain);
		self.mount().await
	}
}

/// Pick the initially selected wallet among the discovered ones.
pub fn select_default_wallet(
	policy: &DefaultWalletPolicy,
	chain: SupportChain,
	wallets: &[SharedWallet],
	fallback: Option<&SharedWallet>,
) -> Option<SharedWallet> {
	let first_for_chain = || {
		wallets
			.iter()
			.find(|w| w.chain() == chain)
			.or(fallback)
			.or_else(|| wallets.first())
			.cloned()
	};

	match policy {
		DefaultWalletPolicy::FirstForChain => first_for_chain(),
		DefaultWalletPolicy::Named(name) => wallets
			.iter()
			.find(|w| w.name() == name)
			.cloned()
			.or_else(first_for_chain),
		DefaultWalletPolicy::Fallback => fallback.cloned().or_else(first_for_chain),
	}
}

/// A mounted wallet session.
pub struct WalletSession {
	store: Arc<ConnectionStore>,
	connector: WalletConnector,
	resync: ResyncHandle,
	auto_connect: AutoConnectOutcome,
}

impl WalletSession {
	pub fn store(&self) -> &Arc<ConnectionStore> {
		&self.store
	}

	pub fn connector(&self) -> &WalletConnector {
		&self.connector
	}

	pub fn resync(&self) -> &ResyncHandle {
		&self.resync
	}

	/// How the auto-connect run at mount time ended.
	pub fn auto_connect_outcome(&self) -> &AutoConnectOutcome {
		&self.auto_connect
	}

	/// Remove the live account listener and stop background work.
	pub fn shutdown(&mut self) {
		self.resync.shutdown();
	}
}
