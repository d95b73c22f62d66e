//! Wallet discovery.
//!
//! Probes every registered adapter for availability and publishes the usable ones. A chain's
//! result is resolved once and shared by all callers; it is only probed again after
//! [`WalletDiscovery::invalidate`]. An empty result is a legitimate outcome, not an error.

use crate::adapter::{SharedWallet, SupportChain};

use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub struct WalletDiscovery {
	adapters: Vec<SharedWallet>,
	probe_timeout: Duration,
	resolved: Mutex<HashMap<SupportChain, Arc<OnceCell<Vec<SharedWallet>>>>>,
}

impl WalletDiscovery {
	pub fn new(adapters: Vec<SharedWallet>, probe_timeout: Duration) -> Self {
		Self {
			adapters,
			probe_timeout,
			resolved: Mutex::new(HashMap::new()),
		}
	}

	/// All registered adapters, installed or not.
	pub fn adapters(&self) -> &[SharedWallet] {
		&self.adapters
	}

	/// Installed wallets, in registration order.
	///
	/// Concurrent callers for the same chain await a single probe run.
	pub async fn discover(&self, chain: SupportChain) -> Vec<SharedWallet> {
		let cell = {
			let mut resolved = self.resolved.lock().unwrap_or_else(|e| e.into_inner());
			resolved.entry(chain).or_default().clone()
		};

		cell.get_or_init(|| self.probe(chain)).await.clone()
	}

	/// Forget the cached result for `chain` so the next `discover` probes again.
	pub fn invalidate(&self, chain: SupportChain) {
		let mut resolved = self.resolved.lock().unwrap_or_else(|e| e.into_inner());
		resolved.remove(&chain);
	}

	async fn probe(&self, chain: SupportChain) -> Vec<SharedWallet> {
		debug!(chain = %chain, adapters = self.adapters.len(), "Probing wallets");

		let checks = self.adapters.iter().map(|adapter| async move {
			match tokio::time::timeout(self.probe_timeout, adapter.check_installed()).await {
				Ok(installed) => installed,
				Err(_) => {
					warn!(
						wallet = %adapter.name(),
						"Install probe timed out after {:?}, treating as unavailable",
						self.probe_timeout
					);
					false
				}
			}
		});

		let results = join_all(checks).await;

		let installed: Vec<SharedWallet> = self
			.adapters
			.iter()
			.zip(results)
			.filter_map(|(adapter, installed)| installed.then(|| adapter.clone()))
			.collect();

		if installed.is_empty() {
			info!(chain = %chain, "No wallets available");
		} else {
			info!(
				chain = %chain,
				"Discovered {} wallets: {}",
				installed.len(),
				installed
					.iter()
					.map(|w| w.name())
					.collect::<Vec<_>>()
					.join(", ")
			);
		}

		installed
	}
}
