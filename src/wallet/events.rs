//! Change notifications emitted by the connection store.
//!
//! The store is the only writer of connection state. Everything else (UI layers, the resync
//! manager, logging) observes it through the types in this module:
//!
//! - [`StoreEvent`] is broadcast after every committed mutation, in commit order.
//! - [`ConnectionSnapshot`] is published on a watch channel and always holds the latest
//!   status together with the selected wallet and the session epoch. The resync manager keys
//!   its subscription on it.

use crate::adapter::WalletAccount;
use crate::wallet::ConnectionStatus;

use tokio::sync::broadcast;
use tracing::debug;

/// Events broadcast by the connection store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
	/// The connection status changed
	StatusChanged {
		previous: ConnectionStatus,
		current: ConnectionStatus,
	},
	/// A different wallet was selected
	WalletChanged { wallet: String },
	/// The selected account changed (`None` after a disconnect)
	AccountChanged { account: Option<WalletAccount> },
	/// The discovered wallet set was replaced
	WalletsUpdated { wallets: Vec<String> },
}

/// Latest status and selected wallet, as seen by watchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
	pub status: ConnectionStatus,
	pub wallet: String,
	/// Incremented every time the store falls back to `disconnected`. Two snapshots with the
	/// same epoch belong to the same session, even if the watch channel coalesced the updates
	/// in between.
	pub epoch: u64,
}

/// Read-only handle on the store's event feed.
///
/// Lagging receivers skip the events they missed instead of failing; the store state itself is
/// always available through the read accessors.
pub struct StoreEventStream {
	receiver: broadcast::Receiver<StoreEvent>,
}

impl StoreEventStream {
	pub(crate) fn new(receiver: broadcast::Receiver<StoreEvent>) -> Self {
		Self { receiver }
	}

	/// Wait for the next event. `None` once the store has been dropped.
	pub async fn recv(&mut self) -> Option<StoreEvent> {
		loop {
			match self.receiver.recv().await {
				Ok(event) => return Some(event),
				Err(broadcast::error::RecvError::Closed) => return None,
				Err(broadcast::error::RecvError::Lagged(count)) => {
					debug!(lagged = count, "Store event consumer lagged, events dropped");
				}
			}
		}
	}

	/// Next event if one is already queued.
	pub fn try_recv(&mut self) -> Option<StoreEvent> {
		loop {
			match self.receiver.try_recv() {
				Ok(event) => return Some(event),
				Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
				Err(_) => return None,
			}
		}
	}

	/// Drain everything currently queued.
	pub fn drain(&mut self) -> Vec<StoreEvent> {
		std::iter::from_fn(|| self.try_recv()).collect()
	}
}
