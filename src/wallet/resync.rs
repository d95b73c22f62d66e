//! Live resynchronisation against account changes pushed by the selected wallet.
//!
//! The manager keeps exactly one `accountsChanged` listener registered while the store is
//! `connected` and none otherwise. The listener's lifetime is keyed on the store's
//! [`ConnectionSnapshot`] (status, selected wallet and session epoch), never on who happens to
//! hold the manager, so the same connected interval can never end up with two listeners. A
//! listener never outlives the session it was registered for: a disconnect followed by a
//! reconnect to the same wallet moves to a new epoch, even when the watch channel only ever
//! shows the connected end state.
//!
//! Notifications travel through one channel and are applied by one task, strictly in arrival
//! order, each fully committed to the store before the next one is looked at.

use crate::adapter::{AccountsChangedHandler, ListenerId, SharedWallet, WalletAccount};
use crate::wallet::events::ConnectionSnapshot;
use crate::wallet::{ConnectionStatus, ConnectionStore};

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Notification tagged with the subscription generation that produced it.
type Notification = (u64, Vec<WalletAccount>);

struct ActiveSubscription {
	wallet: SharedWallet,
	listener: ListenerId,
	generation: u64,
	epoch: u64,
}

impl ActiveSubscription {
	fn serves(&self, snapshot: &ConnectionSnapshot) -> bool {
		snapshot.status == ConnectionStatus::Connected
			&& snapshot.epoch == self.epoch
			&& self.wallet.name() == snapshot.wallet
	}
}

#[derive(Default)]
struct ResyncState {
	active: Option<ActiveSubscription>,
	generation: u64,
	closed: bool,
}

impl ResyncState {
	fn unsubscribe(&mut self) {
		if let Some(active) = self.active.take() {
			active.wallet.remove_accounts_changed(active.listener);
			debug!(
				wallet = %active.wallet.name(),
				generation = active.generation,
				"Removed accountsChanged listener"
			);
		}
	}
}

fn lock(shared: &Mutex<ResyncState>) -> MutexGuard<'_, ResyncState> {
	shared.lock().unwrap_or_else(|e| e.into_inner())
}

/// Spawns and owns the resync task.
pub struct ResyncManager;

impl ResyncManager {
	/// Start tracking `store`. Must be called from within a Tokio runtime.
	pub fn spawn(store: Arc<ConnectionStore>) -> ResyncHandle {
		let shared = Arc::new(Mutex::new(ResyncState::default()));
		let (tx, rx) = mpsc::unbounded_channel();
		let connection = store.watch_connection();

		let worker = ResyncWorker {
			store,
			shared: shared.clone(),
			tx,
		};
		let task = tokio::spawn(worker.run(connection, rx));

		ResyncHandle {
			shared,
			task: Some(task),
		}
	}
}

struct ResyncWorker {
	store: Arc<ConnectionStore>,
	shared: Arc<Mutex<ResyncState>>,
	tx: mpsc::UnboundedSender<Notification>,
}

impl ResyncWorker {
	async fn run(
		self,
		mut connection: watch::Receiver<ConnectionSnapshot>,
		mut rx: mpsc::UnboundedReceiver<Notification>,
	) {
		let snapshot = connection.borrow_and_update().clone();
		self.reconcile(&snapshot);

		loop {
			tokio::select! {
				biased;

				changed = connection.changed() => {
					if changed.is_err() {
						debug!("Connection store dropped, stopping resync");
						break;
					}
					let snapshot = connection.borrow_and_update().clone();
					self.reconcile(&snapshot);
				}
				Some((generation, accounts)) = rx.recv() => {
					self.handle_notification(generation, accounts);
				}
			}
		}

		lock(&self.shared).unsubscribe();
	}

	/// Bring the listener in line with the latest status: one listener on the selected wallet
	/// while connected, none otherwise.
	fn reconcile(&self, snapshot: &ConnectionSnapshot) {
		let mut shared = lock(&self.shared);
		if shared.closed {
			return;
		}

		if shared.active.as_ref().is_some_and(|active| active.serves(snapshot)) {
			return;
		}

		shared.unsubscribe();

		if snapshot.status == ConnectionStatus::Connected {
			self.subscribe(&mut shared, snapshot);
		}
	}

	fn subscribe(&self, shared: &mut ResyncState, snapshot: &ConnectionSnapshot) {
		debug_assert!(shared.active.is_none(), "listener already registered");

		// a default wallet may be current without being part of the discovered set
		let wallet = self.store.wallet(&snapshot.wallet).or_else(|| {
			let current = self.store.current_wallet();
			(current.name() == snapshot.wallet).then_some(current)
		});
		let Some(wallet) = wallet else {
			debug!(wallet = %snapshot.wallet, "Connected wallet is no longer selected");
			return;
		};
		shared.generation += 1;
		let generation = shared.generation;

		let tx = self.tx.clone();
		let handler: AccountsChangedHandler = Arc::new(move |accounts: Vec<WalletAccount>| {
			// the receiver only goes away together with the task
			let _ = tx.send((generation, accounts));
		});
		let listener = wallet.on_accounts_changed(handler);

		debug!(
			wallet = %wallet.name(),
			generation,
			epoch = snapshot.epoch,
			"Registered accountsChanged listener"
		);
		shared.active = Some(ActiveSubscription {
			wallet,
			listener,
			generation,
			epoch: snapshot.epoch,
		});
	}

	fn handle_notification(&self, generation: u64, accounts: Vec<WalletAccount>) {
		// held for the whole mutation so shutdown cannot interleave with it
		let mut shared = lock(&self.shared);

		let snapshot = self.store.connection_snapshot();
		let live = !shared.closed
			&& shared
				.active
				.as_ref()
				.is_some_and(|active| active.generation == generation && active.serves(&snapshot));
		if !live {
			debug!(
				generation,
				epoch = snapshot.epoch,
				"Discarding accountsChanged from a stale listener"
			);
			return;
		}

		let Some(first) = accounts.first().cloned() else {
			info!("Wallet reported no accounts, disconnecting");
			self.store.set_wallet_disconnected();
			shared.unsubscribe();
			return;
		};

		self.store.set_connection_status(ConnectionStatus::Connecting);
		self.store.update_wallet_accounts(accounts);

		let same = self
			.store
			.current_account()
			.is_some_and(|current| current.same_address(&first));
		if same {
			self.store.set_connection_status(ConnectionStatus::Connected);
		} else {
			self.store.set_account_switched(first);
		}
	}
}

/// Handle on a running resync task.
///
/// Dropping the handle shuts the task down.
pub struct ResyncHandle {
	shared: Arc<Mutex<ResyncState>>,
	task: Option<JoinHandle<()>>,
}

impl ResyncHandle {
	/// Whether an `accountsChanged` listener is currently registered.
	pub fn is_subscribed(&self) -> bool {
		lock(&self.shared).active.is_some()
	}

	/// Wallet the live listener is registered on.
	pub fn subscribed_wallet(&self) -> Option<String> {
		lock(&self.shared)
			.active
			.as_ref()
			.map(|active| active.wallet.name().to_string())
	}

	/// Remove the live listener and stop the task.
	///
	/// The listener is gone when this returns; notifications still queued are discarded.
	pub fn shutdown(&mut self) {
		{
			let mut shared = lock(&self.shared);
			if !shared.closed {
				shared.closed = true;
				shared.unsubscribe();
				debug!("Resync manager shut down");
			}
		}

		if let Some(task) = self.task.take() {
			task.abort();
		}
	}
}

impl Drop for ResyncHandle {
	fn drop(&mut self) {
		self.shutdown();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::adapter::{MemoryWallet, SupportChain};
	use crate::storage::{MemoryStorage, SessionRecord};
	use crate::wallet::StoreInit;

	const KEY: &str = "test:session";

	async fn settle() {
		for _ in 0..16 {
			tokio::task::yield_now().await;
		}
	}

	fn setup() -> (Arc<MemoryWallet>, Arc<MemoryStorage>, Arc<ConnectionStore>) {
		let wallet = Arc::new(MemoryWallet::new("unisat", SupportChain::Bitcoin).with_accounts(["0x1"]));
		let storage = Arc::new(MemoryStorage::new());
		let store = ConnectionStore::initialize(StoreInit {
			chain: SupportChain::Bitcoin,
			wallets: vec![wallet.clone()],
			default_wallet: None,
			auto_connect_enabled: false,
			storage: storage.clone(),
			storage_key: KEY.to_string(),
		})
		.unwrap();
		(wallet, storage, Arc::new(store))
	}

	#[tokio::test]
	async fn test_subscribes_only_while_connected() {
		let (wallet, _storage, store) = setup();
		let handle = ResyncManager::spawn(store.clone());
		settle().await;
		assert!(!handle.is_subscribed());
		assert_eq!(wallet.listener_count(), 0);

		store.set_account_switched(WalletAccount::new("0x1"));
		settle().await;
		assert!(handle.is_subscribed());
		assert_eq!(wallet.listener_count(), 1);

		store.set_wallet_disconnected();
		settle().await;
		assert!(!handle.is_subscribed());
		assert_eq!(wallet.listener_count(), 0);
	}

	#[tokio::test]
	async fn test_empty_notification_disconnects() {
		let (wallet, storage, store) = setup();
		let _handle = ResyncManager::spawn(store.clone());
		store.set_account_switched(WalletAccount::new("0x1"));
		settle().await;

		wallet.set_accounts(Vec::new());
		settle().await;

		assert_eq!(store.connection_status(), ConnectionStatus::Disconnected);
		assert!(store.current_account().is_none());
		assert!(SessionRecord::load(storage.as_ref(), KEY).unwrap().is_none());
		assert_eq!(wallet.listener_count(), 0);
	}

	#[tokio::test]
	async fn test_first_account_wins() {
		let (wallet, storage, store) = setup();
		let _handle = ResyncManager::spawn(store.clone());
		store.set_account_switched(WalletAccount::new("0x1"));
		settle().await;

		wallet.set_accounts(vec![WalletAccount::new("0x2"), WalletAccount::new("0x1")]);
		settle().await;

		assert_eq!(store.connection_status(), ConnectionStatus::Connected);
		assert_eq!(store.current_account().unwrap().address, "0x2");
		assert_eq!(store.accounts().len(), 2);
		let record = SessionRecord::load(storage.as_ref(), KEY).unwrap().unwrap();
		assert_eq!(record.account_address.as_deref(), Some("0x2"));
		// the transient `connecting` did not cost us the listener
		assert_eq!(wallet.listener_count(), 1);
	}

	#[tokio::test]
	async fn test_repeated_account_converges_without_writes() {
		let (wallet, storage, store) = setup();
		let _handle = ResyncManager::spawn(store.clone());
		store.set_account_switched(WalletAccount::new("0x1"));
		settle().await;
		let before = SessionRecord::load(storage.as_ref(), KEY).unwrap().unwrap();

		wallet.set_accounts(vec![WalletAccount::new("0x1")]);
		settle().await;
		wallet.set_accounts(vec![WalletAccount::new("0x1")]);
		settle().await;

		assert_eq!(store.connection_status(), ConnectionStatus::Connected);
		assert_eq!(store.current_account().unwrap().address, "0x1");
		let after = SessionRecord::load(storage.as_ref(), KEY).unwrap().unwrap();
		assert_eq!(before.connected_at, after.connected_at);
		assert_eq!(wallet.listener_count(), 1);
	}

	#[tokio::test]
	async fn test_notifications_apply_in_order() {
		let (wallet, _storage, store) = setup();
		let _handle = ResyncManager::spawn(store.clone());
		store.set_account_switched(WalletAccount::new("0x1"));
		settle().await;

		wallet.emit_accounts_changed(vec![WalletAccount::new("0x2")]);
		wallet.emit_accounts_changed(vec![WalletAccount::new("0x3")]);
		wallet.emit_accounts_changed(vec![WalletAccount::new("0x4")]);
		settle().await;

		assert_eq!(store.current_account().unwrap().address, "0x4");
		assert_eq!(store.connection_status(), ConnectionStatus::Connected);
	}

	#[tokio::test]
	async fn test_shutdown_removes_listener_and_discards_pending() {
		let (wallet, _storage, store) = setup();
		let mut handle = ResyncManager::spawn(store.clone());
		store.set_account_switched(WalletAccount::new("0x1"));
		settle().await;
		assert_eq!(wallet.listener_count(), 1);

		// queued but not yet processed when teardown happens
		wallet.emit_accounts_changed(Vec::new());
		handle.shutdown();

		assert_eq!(wallet.listener_count(), 0);
		settle().await;
		assert_eq!(store.connection_status(), ConnectionStatus::Connected);
		assert_eq!(store.current_account().unwrap().address, "0x1");
	}

	#[tokio::test]
	async fn test_reconnect_before_task_runs_drops_old_session_notifications() {
		let (wallet, storage, store) = setup();
		let handle = ResyncManager::spawn(store.clone());
		store.set_account_switched(WalletAccount::new("0x1"));
		settle().await;
		let first = store.connection_snapshot();

		// lock arrives for the first session, then the user reconnects before it is processed
		wallet.emit_accounts_changed(Vec::new());
		store.set_wallet_disconnected();
		store.set_account_switched(WalletAccount::new("0x1"));
		settle().await;

		assert_eq!(store.connection_status(), ConnectionStatus::Connected);
		assert_eq!(store.current_account().unwrap().address, "0x1");
		assert!(SessionRecord::load(storage.as_ref(), KEY).unwrap().is_some());
		assert_eq!(store.connection_snapshot().epoch, first.epoch + 1);
		assert!(handle.is_subscribed());
		assert_eq!(wallet.listener_count(), 1);

		// the fresh listener still drives the new session
		wallet.set_accounts(vec![WalletAccount::new("0x2")]);
		settle().await;
		assert_eq!(store.current_account().unwrap().address, "0x2");
	}

	#[tokio::test]
	async fn test_listens_on_default_wallet_outside_discovered_set() {
		let fallback = Arc::new(MemoryWallet::new("unisat", SupportChain::Bitcoin).with_accounts(["0x1"]));
		let store = Arc::new(
			ConnectionStore::initialize(StoreInit {
				chain: SupportChain::Bitcoin,
				wallets: Vec::new(),
				default_wallet: Some(fallback.clone()),
				auto_connect_enabled: false,
				storage: Arc::new(MemoryStorage::new()),
				storage_key: KEY.to_string(),
			})
			.unwrap(),
		);
		let handle = ResyncManager::spawn(store.clone());

		store.set_account_switched(WalletAccount::new("0x1"));
		settle().await;

		assert_eq!(handle.subscribed_wallet().as_deref(), Some("unisat"));
		assert_eq!(fallback.listener_count(), 1);
	}

	#[tokio::test]
	async fn test_wallet_change_moves_listener() {
		let unisat = Arc::new(MemoryWallet::new("unisat", SupportChain::Bitcoin).with_accounts(["0x1"]));
		let okx = Arc::new(MemoryWallet::new("okx", SupportChain::Bitcoin).with_accounts(["0x9"]));
		let store = Arc::new(
			ConnectionStore::initialize(StoreInit {
				chain: SupportChain::Bitcoin,
				wallets: vec![unisat.clone(), okx.clone()],
				default_wallet: None,
				auto_connect_enabled: false,
				storage: Arc::new(MemoryStorage::new()),
				storage_key: KEY.to_string(),
			})
			.unwrap(),
		);
		let handle = ResyncManager::spawn(store.clone());

		store.set_account_switched(WalletAccount::new("0x1"));
		settle().await;
		assert_eq!(handle.subscribed_wallet().as_deref(), Some("unisat"));

		let okx_shared: SharedWallet = okx.clone();
		store
			.set_wallet_connected(&okx_shared, vec![WalletAccount::new("0x9")], None)
			.unwrap();
		settle().await;

		assert_eq!(handle.subscribed_wallet().as_deref(), Some("okx"));
		assert_eq!(unisat.listener_count(), 0);
		assert_eq!(okx.listener_count(), 1);
	}
}
