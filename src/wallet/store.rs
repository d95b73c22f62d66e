//! Connection store: the single source of truth for wallet connection state.
//!
//! The store owns the connection status, the discovered wallet set, the selected wallet and the
//! selected account. Every mutation runs to completion under one lock, persists the session
//! record where required, and only then publishes [`StoreEvent`]s, so no observer ever sees a
//! half-applied transition.
//!
//! State machine:
//!
//! ```text
//! disconnected --connect attempt--> connecting --success--> connected
//!      ^                                 |                      |  \
//!      |                                 | failure/timeout      |   `-- switch account --> connected
//!      +---------------------------------+----------------------+
//!                     no accounts / explicit disconnect
//! ```

use crate::adapter::{SharedWallet, SupportChain, WalletAccount};
use crate::storage::{SessionRecord, StateStorage};
use crate::wallet::events::{ConnectionSnapshot, StoreEvent, StoreEventStream};
use crate::wallet::{ConnectionStatus, WalletKitError};

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Everything needed to build a [`ConnectionStore`].
pub struct StoreInit {
	pub chain: SupportChain,
	pub wallets: Vec<SharedWallet>,
	/// Wallet selected when no persisted session names another one.
	pub default_wallet: Option<SharedWallet>,
	pub auto_connect_enabled: bool,
	pub storage: Arc<dyn StateStorage>,
	pub storage_key: String,
}

struct StoreState {
	chain: SupportChain,
	wallets: Vec<SharedWallet>,
	current_wallet: SharedWallet,
	accounts: Vec<WalletAccount>,
	current_account: Option<WalletAccount>,
	connection_status: ConnectionStatus,
	epoch: u64,
}

impl StoreState {
	fn find_wallet(&self, name: &str) -> Option<SharedWallet> {
		self.wallets.iter().find(|w| w.name() == name).cloned()
	}

	fn snapshot(&self) -> ConnectionSnapshot {
		ConnectionSnapshot {
			status: self.connection_status,
			wallet: self.current_wallet.name().to_string(),
			epoch: self.epoch,
		}
	}
}

/// Wallet connection state machine
pub struct ConnectionStore {
	state: Mutex<StoreState>,
	auto_connect_enabled: bool,
	storage: Arc<dyn StateStorage>,
	storage_key: String,
	persisted_session: Option<SessionRecord>,
	events: broadcast::Sender<StoreEvent>,
	snapshot: watch::Sender<ConnectionSnapshot>,
}

impl ConnectionStore {
	/// Build the store.
	///
	/// The persisted session record is read exactly once, here. When it names a wallet of the
	/// set and was written for the same chain, that wallet becomes current; otherwise `default_wallet` does, falling back to the
	/// first wallet. The store always starts `disconnected`.
	pub fn initialize(init: StoreInit) -> Result<Self, WalletKitError> {
		let StoreInit {
			chain,
			wallets,
			default_wallet,
			auto_connect_enabled,
			storage,
			storage_key,
		} = init;

		if wallets.is_empty() && default_wallet.is_none() {
			return Err(WalletKitError::InvalidConfiguration(
				"no wallets available and no default wallet supplied".to_string(),
			));
		}

		// the set is keyed by name; later duplicates are dropped
		let mut unique: Vec<SharedWallet> = Vec::with_capacity(wallets.len());
		for wallet in wallets {
			if unique.iter().any(|w| w.name() == wallet.name()) {
				warn!(wallet = %wallet.name(), "Ignoring duplicate wallet");
				continue;
			}
			unique.push(wallet);
		}

		let persisted_session = match SessionRecord::load(storage.as_ref(), &storage_key) {
			Ok(record) => record,
			Err(e) => {
				warn!("Ignoring unreadable session record under {}: {}", storage_key, e);
				None
			}
		};

		let restored = persisted_session
			.as_ref()
			.filter(|record| {
				if record.chain != chain {
					debug!(
						wallet = %record.wallet_name,
						recorded = %record.chain,
						"Persisted session belongs to another chain"
					);
				}
				record.chain == chain
			})
			.and_then(|record| unique.iter().find(|w| w.name() == record.wallet_name).cloned());

		let current_wallet = match (restored, default_wallet) {
			(Some(wallet), _) => {
				debug!(wallet = %wallet.name(), "Selecting wallet from persisted session");
				wallet
			}
			(None, Some(wallet)) => wallet,
			(None, None) => unique[0].clone(),
		};

		if !unique.is_empty() && !unique.iter().any(|w| w.name() == current_wallet.name()) {
			debug!(wallet = %current_wallet.name(), "Adding default wallet to the wallet set");
			unique.push(current_wallet.clone());
		}

		let state = StoreState {
			chain,
			wallets: unique,
			current_wallet,
			accounts: Vec::new(),
			current_account: None,
			connection_status: ConnectionStatus::Disconnected,
			epoch: 0,
		};

		info!(
			chain = %chain,
			wallets = state.wallets.len(),
			current = %state.current_wallet.name(),
			auto_connect = auto_connect_enabled,
			"Initialized connection store"
		);

		let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
		let (snapshot, _) = watch::channel(state.snapshot());

		Ok(Self {
			state: Mutex::new(state),
			auto_connect_enabled,
			storage,
			storage_key,
			persisted_session,
			events,
			snapshot,
		})
	}

	fn lock(&self) -> MutexGuard<'_, StoreState> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}

	fn emit(&self, event: StoreEvent) {
		// no receivers is fine, the event is simply dropped
		let _ = self.events.send(event);
	}

	fn publish_snapshot(&self, state: &StoreState) {
		self.snapshot.send_if_modified(|current| {
			let next = state.snapshot();
			if *current == next {
				false
			} else {
				*current = next;
				true
			}
		});
	}

	fn apply_status(&self, state: &mut StoreState, status: ConnectionStatus) {
		let previous = state.connection_status;
		if previous == status {
			return;
		}
		state.connection_status = status;
		if status == ConnectionStatus::Disconnected {
			state.epoch += 1;
		}
		debug!(%previous, current = %status, epoch = state.epoch, "Connection status changed");
		self.emit(StoreEvent::StatusChanged {
			previous,
			current: status,
		});
	}

	fn persist_session(&self, state: &StoreState, account: &WalletAccount) {
		let record = SessionRecord::new(state.current_wallet.as_ref(), state.chain, account);
		if let Err(e) = record.save(self.storage.as_ref(), &self.storage_key) {
			warn!("Failed to persist session record: {}", e);
		}
	}

	/// Pure status transition. Callers keep the account invariants themselves.
	pub fn set_connection_status(&self, status: ConnectionStatus) {
		let mut state = self.lock();
		self.apply_status(&mut state, status);
		self.publish_snapshot(&state);
	}

	/// Make `account` the selected account and mark the store connected.
	///
	/// Persists the session record when the selection actually changes. Re-supplying the
	/// current account keeps the existing instance and writes nothing.
	pub fn set_account_switched(&self, account: WalletAccount) {
		let mut state = self.lock();

		let unchanged = state
			.current_account
			.as_ref()
			.is_some_and(|current| current.same_address(&account));

		if !unchanged {
			if !state.accounts.iter().any(|a| a.same_address(&account)) {
				state.accounts.insert(0, account.clone());
			}
			self.persist_session(&state, &account);
			info!(
				wallet = %state.current_wallet.name(),
				address = %account.address,
				"Account switched"
			);
			state.current_account = Some(account.clone());
			self.emit(StoreEvent::AccountChanged {
				account: Some(account),
			});
		}

		self.apply_status(&mut state, ConnectionStatus::Connected);
		self.publish_snapshot(&state);
	}

	/// Record a successful connection to `wallet` with its authorised `accounts`.
	///
	/// `selected` picks the account by address; the first account is used when it is absent
	/// or not part of `accounts`.
	pub fn set_wallet_connected(
		&self,
		wallet: &SharedWallet,
		accounts: Vec<WalletAccount>,
		selected: Option<&str>,
	) -> Result<WalletAccount, WalletKitError> {
		let mut state = self.lock();

		let wallet = state
			.find_wallet(wallet.name())
			.ok_or_else(|| WalletKitError::WalletNotFound(wallet.name().to_string()))?;

		let account = selected
			.and_then(|address| accounts.iter().find(|a| a.address == address))
			.or_else(|| accounts.first())
			.cloned()
			.ok_or(crate::adapter::AdapterError::NoAccounts)?;

		if state.current_wallet.name() != wallet.name() {
			state.current_wallet = wallet.clone();
			self.emit(StoreEvent::WalletChanged {
				wallet: wallet.name().to_string(),
			});
		}

		state.accounts = accounts;
		self.persist_session(&state, &account);

		let changed = state
			.current_account
			.as_ref()
			.is_none_or(|current| !current.same_address(&account));
		if changed {
			state.current_account = Some(account.clone());
			self.emit(StoreEvent::AccountChanged {
				account: Some(account.clone()),
			});
		}

		info!(wallet = %wallet.name(), address = %account.address, "Wallet connected");
		self.apply_status(&mut state, ConnectionStatus::Connected);
		self.publish_snapshot(&state);

		Ok(account)
	}

	/// The single cleanup path: clear the selected account, go `disconnected` and erase the
	/// persisted session record.
	///
	/// The record is removed before the in-memory state is cleared and before any event is
	/// published, so observers never see a cleared account next to a stale record.
	pub fn set_wallet_disconnected(&self) {
		let mut state = self.lock();

		if let Err(e) = SessionRecord::clear(self.storage.as_ref(), &self.storage_key) {
			warn!("Failed to clear session record: {}", e);
		}

		state.accounts.clear();
		if state.current_account.take().is_some() {
			self.emit(StoreEvent::AccountChanged { account: None });
		}

		if state.connection_status != ConnectionStatus::Disconnected {
			info!(wallet = %state.current_wallet.name(), "Wallet disconnected");
		}
		self.apply_status(&mut state, ConnectionStatus::Disconnected);
		self.publish_snapshot(&state);
	}

	/// Replace the account set reported by the current wallet. Does not persist.
	pub fn update_wallet_accounts(&self, accounts: Vec<WalletAccount>) {
		let mut state = self.lock();
		state.accounts = accounts;
	}

	/// Select another discovered wallet. A live connection is torn down first.
	pub fn set_current_wallet(&self, name: &str) -> Result<SharedWallet, WalletKitError> {
		let wallet = self
			.wallet(name)
			.ok_or_else(|| WalletKitError::WalletNotFound(name.to_string()))?;

		if self.current_wallet().name() == name {
			return Ok(wallet);
		}

		if self.connection_status() != ConnectionStatus::Disconnected {
			self.set_wallet_disconnected();
		}

		let mut state = self.lock();
		state.current_wallet = wallet.clone();
		info!(wallet = %name, "Selected wallet");
		self.emit(StoreEvent::WalletChanged {
			wallet: name.to_string(),
		});
		self.publish_snapshot(&state);

		Ok(wallet)
	}

	/// Replace the discovered wallet set.
	///
	/// The current wallet always stays a member of the set: when the new set drops it, a live
	/// connection is torn down first and the first wallet of the store's chain is selected
	/// instead.
	pub fn set_wallets(&self, wallets: Vec<SharedWallet>) -> Result<(), WalletKitError> {
		let mut unique: Vec<SharedWallet> = Vec::with_capacity(wallets.len());
		for wallet in wallets {
			if !unique.iter().any(|w| w.name() == wallet.name()) {
				unique.push(wallet);
			}
		}
		let Some(first) = unique.first().cloned() else {
			return Err(WalletKitError::InvalidConfiguration(
				"wallet set cannot be empty".to_string(),
			));
		};

		let current = self.current_wallet();
		let kept = unique.iter().any(|w| w.name() == current.name());
		if !kept && self.connection_status() != ConnectionStatus::Disconnected {
			self.set_wallet_disconnected();
		}

		let mut state = self.lock();
		let names: Vec<String> = unique.iter().map(|w| w.name().to_string()).collect();
		if !kept {
			let replacement = unique
				.iter()
				.find(|w| w.chain() == state.chain)
				.cloned()
				.unwrap_or(first);
			info!(
				dropped = %current.name(),
				wallet = %replacement.name(),
				"Current wallet left the wallet set"
			);
			state.current_wallet = replacement;
		}
		state.wallets = unique;

		debug!(wallets = ?names, "Wallet set replaced");
		self.emit(StoreEvent::WalletsUpdated { wallets: names });
		if !kept {
			self.emit(StoreEvent::WalletChanged {
				wallet: state.current_wallet.name().to_string(),
			});
		}
		self.publish_snapshot(&state);

		Ok(())
	}

	pub fn chain(&self) -> SupportChain {
		self.lock().chain
	}

	pub fn wallets(&self) -> Vec<SharedWallet> {
		self.lock().wallets.clone()
	}

	pub fn wallet(&self, name: &str) -> Option<SharedWallet> {
		self.lock().find_wallet(name)
	}

	pub fn current_wallet(&self) -> SharedWallet {
		self.lock().current_wallet.clone()
	}

	pub fn current_account(&self) -> Option<WalletAccount> {
		self.lock().current_account.clone()
	}

	pub fn accounts(&self) -> Vec<WalletAccount> {
		self.lock().accounts.clone()
	}

	pub fn connection_status(&self) -> ConnectionStatus {
		self.lock().connection_status
	}

	pub fn is_connected(&self) -> bool {
		self.connection_status() == ConnectionStatus::Connected
	}

	pub fn auto_connect_enabled(&self) -> bool {
		self.auto_connect_enabled
	}

	pub fn storage(&self) -> Arc<dyn StateStorage> {
		self.storage.clone()
	}

	pub fn storage_key(&self) -> &str {
		&self.storage_key
	}

	/// Session record found at initialization, if any.
	pub fn persisted_session(&self) -> Option<&SessionRecord> {
		self.persisted_session.as_ref()
	}

	/// Subscribe to store events committed from now on.
	pub fn subscribe(&self) -> StoreEventStream {
		StoreEventStream::new(self.events.subscribe())
	}

	/// Status, selected wallet and session epoch, read together.
	pub fn connection_snapshot(&self) -> ConnectionSnapshot {
		self.lock().snapshot()
	}

	/// Watch the latest status/wallet pair.
	pub fn watch_connection(&self) -> watch::Receiver<ConnectionSnapshot> {
		self.snapshot.subscribe()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::adapter::MemoryWallet;
	use crate::storage::MemoryStorage;

	const KEY: &str = "test:session";

	fn wallet(name: &str) -> SharedWallet {
		Arc::new(MemoryWallet::new(name, SupportChain::Bitcoin).with_accounts(["bc1a", "bc1b"]))
	}

	fn store_with(storage: Arc<MemoryStorage>, wallets: Vec<SharedWallet>) -> ConnectionStore {
		ConnectionStore::initialize(StoreInit {
			chain: SupportChain::Bitcoin,
			wallets,
			default_wallet: None,
			auto_connect_enabled: true,
			storage,
			storage_key: KEY.to_string(),
		})
		.unwrap()
	}

	fn record(storage: &MemoryStorage) -> Option<SessionRecord> {
		SessionRecord::load(storage, KEY).unwrap()
	}

	#[test]
	fn test_empty_wallets_without_default_is_invalid() {
		let result = ConnectionStore::initialize(StoreInit {
			chain: SupportChain::Bitcoin,
			wallets: Vec::new(),
			default_wallet: None,
			auto_connect_enabled: false,
			storage: Arc::new(MemoryStorage::new()),
			storage_key: KEY.to_string(),
		});
		assert!(matches!(result, Err(WalletKitError::InvalidConfiguration(_))));
	}

	#[test]
	fn test_default_wallet_without_discovered_wallets() {
		let store = ConnectionStore::initialize(StoreInit {
			chain: SupportChain::Bitcoin,
			wallets: Vec::new(),
			default_wallet: Some(wallet("unisat")),
			auto_connect_enabled: false,
			storage: Arc::new(MemoryStorage::new()),
			storage_key: KEY.to_string(),
		})
		.unwrap();
		assert_eq!(store.current_wallet().name(), "unisat");
		assert!(store.wallets().is_empty());
	}

	#[test]
	fn test_default_wallet_joins_non_empty_set() {
		let store = ConnectionStore::initialize(StoreInit {
			chain: SupportChain::Bitcoin,
			wallets: vec![wallet("okx")],
			default_wallet: Some(wallet("unisat")),
			auto_connect_enabled: false,
			storage: Arc::new(MemoryStorage::new()),
			storage_key: KEY.to_string(),
		})
		.unwrap();
		assert_eq!(store.current_wallet().name(), "unisat");
		assert_eq!(store.wallets().len(), 2);
	}

	#[test]
	fn test_persisted_session_overrides_default() {
		let storage = Arc::new(MemoryStorage::new());
		let okx = wallet("okx");
		SessionRecord::new(okx.as_ref(), SupportChain::Bitcoin, &WalletAccount::new("bc1b"))
			.save(storage.as_ref(), KEY)
			.unwrap();

		let store = ConnectionStore::initialize(StoreInit {
			chain: SupportChain::Bitcoin,
			wallets: vec![wallet("unisat"), okx],
			default_wallet: Some(wallet("unisat")),
			auto_connect_enabled: true,
			storage,
			storage_key: KEY.to_string(),
		})
		.unwrap();

		assert_eq!(store.current_wallet().name(), "okx");
		assert_eq!(store.connection_status(), ConnectionStatus::Disconnected);
		assert_eq!(
			store.persisted_session().unwrap().account_address.as_deref(),
			Some("bc1b")
		);
	}

	#[test]
	fn test_unreadable_session_is_ignored() {
		let storage = Arc::new(MemoryStorage::new());
		storage.set_item(KEY, "garbage").unwrap();
		let store = store_with(storage, vec![wallet("unisat")]);
		assert!(store.persisted_session().is_none());
	}

	#[test]
	fn test_duplicate_wallets_are_collapsed() {
		let store = store_with(
			Arc::new(MemoryStorage::new()),
			vec![wallet("unisat"), wallet("unisat"), wallet("okx")],
		);
		let names: Vec<String> = store.wallets().iter().map(|w| w.name().to_string()).collect();
		assert_eq!(names, vec!["unisat", "okx"]);
	}

	#[test]
	fn test_set_connection_status_touches_only_status() {
		let store = store_with(Arc::new(MemoryStorage::new()), vec![wallet("unisat")]);
		store.set_connection_status(ConnectionStatus::Connecting);
		assert_eq!(store.connection_status(), ConnectionStatus::Connecting);
		assert!(store.current_account().is_none());
	}

	#[test]
	fn test_account_switch_connects_and_persists() {
		let storage = Arc::new(MemoryStorage::new());
		let store = store_with(storage.clone(), vec![wallet("unisat")]);

		store.set_account_switched(WalletAccount::new("bc1a"));

		assert_eq!(store.connection_status(), ConnectionStatus::Connected);
		assert_eq!(store.current_account().unwrap().address, "bc1a");
		let saved = record(&storage).unwrap();
		assert_eq!(saved.wallet_name, "unisat");
		assert_eq!(saved.account_address.as_deref(), Some("bc1a"));
	}

	#[test]
	fn test_same_account_switch_is_idempotent() {
		let storage = Arc::new(MemoryStorage::new());
		let store = store_with(storage.clone(), vec![wallet("unisat")]);
		let original = WalletAccount::new("bc1a").with_metadata("label", "first");
		store.set_account_switched(original.clone());
		let first_write = record(&storage).unwrap();

		let mut events = store.subscribe();
		store.set_connection_status(ConnectionStatus::Connecting);
		store.set_account_switched(WalletAccount::new("bc1a"));

		assert_eq!(store.current_account(), Some(original));
		assert_eq!(record(&storage).unwrap().connected_at, first_write.connected_at);
		assert!(
			!events
				.drain()
				.iter()
				.any(|e| matches!(e, StoreEvent::AccountChanged { .. }))
		);
		assert_eq!(store.connection_status(), ConnectionStatus::Connected);
	}

	#[test]
	fn test_disconnect_clears_account_and_record() {
		let storage = Arc::new(MemoryStorage::new());
		let store = store_with(storage.clone(), vec![wallet("unisat")]);
		store.set_account_switched(WalletAccount::new("bc1a"));

		store.set_wallet_disconnected();

		assert_eq!(store.connection_status(), ConnectionStatus::Disconnected);
		assert!(store.current_account().is_none());
		assert!(store.accounts().is_empty());
		assert!(record(&storage).is_none());
	}

	#[test]
	fn test_disconnect_events_follow_record_removal() {
		let storage = Arc::new(MemoryStorage::new());
		let store = store_with(storage.clone(), vec![wallet("unisat")]);
		store.set_account_switched(WalletAccount::new("bc1a"));
		let mut events = store.subscribe();

		store.set_wallet_disconnected();

		// by the time any event is observable the record is gone
		let event = events.try_recv().unwrap();
		assert_eq!(event, StoreEvent::AccountChanged { account: None });
		assert!(record(&storage).is_none());
		assert_eq!(
			events.try_recv(),
			Some(StoreEvent::StatusChanged {
				previous: ConnectionStatus::Connected,
				current: ConnectionStatus::Disconnected,
			})
		);
	}

	#[test]
	fn test_set_wallet_connected_prefers_selected_address() {
		let storage = Arc::new(MemoryStorage::new());
		let okx = wallet("okx");
		let store = store_with(storage.clone(), vec![wallet("unisat"), okx.clone()]);

		let account = store
			.set_wallet_connected(
				&okx,
				vec![WalletAccount::new("bc1a"), WalletAccount::new("bc1b")],
				Some("bc1b"),
			)
			.unwrap();

		assert_eq!(account.address, "bc1b");
		assert_eq!(store.current_wallet().name(), "okx");
		assert_eq!(store.accounts().len(), 2);
		assert_eq!(record(&storage).unwrap().wallet_name, "okx");
	}

	#[test]
	fn test_set_wallet_connected_rejects_unknown_wallet_and_empty_accounts() {
		let store = store_with(Arc::new(MemoryStorage::new()), vec![wallet("unisat")]);
		let stranger = wallet("stranger");
		assert!(matches!(
			store.set_wallet_connected(&stranger, vec![WalletAccount::new("bc1a")], None),
			Err(WalletKitError::WalletNotFound(_))
		));

		let unisat = store.current_wallet();
		assert!(matches!(
			store.set_wallet_connected(&unisat, Vec::new(), None),
			Err(WalletKitError::Adapter(_))
		));
		assert_eq!(store.connection_status(), ConnectionStatus::Disconnected);
	}

	#[test]
	fn test_switching_wallet_disconnects_first() {
		let storage = Arc::new(MemoryStorage::new());
		let store = store_with(storage.clone(), vec![wallet("unisat"), wallet("okx")]);
		store.set_account_switched(WalletAccount::new("bc1a"));

		store.set_current_wallet("okx").unwrap();

		assert_eq!(store.current_wallet().name(), "okx");
		assert_eq!(store.connection_status(), ConnectionStatus::Disconnected);
		assert!(record(&storage).is_none());
		assert!(matches!(
			store.set_current_wallet("missing"),
			Err(WalletKitError::WalletNotFound(_))
		));
	}

	#[test]
	fn test_watch_tracks_status_and_wallet() {
		let store = store_with(Arc::new(MemoryStorage::new()), vec![wallet("unisat"), wallet("okx")]);
		let watcher = store.watch_connection();
		assert_eq!(watcher.borrow().status, ConnectionStatus::Disconnected);

		store.set_account_switched(WalletAccount::new("bc1a"));
		assert_eq!(watcher.borrow().status, ConnectionStatus::Connected);
		assert_eq!(watcher.borrow().wallet, "unisat");
	}

	#[test]
	fn test_epoch_advances_only_when_session_ends() {
		let store = store_with(Arc::new(MemoryStorage::new()), vec![wallet("unisat")]);
		store.set_account_switched(WalletAccount::new("bc1a"));
		let connected = store.connection_snapshot();

		store.set_connection_status(ConnectionStatus::Connecting);
		store.set_account_switched(WalletAccount::new("bc1b"));
		assert_eq!(store.connection_snapshot(), ConnectionSnapshot {
			status: ConnectionStatus::Connected,
			wallet: "unisat".to_string(),
			epoch: connected.epoch,
		});

		store.set_wallet_disconnected();
		store.set_account_switched(WalletAccount::new("bc1a"));
		let reconnected = store.connection_snapshot();
		assert_eq!(reconnected.status, connected.status);
		assert_eq!(reconnected.wallet, connected.wallet);
		assert_eq!(reconnected.epoch, connected.epoch + 1);
	}

	#[test]
	fn test_session_from_other_chain_does_not_select_wallet() {
		let storage = Arc::new(MemoryStorage::new());
		let unisat = wallet("unisat");
		SessionRecord::new(unisat.as_ref(), SupportChain::Bitcoin, &WalletAccount::new("bc1a"))
			.save(storage.as_ref(), KEY)
			.unwrap();
		let metamask: SharedWallet =
			Arc::new(MemoryWallet::new("metamask", SupportChain::Ethereum).with_accounts(["0xabc"]));

		let store = ConnectionStore::initialize(StoreInit {
			chain: SupportChain::Ethereum,
			wallets: vec![unisat, metamask.clone()],
			default_wallet: Some(metamask),
			auto_connect_enabled: true,
			storage,
			storage_key: KEY.to_string(),
		})
		.unwrap();

		assert_eq!(store.current_wallet().name(), "metamask");
		assert!(store.persisted_session().is_some());
	}

	#[test]
	fn test_set_wallets_keeps_current_wallet() {
		let store = store_with(Arc::new(MemoryStorage::new()), vec![wallet("unisat")]);
		store.set_account_switched(WalletAccount::new("bc1a"));
		let mut events = store.subscribe();

		store
			.set_wallets(vec![wallet("okx"), wallet("unisat"), wallet("okx")])
			.unwrap();

		let names: Vec<String> = store.wallets().iter().map(|w| w.name().to_string()).collect();
		assert_eq!(names, vec!["okx", "unisat"]);
		assert_eq!(store.current_wallet().name(), "unisat");
		assert!(store.is_connected());
		assert_eq!(
			events.drain(),
			vec![StoreEvent::WalletsUpdated {
				wallets: vec!["okx".to_string(), "unisat".to_string()],
			}]
		);
	}

	#[test]
	fn test_set_wallets_replaces_dropped_current_wallet() {
		let storage = Arc::new(MemoryStorage::new());
		let store = store_with(storage.clone(), vec![wallet("unisat")]);
		store.set_account_switched(WalletAccount::new("bc1a"));
		let mut events = store.subscribe();

		store.set_wallets(vec![wallet("okx")]).unwrap();

		assert_eq!(store.current_wallet().name(), "okx");
		assert_eq!(store.connection_status(), ConnectionStatus::Disconnected);
		assert!(record(&storage).is_none());
		let events = events.drain();
		assert!(events.contains(&StoreEvent::WalletsUpdated {
			wallets: vec!["okx".to_string()],
		}));
		assert_eq!(
			events.last(),
			Some(&StoreEvent::WalletChanged {
				wallet: "okx".to_string(),
			})
		);

		assert!(matches!(
			store.set_wallets(Vec::new()),
			Err(WalletKitError::InvalidConfiguration(_))
		));
		assert_eq!(store.wallets().len(), 1);
	}
}
