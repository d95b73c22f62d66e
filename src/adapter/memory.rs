use super::{
	AccountsChangedHandler, AdapterError, ListenerId, SupportChain, WalletAccount, WalletAdapter,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Wallet adapter backed by process memory.
///
/// Behaves like a browser-extension wallet whose state is driven from code: the account set
/// can be changed with [`set_accounts`](Self::set_accounts), which notifies every registered
/// listener the same way an extension emits `accountsChanged`.
pub struct MemoryWallet {
	name: String,
	chain: SupportChain,
	installed: AtomicBool,
	silent: bool,
	accounts: Mutex<Vec<WalletAccount>>,
	authorised: AtomicBool,
	connect_error: Mutex<Option<AdapterError>>,
	listeners: Mutex<HashMap<ListenerId, AccountsChangedHandler>>,
	next_listener: AtomicU64,
	connect_calls: AtomicUsize,
	disconnect_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryWallet {
	/// Create an installed wallet with no accounts.
	pub fn new(name: impl Into<String>, chain: SupportChain) -> Self {
		Self {
			name: name.into(),
			chain,
			installed: AtomicBool::new(true),
			silent: false,
			accounts: Mutex::new(Vec::new()),
			authorised: AtomicBool::new(false),
			connect_error: Mutex::new(None),
			listeners: Mutex::new(HashMap::new()),
			next_listener: AtomicU64::new(1),
			connect_calls: AtomicUsize::new(0),
			disconnect_calls: AtomicUsize::new(0),
		}
	}

	pub fn with_accounts<I, S>(self, addresses: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		*lock(&self.accounts) = addresses.into_iter().map(WalletAccount::new).collect();
		self
	}

	pub fn not_installed(self) -> Self {
		self.installed.store(false, Ordering::SeqCst);
		self
	}

	/// Resolve `get_accounts` silently; previously authorised accounts are returned without
	/// a prompt.
	pub fn with_silent_reconnect(mut self) -> Self {
		self.silent = true;
		self.authorised.store(true, Ordering::SeqCst);
		self
	}

	pub fn set_installed(&self, installed: bool) {
		self.installed.store(installed, Ordering::SeqCst);
	}

	/// Make subsequent `connect` calls fail with `error`, or succeed again with `None`.
	pub fn set_connect_error(&self, error: Option<AdapterError>) {
		*lock(&self.connect_error) = error;
	}

	/// Replace the account set and notify listeners, as the extension does when the user
	/// switches or locks accounts.
	pub fn set_accounts(&self, accounts: Vec<WalletAccount>) {
		*lock(&self.accounts) = accounts.clone();
		self.emit_accounts_changed(accounts);
	}

	/// Notify listeners without changing the stored account set.
	pub fn emit_accounts_changed(&self, accounts: Vec<WalletAccount>) {
		let handlers: Vec<AccountsChangedHandler> = lock(&self.listeners).values().cloned().collect();
		debug!(
			wallet = %self.name,
			listeners = handlers.len(),
			accounts = accounts.len(),
			"Emitting accountsChanged"
		);
		for handler in handlers {
			handler(accounts.clone());
		}
	}

	pub fn listener_count(&self) -> usize {
		lock(&self.listeners).len()
	}

	pub fn connect_calls(&self) -> usize {
		self.connect_calls.load(Ordering::SeqCst)
	}

	pub fn disconnect_calls(&self) -> usize {
		self.disconnect_calls.load(Ordering::SeqCst)
	}
}

#[async_trait::async_trait]
impl WalletAdapter for MemoryWallet {
	fn name(&self) -> &str {
		&self.name
	}

	fn chain(&self) -> SupportChain {
		self.chain
	}

	async fn check_installed(&self) -> bool {
		self.installed.load(Ordering::SeqCst)
	}

	fn supports_silent_reconnect(&self) -> bool {
		self.silent
	}

	async fn connect(&self) -> Result<Vec<WalletAccount>, AdapterError> {
		self.connect_calls.fetch_add(1, Ordering::SeqCst);
		if !self.installed.load(Ordering::SeqCst) {
			return Err(AdapterError::NotInstalled(self.name.clone()));
		}
		if let Some(error) = lock(&self.connect_error).clone() {
			return Err(error);
		}
		self.authorised.store(true, Ordering::SeqCst);
		Ok(lock(&self.accounts).clone())
	}

	async fn disconnect(&self) -> Result<(), AdapterError> {
		self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
		self.authorised.store(false, Ordering::SeqCst);
		Ok(())
	}

	async fn get_accounts(&self) -> Result<Vec<WalletAccount>, AdapterError> {
		if !self.authorised.load(Ordering::SeqCst) {
			return Ok(Vec::new());
		}
		Ok(lock(&self.accounts).clone())
	}

	fn on_accounts_changed(&self, handler: AccountsChangedHandler) -> ListenerId {
		let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
		lock(&self.listeners).insert(id, handler);
		id
	}

	fn remove_accounts_changed(&self, listener: ListenerId) {
		lock(&self.listeners).remove(&listener);
	}
}
