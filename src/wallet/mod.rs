//! Wallet Connection Module
//!
//! This module holds the connection state machine and the services around it:
//!
//! - `discovery`: Probes the registered adapters and resolves the installed wallets once per chain.
//! - `store`: The connection store, single writer of status, selected wallet and selected account.
//! - `events`: Change notifications the store publishes to its observers.
//! - `resync`: Keeps one account listener on the connected wallet and feeds its changes back into the store.
//! - `auto_connect`: Silent reconnect to the most recently used wallet on startup.
//! - `connector`: User-initiated connect and disconnect.
//! - `provider`: The composition root that wires all of the above into a session.

/// Silent reconnect on startup
pub mod auto_connect;
/// User-initiated connect/disconnect
pub mod connector;
/// Installed wallet discovery
pub mod discovery;
/// Store change notifications
pub mod events;
/// Composition root
pub mod provider;
/// Live account resynchronisation
pub mod resync;
/// Connection state machine
pub mod store;
pub mod types;

pub use auto_connect::{AutoConnectOutcome, AutoConnectSequencer};
pub use connector::WalletConnector;
pub use discovery::WalletDiscovery;
pub use events::{ConnectionSnapshot, StoreEvent, StoreEventStream};
pub use provider::{MountOutcome, WalletProvider, WalletSession, select_default_wallet};
pub use resync::{ResyncHandle, ResyncManager};
pub use store::{ConnectionStore, StoreInit};
pub use types::*;
