//! Wallet connection lifecycle for applications talking to user-controlled wallets.
//!
//! The crate tracks which wallet is selected and whether it is connected, remembers the last
//! session so it can be silently restored, and stays in sync with account switches and locks
//! performed inside the wallet itself.
//!
//! ```no_run
//! use std::sync::Arc;
//! use wallet_connect_kit::adapter::{MemoryWallet, SupportChain};
//! use wallet_connect_kit::config::WalletProviderConfig;
//! use wallet_connect_kit::wallet::{MountOutcome, WalletProvider};
//!
//! # async fn demo() -> Result<(), wallet_connect_kit::wallet::WalletKitError> {
//! let unisat = Arc::new(MemoryWallet::new("unisat", SupportChain::Bitcoin).with_accounts(["bc1q..."]));
//! let provider = WalletProvider::new(WalletProviderConfig::default(), vec![unisat]);
//!
//! if let MountOutcome::Ready(session) = provider.mount().await? {
//!     session.connector().connect_wallet("unisat").await?;
//! }
//! # Ok(()) }
//! ```

pub mod adapter;
pub mod config;
pub mod storage;
pub mod utils;
pub mod wallet;

pub use adapter::{SharedWallet, SupportChain, WalletAccount, WalletAdapter};
pub use config::WalletProviderConfig;
pub use wallet::{ConnectionStatus, ConnectionStore, MountOutcome, WalletKitError, WalletProvider};
