use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use wallet_connect_kit::adapter::{MemoryWallet, SupportChain, WalletAccount};
use wallet_connect_kit::config::WalletProviderConfig;
use wallet_connect_kit::storage::FileStorage;
use wallet_connect_kit::utils::format_address;
use wallet_connect_kit::wallet::{MountOutcome, StoreEvent, WalletProvider};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting wallet connection demo");

	let config = match std::env::var("WALLET_KIT_CONFIG") {
		Ok(path) => match std::fs::read_to_string(&path)
			.map_err(|e| e.to_string())
			.and_then(|json| WalletProviderConfig::from_json_str(&json).map_err(|e| e.to_string()))
		{
			Ok(config) => config,
			Err(e) => {
				error!("Failed to load config from {}: {}", path, e);
				return;
			}
		},
		Err(_) => WalletProviderConfig {
			auto_connect: true,
			..WalletProviderConfig::default()
		},
	};

	let unisat = Arc::new(
		MemoryWallet::new("unisat", SupportChain::Bitcoin)
			.with_accounts(["bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"]),
	);
	let okx = Arc::new(MemoryWallet::new("okx", SupportChain::Bitcoin).not_installed());

	let storage_path = std::env::temp_dir().join("wallet-connect-kit-demo.json");
	let provider = WalletProvider::new(config, vec![unisat.clone(), okx])
		.with_storage(Arc::new(FileStorage::new(&storage_path)));

	info!("Persisting sessions to {:?}", storage_path);

	let mut session = match provider.mount().await {
		Ok(MountOutcome::Ready(session)) => session,
		Ok(MountOutcome::NoWallets) => {
			warn!("No wallets installed, nothing to do");
			return;
		}
		Err(e) => {
			error!("Failed to mount wallet provider: {}", e);
			return;
		}
	};

	info!("Auto-connect: {:?}", session.auto_connect_outcome());

	let mut events = session.store().subscribe();

	if !session.store().is_connected() {
		match session.connector().connect_wallet("unisat").await {
			Ok(account) => info!("Connected {}", format_address(&account.address, 6)),
			Err(e) => {
				error!("Failed to connect: {}", e);
				return;
			}
		}
	}

	// the user switches accounts inside the extension
	unisat.set_accounts(vec![
		WalletAccount::new("bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh")
			.with_public_key("03a34b99f22c790c4e36b2b3c2c35a36db06226e41c692fc82b8b56ac1c540c5bd"),
		WalletAccount::new("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"),
	]);
	tokio::time::sleep(Duration::from_millis(50)).await;

	// ...and then locks it
	unisat.set_accounts(Vec::new());
	tokio::time::sleep(Duration::from_millis(50)).await;

	for event in events.drain() {
		match event {
			StoreEvent::AccountChanged {
				account: Some(account),
			} => info!("Account -> {}", format_address(&account.address, 6)),
			StoreEvent::AccountChanged { account: None } => info!("Account cleared"),
			StoreEvent::StatusChanged { previous, current } => {
				info!("Status {} -> {}", previous, current)
			}
			other => info!("{:?}", other),
		}
	}

	info!(
		"Final status: {}, listener active: {}",
		session.store().connection_status(),
		session.resync().is_subscribed()
	);

	session.shutdown();
}
