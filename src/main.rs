//! NEO Lock Proxy operator CLI
//!
//! Thin front end over [`LockProxy`]: binds proxies and assets, locks through
//! the wrapper, extracts fees, and prints contract state.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use num_bigint::BigUint;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use neo_lockproxy::{
    address, Config, ConfirmationPoller, ContractInvoker, JsonRpcClient, LockProxy, NeoRpc,
    ScriptHash, TxHash, TxSigner, WifSigner,
};

#[derive(Parser)]
#[command(name = "neo-lockproxy")]
#[command(about = "Operate the NEO cross-chain lock proxy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file (neoUrl, neoWif, proxyToBind, assetToBind, ...)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every proxyToBind / assetToBind row that starts on this chain
    BindConfig,

    /// Bind the proxy for a target chain
    BindProxy {
        #[arg(long)]
        lock_proxy: Option<String>,
        #[arg(long)]
        to_chain_id: u64,
        /// Target proxy as hex, passed through unchanged
        #[arg(long)]
        to_proxy: String,
    },

    /// Bind an asset for a target chain
    BindAsset {
        #[arg(long)]
        lock_proxy: Option<String>,
        #[arg(long)]
        from_asset: String,
        #[arg(long)]
        to_chain_id: u64,
        /// Target asset as hex, passed through unchanged
        #[arg(long)]
        to_asset: String,
    },

    /// Show the lock proxy operator, proxy hash and asset bindings
    Query {
        #[arg(long)]
        lock_proxy: Option<String>,
        #[arg(long)]
        to_chain_id: u64,
        /// Assets to report hashes and balances for
        #[arg(long = "asset")]
        assets: Vec<String>,
    },

    /// Show wrapper state: lock proxy, owner, fee collector
    Wrapper {
        #[arg(long)]
        wrapper: Option<String>,
    },

    /// Lock `amount` of an asset through the wrapper
    Lock {
        #[arg(long)]
        wrapper: Option<String>,
        #[arg(long)]
        asset: String,
        #[arg(long)]
        to_chain_id: u64,
        /// Recipient on the target chain as hex, passed through unchanged
        #[arg(long)]
        to_address: String,
        #[arg(long)]
        amount: BigUint,
        #[arg(long, default_value = "0")]
        fee: BigUint,
        #[arg(long, default_value = "0")]
        id: BigUint,
    },

    /// Extract accumulated fees of a token from the wrapper
    ExtractFee {
        #[arg(long)]
        wrapper: Option<String>,
        #[arg(long)]
        token: String,
    },

    /// Read a raw storage slot
    Storage {
        #[arg(long)]
        contract: String,
        /// Storage key as text; hex-encoded before the request
        #[arg(long)]
        key: String,
        /// Treat --key as hex already
        #[arg(long)]
        raw: bool,
    },

    /// Wait for a broadcast transaction; Ctrl+C stops waiting
    Wait {
        tx_hash: String,
    },

    /// Convert an address to script hash, base58 and display hex
    Address {
        input: String,
        /// Use the substring heuristic of older tooling
        #[arg(long)]
        legacy: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Address { input, legacy } = &cli.command {
        let hash = if *legacy {
            address::parse_heuristic(input)?
        } else {
            address::parse(input)?
        };
        println!("script hash (LE): {}", hash.to_hex());
        println!("display (BE):     {}", hash);
        println!("address:          {}", hash.to_address());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(config = ?config, "Configuration loaded");

    let rpc: Arc<dyn NeoRpc> = Arc::new(
        JsonRpcClient::new(&config.neo_url).wrap_err("Failed to create NEO RPC client")?,
    );
    let invoker = match config.signer_wif()? {
        Some(wif) => {
            let signer: Arc<dyn TxSigner> = Arc::new(WifSigner::from_wif(wif)?);
            ContractInvoker::with_signer(Arc::clone(&rpc), signer)
        }
        None => ContractInvoker::new(Arc::clone(&rpc)),
    };
    let poller = ConfirmationPoller::new(Arc::clone(&rpc), config.poll_policy());
    let proxy = LockProxy::new(invoker, poller);

    match cli.command {
        Commands::BindConfig => {
            let receipts = proxy.bind_from_config(&config).await?;
            tracing::info!(count = receipts.len(), "Bind rows applied");
            for receipt in receipts {
                println!("{}", receipt);
            }
        }

        Commands::BindProxy {
            lock_proxy,
            to_chain_id,
            to_proxy,
        } => {
            let lock_proxy = resolve(lock_proxy, &config.neo_lock_proxy, "lock proxy")?;
            let to_proxy = address::decode_hex_bytes(&to_proxy)?;
            let receipt = proxy
                .bind_proxy_hash(&lock_proxy, to_chain_id, &to_proxy)
                .await?;
            println!("{}", receipt);
        }

        Commands::BindAsset {
            lock_proxy,
            from_asset,
            to_chain_id,
            to_asset,
        } => {
            let lock_proxy = resolve(lock_proxy, &config.neo_lock_proxy, "lock proxy")?;
            let from_asset = address::parse(&from_asset)?;
            let to_asset = address::decode_hex_bytes(&to_asset)?;
            let receipt = proxy
                .bind_asset_hash(&lock_proxy, &from_asset, to_chain_id, &to_asset)
                .await?;
            println!("{}", receipt);
        }

        Commands::Query {
            lock_proxy,
            to_chain_id,
            assets,
        } => {
            let lock_proxy = resolve(lock_proxy, &config.neo_lock_proxy, "lock proxy")?;
            println!("operator:   {}", proxy.get_proxy_operator(&lock_proxy).await?);
            println!(
                "proxy hash: {} (toChainId {})",
                proxy.get_proxy_hash(&lock_proxy, to_chain_id).await?,
                to_chain_id
            );

            let assets = assets
                .iter()
                .map(|a| address::parse(a))
                .collect::<Result<Vec<_>, _>>()?;
            let hashes = proxy
                .get_asset_hashes(&lock_proxy, to_chain_id, &assets)
                .await?;
            let balances = proxy.get_asset_balances(&lock_proxy, &assets).await?;
            for ((asset, hash), balance) in assets.iter().zip(hashes).zip(balances) {
                println!("asset {}: to {} balance {}", asset, hash, balance);
            }
        }

        Commands::Wrapper { wrapper } => {
            let wrapper = resolve(wrapper, &config.neo_wrapper, "wrapper")?;
            println!("lockProxy:    {}", proxy.get_lock_proxy_state(&wrapper).await?);
            println!("owner:        {}", proxy.get_owner(&wrapper).await?);
            println!("feeCollector: {}", proxy.get_fee_collector(&wrapper).await?);
        }

        Commands::Lock {
            wrapper,
            asset,
            to_chain_id,
            to_address,
            amount,
            fee,
            id,
        } => {
            let wrapper = resolve(wrapper, &config.neo_wrapper, "wrapper")?;
            let asset = address::parse(&asset)?;
            let to_address = address::decode_hex_bytes(&to_address)?;
            let receipt = proxy
                .lock(&wrapper, &asset, to_chain_id, &to_address, &amount, &fee, &id)
                .await?;
            println!("{}", receipt);
        }

        Commands::ExtractFee { wrapper, token } => {
            let wrapper = resolve(wrapper, &config.neo_wrapper, "wrapper")?;
            let token = address::parse(&token)?;
            let receipt = proxy.extract_fee(&wrapper, &token).await?;
            println!("{}", receipt);
        }

        Commands::Storage { contract, key, raw } => {
            let contract = address::parse(&contract)?;
            let key_hex = if raw { key } else { hex::encode(key.as_bytes()) };
            let value = proxy.get_storage(&contract, &key_hex).await?;
            println!("{}", value);
        }

        Commands::Wait { tx_hash } => {
            let tx_hash = TxHash::from_hex(&tx_hash)?;
            let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Received Ctrl+C, stopping wait");
                    let _ = shutdown_tx.send(()).await;
                }
            });
            let outcome = proxy
                .poller()
                .wait_with_shutdown(&tx_hash, &mut shutdown_rx)
                .await;
            println!("{} {:?}", tx_hash, outcome);
        }

        Commands::Address { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}

/// Contract from the flag, else from config
fn resolve(flag: Option<String>, configured: &Option<String>, what: &str) -> Result<ScriptHash> {
    let input = flag
        .or_else(|| configured.clone())
        .ok_or_else(|| eyre!("No {} given; pass it as a flag or set it in config", what))?;
    Ok(address::parse(&input)?)
}
