//! Live Node Integration Test
//!
//! Read-only queries against a running NEO node with a deployed lock proxy.
//!
//! ## Setup
//!
//! - `NEO_RPC_URL` - node JSON-RPC (e.g., http://seed1.ngd.network:20332)
//! - `NEO_LOCK_PROXY` - lock proxy contract (0x-prefixed display hex)
//!
//! ## Running
//!
//! ```bash
//! NEO_RPC_URL=http://localhost:20332 \
//! NEO_LOCK_PROXY=0xedd2862dceb90b945210372d229f453f2b705f4f \
//! cargo test --test live_node -- --ignored --nocapture
//! ```

use std::sync::Arc;

use neo_lockproxy::{
    address, ConfirmationPoller, ContractInvoker, JsonRpcClient, LockProxy, PollPolicy,
    ScriptHash,
};

fn setup() -> Result<(LockProxy, ScriptHash), String> {
    let rpc_url = std::env::var("NEO_RPC_URL")
        .map_err(|_| "NEO_RPC_URL not set. Set: NEO_RPC_URL, NEO_LOCK_PROXY".to_string())?;
    let lock_proxy = std::env::var("NEO_LOCK_PROXY").map_err(|_| "NEO_LOCK_PROXY not set")?;
    let lock_proxy = address::parse(&lock_proxy).map_err(|e| e.to_string())?;

    let rpc = Arc::new(JsonRpcClient::new(&rpc_url).map_err(|e| e.to_string())?);
    let proxy = LockProxy::new(
        ContractInvoker::new(rpc.clone()),
        ConfirmationPoller::new(rpc, PollPolicy::default()),
    );
    Ok((proxy, lock_proxy))
}

#[tokio::test]
#[ignore = "requires a running NEO node"]
async fn test_live_operator_and_proxy_hash() {
    let (proxy, lock_proxy) = match setup() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Skipping: {}", e);
            return;
        }
    };

    let operator = proxy.get_proxy_operator(&lock_proxy).await.unwrap();
    println!("operator: {}", operator);
    assert!(operator.starts_with('A'));

    match proxy.get_proxy_hash(&lock_proxy, 79).await {
        Ok(hash) => println!("proxy hash for 79: {}", hash),
        Err(e) => println!("no proxy bound for 79: {}", e),
    }
}

#[tokio::test]
#[ignore = "requires a running NEO node"]
async fn test_live_balances_match_asset_count() {
    let (proxy, lock_proxy) = match setup() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Skipping: {}", e);
            return;
        }
    };

    let assets = vec![address::parse("0x17da3881ab2d050fea414c80b3fa8324d756f60e").unwrap()];
    let balances = proxy
        .get_asset_balances(&lock_proxy, &assets)
        .await
        .unwrap();
    assert_eq!(balances.len(), assets.len());
}
