//! Lock proxy operation surface
//!
//! One method per contract method, each with a fixed argument shape. Queries
//! go through the invoker's read path and decode the returned stack; state
//! changes go through the write path and then wait for inclusion.
//!
//! ## Write operations
//!
//! A write returns a [`TxReceipt`] as soon as the broadcast is accepted and
//! the bounded confirmation wait has ended. A `Stalled` confirmation is still
//! a success: the transaction hash in the receipt is final either way.
//!
//! ## Contract arguments
//!
//! Contract hashes are passed as [`ScriptHash`] (little-endian script order).
//! Foreign-chain identifiers such as `toProxyHash` and `toAsset` are opaque
//! byte strings and are passed through unchanged.

use num_bigint::{BigInt, BigUint};
use std::fmt;
use tracing::{info, warn};

use crate::address::{self, ScriptHash};
use crate::config::Config;
use crate::confirmation::{ConfirmationOutcome, ConfirmationPoller};
use crate::error::{LockProxyError, Result};
use crate::invoker::ContractInvoker;
use crate::script::{ContractCall, TypedValue};
use crate::stack::{self, StackValue};
use crate::transaction::TxHash;

/// Outcome of a state-changing operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub confirmation: ConfirmationOutcome,
}

impl TxReceipt {
    pub fn is_confirmed(&self) -> bool {
        self.confirmation.is_confirmed()
    }
}

impl fmt::Display for TxReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.confirmation {
            ConfirmationOutcome::Confirmed { height, .. } => {
                write!(f, "{} (height {})", self.tx_hash, height)
            }
            ConfirmationOutcome::Stalled { attempts } => {
                write!(f, "{} (unconfirmed after {} polls)", self.tx_hash, attempts)
            }
            ConfirmationOutcome::Cancelled { .. } => {
                write!(f, "{} (wait cancelled)", self.tx_hash)
            }
        }
    }
}

pub struct LockProxy {
    invoker: ContractInvoker,
    poller: ConfirmationPoller,
}

impl LockProxy {
    pub fn new(invoker: ContractInvoker, poller: ConfirmationPoller) -> Self {
        Self { invoker, poller }
    }

    pub fn invoker(&self) -> &ContractInvoker {
        &self.invoker
    }

    pub fn poller(&self) -> &ConfirmationPoller {
        &self.poller
    }

    // =========================================================================
    // Write operations
    // =========================================================================

    async fn submit(&self, call: ContractCall) -> Result<TxReceipt> {
        let tx_hash = self.invoker.invoke_write(&call).await?;
        let confirmation = self.poller.wait(&tx_hash).await;

        match &confirmation {
            ConfirmationOutcome::Confirmed { height, .. } => {
                info!(method = call.method(), tx_hash = %tx_hash, height = height, "NEO transaction confirmed");
            }
            other => {
                warn!(method = call.method(), tx_hash = %tx_hash, outcome = ?other, "NEO transaction not confirmed");
            }
        }

        Ok(TxReceipt {
            tx_hash,
            confirmation,
        })
    }

    /// `bindProxyHash(toChainId, toProxyHash)`
    pub async fn bind_proxy_hash(
        &self,
        lock_proxy: &ScriptHash,
        to_chain_id: u64,
        to_proxy_hash: &[u8],
    ) -> Result<TxReceipt> {
        let call = ContractCall::new(
            *lock_proxy,
            "bindProxyHash",
            vec![
                TypedValue::int(to_chain_id),
                TypedValue::bytes(to_proxy_hash),
            ],
        );
        self.submit(call).await
    }

    /// `bindAssetHash(fromAsset, toChainId, toAsset)`
    pub async fn bind_asset_hash(
        &self,
        lock_proxy: &ScriptHash,
        from_asset: &ScriptHash,
        to_chain_id: u64,
        to_asset: &[u8],
    ) -> Result<TxReceipt> {
        let call = ContractCall::new(
            *lock_proxy,
            "bindAssetHash",
            vec![
                TypedValue::from(*from_asset),
                TypedValue::int(to_chain_id),
                TypedValue::bytes(to_asset),
            ],
        );
        self.submit(call).await
    }

    /// `lock(fromAsset, fromAddress, toChainId, toAddress, amount, fee, id)` on
    /// the wrapper. `fromAddress` is the signer's own account.
    #[allow(clippy::too_many_arguments)]
    pub async fn lock(
        &self,
        wrapper: &ScriptHash,
        from_asset: &ScriptHash,
        to_chain_id: u64,
        to_address: &[u8],
        amount: &BigUint,
        fee: &BigUint,
        id: &BigUint,
    ) -> Result<TxReceipt> {
        let signer_address = self.invoker.signer_address().ok_or_else(|| {
            LockProxyError::Config("[lock] no signer configured for state-changing call".to_string())
        })?;
        let from_address = address::parse(&signer_address)?;

        let call = ContractCall::new(
            *wrapper,
            "lock",
            vec![
                TypedValue::from(*from_asset),
                TypedValue::from(from_address),
                TypedValue::int(to_chain_id),
                TypedValue::bytes(to_address),
                TypedValue::int(BigInt::from(amount.clone())),
                TypedValue::int(BigInt::from(fee.clone())),
                TypedValue::int(BigInt::from(id.clone())),
            ],
        );
        self.submit(call).await
    }

    /// `extractFee(token)` on the wrapper
    pub async fn extract_fee(&self, wrapper: &ScriptHash, token: &ScriptHash) -> Result<TxReceipt> {
        let call = ContractCall::new(*wrapper, "extractFee", vec![TypedValue::from(*token)]);
        self.submit(call).await
    }

    /// Apply every bind row in `config` that originates on this chain.
    ///
    /// Proxy rows are bound on their own `fromProxy`. Asset rows are bound on
    /// `neoLockProxy` when configured, otherwise on the first local proxy row.
    pub async fn bind_from_config(&self, config: &Config) -> Result<Vec<TxReceipt>> {
        let mut receipts = Vec::new();

        for row in config.local_proxy_bindings() {
            let lock_proxy = address::parse(&row.from_proxy)?;
            let to_proxy = address::decode_hex_bytes(&row.to_proxy)?;
            info!(
                lock_proxy = %lock_proxy,
                to_chain_id = row.to_chain_id,
                to_proxy = %row.to_proxy,
                "Binding proxy hash"
            );
            receipts.push(
                self.bind_proxy_hash(&lock_proxy, row.to_chain_id, &to_proxy)
                    .await?,
            );
        }

        let mut assets = config.local_asset_bindings().peekable();
        if assets.peek().is_none() {
            return Ok(receipts);
        }

        let lock_proxy = match config
            .neo_lock_proxy
            .as_deref()
            .or_else(|| config.local_proxy_bindings().next().map(|b| b.from_proxy.as_str()))
        {
            Some(s) => address::parse(s)?,
            None => {
                return Err(LockProxyError::Config(
                    "assetToBind rows need neoLockProxy or a local proxyToBind row".to_string(),
                ))
            }
        };

        for row in assets {
            let from_asset = address::parse(&row.from_asset)?;
            let to_asset = address::decode_hex_bytes(&row.to_asset)?;
            info!(
                lock_proxy = %lock_proxy,
                from_asset = %from_asset,
                to_chain_id = row.to_chain_id,
                to_asset = %row.to_asset,
                "Binding asset hash"
            );
            receipts.push(
                self.bind_asset_hash(&lock_proxy, &from_asset, row.to_chain_id, &to_asset)
                    .await?,
            );
        }

        Ok(receipts)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    async fn read_single_bytes(&self, call: ContractCall) -> Result<Vec<u8>> {
        let stack = self.invoker.invoke_read(&call).await?;
        stack::first_bytes(&stack).ok_or_else(|| LockProxyError::EmptyResult {
            method: call.method().to_string(),
            contract: call.contract().to_string(),
        })
    }

    /// Operator account as a base58 address
    pub async fn get_proxy_operator(&self, lock_proxy: &ScriptHash) -> Result<String> {
        let bytes = self
            .read_single_bytes(ContractCall::new(*lock_proxy, "getOperator", vec![]))
            .await?;
        let operator = ScriptHash::from_slice(&bytes)
            .map_err(|_| LockProxyError::format(hex::encode(&bytes), "operator is not a 20-byte account"))?;
        Ok(operator.to_address())
    }

    /// Proxy bound for `to_chain_id`, as stored (little-endian hex)
    pub async fn get_proxy_hash(&self, lock_proxy: &ScriptHash, to_chain_id: u64) -> Result<String> {
        let call = ContractCall::new(
            *lock_proxy,
            "getProxyHash",
            vec![TypedValue::int(to_chain_id)],
        );
        Ok(hex::encode(self.read_single_bytes(call).await?))
    }

    /// Bound target asset for each of `from_assets`, aligned with the input.
    /// Unbound or unexpected entries are "".
    pub async fn get_asset_hashes(
        &self,
        lock_proxy: &ScriptHash,
        to_chain_id: u64,
        from_assets: &[ScriptHash],
    ) -> Result<Vec<String>> {
        let calls: Vec<ContractCall> = from_assets
            .iter()
            .map(|asset| {
                ContractCall::new(
                    *lock_proxy,
                    "getAssetHash",
                    vec![TypedValue::from(*asset), TypedValue::int(to_chain_id)],
                )
            })
            .collect();

        let stack = self.invoker.invoke_read_batch(&calls).await?;
        Ok(stack::decode_positional(&stack, calls.len())
            .iter()
            .map(StackValue::to_hex)
            .collect())
    }

    /// Lock proxy's balance of each asset, aligned with the input.
    /// Unexpected entries read as zero.
    pub async fn get_asset_balances(
        &self,
        lock_proxy: &ScriptHash,
        assets: &[ScriptHash],
    ) -> Result<Vec<BigUint>> {
        let calls: Vec<ContractCall> = assets
            .iter()
            .map(|asset| ContractCall::new(*asset, "balanceOf", vec![TypedValue::from(*lock_proxy)]))
            .collect();

        let stack = self.invoker.invoke_read_batch(&calls).await?;
        Ok(stack::decode_positional(&stack, calls.len())
            .iter()
            .map(StackValue::to_biguint)
            .collect())
    }

    /// Raw storage value of `contract` under `key_hex`
    pub async fn get_storage(&self, contract: &ScriptHash, key_hex: &str) -> Result<String> {
        self.invoker.read_storage(contract, key_hex).await
    }

    /// Lock proxy the wrapper forwards to (little-endian hex)
    pub async fn get_lock_proxy_state(&self, wrapper: &ScriptHash) -> Result<String> {
        let call = ContractCall::new(*wrapper, "lockProxy", vec![]);
        Ok(hex::encode(self.read_single_bytes(call).await?))
    }

    /// Wrapper owner (little-endian hex)
    pub async fn get_owner(&self, wrapper: &ScriptHash) -> Result<String> {
        let call = ContractCall::new(*wrapper, "owner", vec![]);
        Ok(hex::encode(self.read_single_bytes(call).await?))
    }

    /// Wrapper fee collector (little-endian hex)
    pub async fn get_fee_collector(&self, wrapper: &ScriptHash) -> Result<String> {
        let call = ContractCall::new(*wrapper, "feeCollector", vec![]);
        Ok(hex::encode(self.read_single_bytes(call).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::confirmation::PollPolicy;
    use crate::rpc::{InvokeResult, NeoRpc, RpcError};
    use crate::stack::StackItem;

    struct StaticStack(Vec<StackItem>, Mutex<Vec<String>>);

    #[async_trait]
    impl NeoRpc for StaticStack {
        async fn invoke_script(&self, script: &str, _: &str) -> std::result::Result<InvokeResult, RpcError> {
            self.1.lock().unwrap().push(script.to_string());
            Ok(InvokeResult {
                script: script.to_string(),
                state: "HALT".to_string(),
                gas_consumed: "0".to_string(),
                stack: self.0.clone(),
            })
        }

        async fn send_raw_transaction(&self, _: &str) -> std::result::Result<(), RpcError> {
            Ok(())
        }

        async fn get_transaction_height(&self, _: &str) -> std::result::Result<i64, RpcError> {
            Ok(0)
        }

        async fn get_storage(&self, _: &str, _: &str) -> std::result::Result<String, RpcError> {
            Ok(String::new())
        }
    }

    fn proxy_over(stack: Vec<StackItem>) -> (LockProxy, Arc<StaticStack>) {
        let rpc = Arc::new(StaticStack(stack, Mutex::new(Vec::new())));
        let policy = PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts: Some(2),
        };
        let proxy = LockProxy::new(
            ContractInvoker::new(rpc.clone()),
            ConfirmationPoller::new(rpc.clone(), policy),
        );
        (proxy, rpc)
    }

    #[tokio::test]
    async fn test_operator_is_rendered_as_address() {
        let account = ScriptHash([0x23; 20]);
        let (proxy, _) = proxy_over(vec![StackItem::byte_array(account.to_hex())]);
        let operator = proxy.get_proxy_operator(&ScriptHash([1; 20])).await.unwrap();
        assert_eq!(operator, account.to_address());
    }

    #[tokio::test]
    async fn test_single_query_without_bytes_is_empty_result() {
        let (proxy, _) = proxy_over(vec![StackItem::integer(0)]);
        let err = proxy.get_owner(&ScriptHash([1; 20])).await.unwrap_err();
        match err {
            LockProxyError::EmptyResult { method, .. } => assert_eq!(method, "owner"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_proxy_hash_is_stored_hex() {
        let (proxy, rpc) = proxy_over(vec![StackItem::byte_array("0aff")]);
        let hash = proxy.get_proxy_hash(&ScriptHash([1; 20]), 79).await.unwrap();
        assert_eq!(hash, "0aff");

        let expected = ContractCall::new(ScriptHash([1; 20]), "getProxyHash", vec![TypedValue::int(79)]);
        assert_eq!(rpc.1.lock().unwrap()[0], hex::encode(expected.to_script()));
    }

    #[tokio::test]
    async fn test_asset_hashes_keep_alignment() {
        let (proxy, _) = proxy_over(vec![
            StackItem::byte_array("aa"),
            StackItem::integer(0),
        ]);
        let assets = [ScriptHash([1; 20]), ScriptHash([2; 20]), ScriptHash([3; 20])];
        let hashes = proxy
            .get_asset_hashes(&ScriptHash([9; 20]), 79, &assets)
            .await
            .unwrap();
        assert_eq!(hashes, vec!["aa".to_string(), String::new(), String::new()]);
    }

    #[tokio::test]
    async fn test_write_without_signer_fails_before_rpc() {
        let (proxy, rpc) = proxy_over(vec![]);
        let err = proxy
            .lock(
                &ScriptHash([1; 20]),
                &ScriptHash([2; 20]),
                79,
                &[0xab; 20],
                &BigUint::from(2u32),
                &BigUint::from(1u32),
                &BigUint::from(0u32),
            )
            .await
            .unwrap_err();
        assert!(err.is_local());
        assert!(rpc.1.lock().unwrap().is_empty());
    }

    #[test]
    fn test_receipt_display() {
        let receipt = TxReceipt {
            tx_hash: TxHash([0; 32]),
            confirmation: ConfirmationOutcome::Stalled { attempts: 3 },
        };
        assert!(receipt.to_string().ends_with("(unconfirmed after 3 polls)"));
        assert!(!receipt.is_confirmed());
    }
}
