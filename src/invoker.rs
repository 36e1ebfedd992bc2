//! Contract invocation: dry-run reads and signed writes
//!
//! Reads execute a script against the all-zero signer context and return the
//! raw evaluation stack. Writes run the same five steps for every operation:
//! resolve sender, build script, build transaction, sign, broadcast. The hash
//! is returned as soon as the node accepts the transaction; waiting for
//! inclusion is left to [`ConfirmationPoller`](crate::confirmation::ConfirmationPoller).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};

use crate::address::{self, ScriptHash};
use crate::error::{LockProxyError, Result};
use crate::rpc::NeoRpc;
use crate::script::{ContractCall, ScriptBuilder};
use crate::signer::TxSigner;
use crate::stack::StackItem;
use crate::transaction::{Transaction, TxHash};

/// Executes contract calls over a [`NeoRpc`] transport
pub struct ContractInvoker {
    rpc: Arc<dyn NeoRpc>,
    signer: Option<Arc<dyn TxSigner>>,
    nonce: AtomicU64,
}

impl ContractInvoker {
    /// Read-only invoker; write calls fail with a configuration error
    pub fn new(rpc: Arc<dyn NeoRpc>) -> Self {
        Self {
            rpc,
            signer: None,
            nonce: AtomicU64::new(initial_nonce()),
        }
    }

    pub fn with_signer(rpc: Arc<dyn NeoRpc>, signer: Arc<dyn TxSigner>) -> Self {
        Self {
            rpc,
            signer: Some(signer),
            nonce: AtomicU64::new(initial_nonce()),
        }
    }

    pub fn signer_address(&self) -> Option<String> {
        self.signer.as_ref().map(|s| s.address())
    }

    // =========================================================================
    // Read path
    // =========================================================================

    /// Dry-run one call
    pub async fn invoke_read(&self, call: &ContractCall) -> Result<Vec<StackItem>> {
        self.execute_script(call.to_script(), call.method(), call.contract())
            .await
    }

    /// Dry-run several calls in one script; stack entries follow call order
    pub async fn invoke_read_batch(&self, calls: &[ContractCall]) -> Result<Vec<StackItem>> {
        let Some(first) = calls.first() else {
            return Ok(Vec::new());
        };

        let mut builder = ScriptBuilder::new();
        for call in calls {
            builder.emit_app_call(call);
        }
        debug!(calls = calls.len(), script_len = builder.len(), "Batched read script");

        self.execute_script(builder.into_bytes(), first.method(), first.contract())
            .await
    }

    async fn execute_script(
        &self,
        script: Vec<u8>,
        method: &str,
        contract: &ScriptHash,
    ) -> Result<Vec<StackItem>> {
        let script_hex = hex::encode(&script);
        debug!(method = method, contract = %contract, script_len = script.len(), "Invoking script");

        let result = self
            .rpc
            .invoke_script(&script_hex, &ScriptHash::ZERO.to_hex())
            .await
            .map_err(|e| {
                error!(method = method, contract = %contract, error = %e, "Invoke script error");
                LockProxyError::Invocation {
                    method: method.to_string(),
                    contract: contract.to_string(),
                    reason: e.to_string(),
                }
            })?;

        if result.is_fault() {
            error!(method = method, contract = %contract, state = %result.state, "Script execution faulted");
            return Err(LockProxyError::Invocation {
                method: method.to_string(),
                contract: contract.to_string(),
                reason: format!("VM state {}", result.state),
            });
        }

        Ok(result.stack)
    }

    /// Read a raw storage slot of `contract`
    pub async fn read_storage(&self, contract: &ScriptHash, key_hex: &str) -> Result<String> {
        self.rpc
            .get_storage(&contract.to_display_hex(), key_hex)
            .await
            .map_err(|source| {
                error!(contract = %contract, key = key_hex, error = %source, "GetStorage error");
                LockProxyError::Rpc {
                    operation: format!("getstorage {}", contract),
                    source,
                }
            })
    }

    // =========================================================================
    // Write path
    // =========================================================================

    /// Sign and broadcast `call`, returning the transaction hash
    pub async fn invoke_write(&self, call: &ContractCall) -> Result<TxHash> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            LockProxyError::Config(format!(
                "[{}] no signer configured for state-changing call",
                call.method()
            ))
        })?;

        // 1. sender
        let signer_address = signer.address();
        let sender = address::parse(&signer_address).map_err(|e| LockProxyError::Format {
            input: signer_address.clone(),
            reason: format!("[{}] signer address: {}", call.method(), e),
        })?;

        // 2. script
        let script = call.to_script();

        // 3. unsigned transaction, zero fees, sender pays
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        let tx = Transaction::invocation(script, sender, nonce);

        // 4. sign
        let witness = signer.sign(&tx).map_err(|e| {
            LockProxyError::Signing(format!("[{}] {}", call.method(), e))
        })?;
        let signed = tx.into_signed(witness);
        if signed.witness().script_hash() != *signed.transaction().sender() {
            return Err(LockProxyError::Signing(format!(
                "[{}] witness does not belong to sender {}",
                call.method(),
                signer_address
            )));
        }
        let raw_tx = signed.to_hex();

        // 5. broadcast
        self.rpc.send_raw_transaction(&raw_tx).await.map_err(|e| {
            error!(method = call.method(), contract = %call.contract(), error = %e, "SendRawTransaction error");
            LockProxyError::Broadcast {
                method: call.method().to_string(),
                contract: call.contract().to_string(),
                reason: e.to_string(),
                raw_tx: raw_tx.clone(),
            }
        })?;

        let tx_hash = signed.hash();
        info!(
            method = call.method(),
            contract = %call.contract(),
            tx_hash = %tx_hash,
            "NEO transaction broadcast"
        );
        Ok(tx_hash)
    }
}

fn initial_nonce() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
