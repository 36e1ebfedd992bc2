//! NEO Lock Proxy - contract invocation and confirmation pipeline
//!
//! Operates a cross-chain lock proxy and its wrapper on the legacy NEO chain
//! (NeoVM 2) over JSON-RPC: bind proxy and asset mappings, lock assets,
//! extract fees, and query contract state.
//!
//! ## Layers
//!
//! - [`address`], [`script`], [`stack`], [`transaction`]: chain encodings
//! - [`signer`], [`rpc`]: the two capability seams (key material, transport)
//! - [`invoker`], [`confirmation`]: dry-run reads, signed writes, inclusion polling
//! - [`lock_proxy`]: one method per contract method
//! - [`config`]: startup configuration
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use neo_lockproxy::{address, ConfirmationPoller, ContractInvoker, JsonRpcClient, LockProxy, PollPolicy};
//!
//! let rpc = Arc::new(JsonRpcClient::new("http://seed1.ngd.network:20332")?);
//! let proxy = LockProxy::new(
//!     ContractInvoker::new(rpc.clone()),
//!     ConfirmationPoller::new(rpc, PollPolicy::default()),
//! );
//! let lock_proxy = address::parse("0xedd2862dceb90b945210372d229f453f2b705f4f")?;
//! let operator = proxy.get_proxy_operator(&lock_proxy).await?;
//! ```

pub mod address;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod invoker;
pub mod lock_proxy;
pub mod redact;
pub mod rpc;
pub mod script;
pub mod signer;
pub mod stack;
pub mod transaction;

pub use address::{AddressInput, ScriptHash};
pub use config::Config;
pub use confirmation::{ConfirmationOutcome, ConfirmationPoller, PollPolicy, PollState};
pub use error::{LockProxyError, Result};
pub use invoker::ContractInvoker;
pub use lock_proxy::{LockProxy, TxReceipt};
pub use rpc::{InvokeResult, JsonRpcClient, NeoRpc, RpcError};
pub use script::{ContractCall, ScriptBuilder, TypedValue};
pub use signer::{TxSigner, WifSigner};
pub use stack::{StackItem, StackValue};
pub use transaction::{SignedTransaction, Transaction, TxHash, Witness};
