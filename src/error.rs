//! Error types for lock proxy operations
//!
//! Every variant that crosses the invoker boundary carries the contract
//! method and contract hash it was raised for, so an operator reading the
//! log can replay the call by hand.

use thiserror::Error;

use crate::rpc::RpcError;

#[derive(Error, Debug)]
pub enum LockProxyError {
    // ========================================================================
    // Local input errors
    // ========================================================================

    #[error("Invalid address or hex input '{input}': {reason}")]
    Format { input: String, reason: String },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Chain errors
    // ========================================================================

    #[error("[{method}] invocation on {contract} failed: {reason}")]
    Invocation {
        method: String,
        contract: String,
        reason: String,
    },

    #[error("[{method}] broadcast to {contract} failed: {reason}, raw transaction: {raw_tx}")]
    Broadcast {
        method: String,
        contract: String,
        reason: String,
        raw_tx: String,
    },

    #[error("[{method}] {contract} returned no ByteArray result")]
    EmptyResult { method: String, contract: String },

    #[error("[{operation}] RPC error: {source}")]
    Rpc {
        operation: String,
        #[source]
        source: RpcError,
    },
}

impl LockProxyError {
    pub(crate) fn format(input: impl Into<String>, reason: impl ToString) -> Self {
        LockProxyError::Format {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors raised locally before anything reached the chain
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            LockProxyError::Format { .. } | LockProxyError::Signing(_) | LockProxyError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LockProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_error_carries_raw_tx() {
        let err = LockProxyError::Broadcast {
            method: "lock".to_string(),
            contract: "0xedd2862dceb90b945210372d229f453f2b705f4f".to_string(),
            reason: "Block or transaction validation failed".to_string(),
            raw_tx: "d101".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("[lock]"));
        assert!(msg.contains("raw transaction: d101"));
        assert!(!err.is_local());
    }

    #[test]
    fn test_format_error_is_local() {
        let err = LockProxyError::format("0xzz", "bad hex");
        assert!(err.is_local());
        assert!(err.to_string().contains("0xzz"));
    }
}
