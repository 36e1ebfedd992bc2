//! NEO JSON-RPC transport
//!
//! [`NeoRpc`] is the narrow set of node calls the lock proxy pipeline needs.
//! [`JsonRpcClient`] implements it against a node's HTTP JSON-RPC 2.0
//! endpoint; tests substitute an in-memory implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::stack::StackItem;

/// Failure talking to the node
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    /// Node answered with a JSON-RPC error object
    #[error("code {code}: {message}")]
    Server { code: i64, message: String },

    /// Request never produced a JSON-RPC answer
    #[error("transport: {0}")]
    Transport(String),

    /// Answer could not be parsed
    #[error("malformed response: {0}")]
    Decode(String),
}

impl RpcError {
    pub fn message(&self) -> &str {
        match self {
            RpcError::Server { message, .. } => message,
            RpcError::Transport(m) | RpcError::Decode(m) => m,
        }
    }
}

/// Result of a dry-run script execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeResult {
    #[serde(default)]
    pub script: String,
    /// VM state, e.g. `HALT` or `FAULT, BREAK`
    pub state: String,
    #[serde(default)]
    pub gas_consumed: String,
    #[serde(default)]
    pub stack: Vec<StackItem>,
}

impl InvokeResult {
    pub fn is_fault(&self) -> bool {
        self.state.contains("FAULT")
    }
}

/// Node operations consumed by the invoker and the poller
#[async_trait]
pub trait NeoRpc: Send + Sync {
    /// Execute a script without persisting state
    async fn invoke_script(
        &self,
        script_hex: &str,
        signer_context: &str,
    ) -> Result<InvokeResult, RpcError>;

    /// Submit a signed transaction
    async fn send_raw_transaction(&self, raw_tx_hex: &str) -> Result<(), RpcError>;

    /// Height of the block that includes `tx_hash`
    async fn get_transaction_height(&self, tx_hash: &str) -> Result<i64, RpcError>;

    /// Raw storage value as hex
    async fn get_storage(&self, contract_hex: &str, key_hex: &str) -> Result<String, RpcError>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

impl RpcResponse {
    /// Error object first; an absent or null result is `None`
    fn into_result<T: DeserializeOwned>(self) -> Result<Option<T>, RpcError> {
        if let Some(err) = self.error {
            return Err(RpcError::Server {
                code: err.code,
                message: err.message,
            });
        }
        match self.result {
            None | Some(Value::Null) => Ok(None),
            Some(result) => serde_json::from_value(result)
                .map(Some)
                .map_err(|e| RpcError::Decode(e.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// HTTP JSON-RPC client for a NEO node
pub struct JsonRpcClient {
    url: String,
    client: Client,
}

impl JsonRpcClient {
    pub fn new(url: &str) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| RpcError::Decode(format!("{} returned no result", method)))
    }

    async fn call_optional<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, RpcError> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        debug!(method = method, url = %self.url, "Sending NEO RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = response.status();
        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| RpcError::Decode(format!("HTTP {}: {}", status, e)))?;

        body.into_result()
    }
}

#[async_trait]
impl NeoRpc for JsonRpcClient {
    async fn invoke_script(
        &self,
        script_hex: &str,
        signer_context: &str,
    ) -> Result<InvokeResult, RpcError> {
        self.call("invokescript", json!([script_hex, signer_context]))
            .await
    }

    async fn send_raw_transaction(&self, raw_tx_hex: &str) -> Result<(), RpcError> {
        let accepted: Value = self
            .call("sendrawtransaction", json!([raw_tx_hex]))
            .await?;
        match accepted {
            Value::Bool(false) => Err(RpcError::Server {
                code: 0,
                message: "transaction rejected by node".to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn get_transaction_height(&self, tx_hash: &str) -> Result<i64, RpcError> {
        self.call("gettransactionheight", json!([tx_hash])).await
    }

    async fn get_storage(&self, contract_hex: &str, key_hex: &str) -> Result<String, RpcError> {
        // null result: key not present
        let value: Option<String> = self
            .call_optional("getstorage", json!([contract_hex, key_hex]))
            .await?;
        Ok(value.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_result_fault_detection() {
        let halt: InvokeResult =
            serde_json::from_str(r#"{"state":"HALT, BREAK","gas_consumed":"0.1","stack":[]}"#)
                .unwrap();
        assert!(!halt.is_fault());

        let fault: InvokeResult = serde_json::from_str(r#"{"state":"FAULT, BREAK"}"#).unwrap();
        assert!(fault.is_fault());
        assert!(fault.stack.is_empty());
    }

    #[test]
    fn test_rpc_response_error_parsing() {
        let body: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-100,"message":"Unknown transaction"}}"#,
        )
        .unwrap();
        let err = body.error.unwrap();
        assert_eq!(err.code, -100);
        assert_eq!(err.message, "Unknown transaction");
        assert!(body.result.is_none());
    }

    #[test]
    fn test_null_result_is_none() {
        let body: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert_eq!(body.into_result::<String>().unwrap(), None);

        let body: RpcResponse = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1}"#).unwrap();
        assert_eq!(body.into_result::<String>().unwrap(), None);

        let body: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":"0a0b"}"#).unwrap();
        assert_eq!(body.into_result::<String>().unwrap(), Some("0a0b".to_string()));
    }

    #[test]
    fn test_error_object_wins_over_result() {
        let body: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"result":null,"error":{"code":-32602,"message":"Invalid params"}}"#,
        )
        .unwrap();
        assert_eq!(
            body.into_result::<String>().unwrap_err(),
            RpcError::Server {
                code: -32602,
                message: "Invalid params".to_string()
            }
        );
    }

    #[test]
    fn test_mistyped_result_is_decode_error() {
        let body: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":42}"#).unwrap();
        assert!(matches!(
            body.into_result::<String>(),
            Err(RpcError::Decode(_))
        ));
    }

    #[test]
    fn test_error_message() {
        let err = RpcError::Server {
            code: -100,
            message: "Unknown transaction".to_string(),
        };
        assert_eq!(err.message(), "Unknown transaction");
        assert_eq!(err.to_string(), "code -100: Unknown transaction");
    }

    #[test]
    fn test_client_trims_url() {
        let client = JsonRpcClient::new("http://localhost:20332/").unwrap();
        assert_eq!(client.url(), "http://localhost:20332");
    }
}
