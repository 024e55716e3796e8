//! Raw JSON-RPC plumbing shared by the injected and HTTP providers.

use std::sync::atomic::{AtomicU64, Ordering};

use ethers_core::types::{Address, Bytes, H256, U256};
use serde_json::{json, Value};

use crate::error::WalletError;
use crate::provider::{CallRequest, TxReceipt};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn request_body(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": NEXT_ID.fetch_add(1, Ordering::Relaxed),
    })
}

/// Unwrap a JSON-RPC response envelope into its `result`.
pub fn into_result(envelope: Value) -> Result<Value, WalletError> {
    if let Some(err) = envelope.get("error") {
        return Err(error_from_value(err));
    }
    envelope
        .get("result")
        .cloned()
        .ok_or_else(|| WalletError::Decode(format!("missing result in {envelope}")))
}

/// Map an `{ code, message, data }` error object (JSON-RPC or EIP-1193).
pub fn error_from_value(err: &Value) -> WalletError {
    let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
    let message = err.get("message").and_then(Value::as_str).unwrap_or("unknown error");
    let data = match err.get("data") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(obj)) => obj
            .get("message")
            .or_else(|| obj.get("reason"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };
    WalletError::from_rpc(code, message, data.as_deref())
}

fn hex_str(value: &Value) -> Result<&str, WalletError> {
    value
        .as_str()
        .map(|s| s.trim_start_matches("0x"))
        .ok_or_else(|| WalletError::Decode(format!("expected hex string, got {value}")))
}

pub fn quantity_u64(value: &Value) -> Result<u64, WalletError> {
    // Some wallets answer net_version / chainId with decimal strings or numbers.
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    let raw = value.as_str().ok_or_else(|| WalletError::Decode(format!("expected quantity, got {value}")))?;
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) if hex.is_empty() => Ok(0),
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse::<u64>(),
    };
    parsed.map_err(|e| WalletError::Decode(format!("bad quantity {raw}: {e}")))
}

pub fn quantity_u256(value: &Value) -> Result<U256, WalletError> {
    let hex = hex_str(value)?;
    if hex.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(hex, 16).map_err(|e| WalletError::Decode(format!("bad quantity 0x{hex}: {e}")))
}

pub fn bytes(value: &Value) -> Result<Bytes, WalletError> {
    let hex = hex_str(value)?;
    alloy_primitives::hex::decode(hex)
        .map(Bytes::from)
        .map_err(|e| WalletError::Decode(format!("bad hex data: {e}")))
}

pub fn h256(value: &Value) -> Result<H256, WalletError> {
    serde_json::from_value(value.clone()).map_err(|e| WalletError::Decode(format!("bad hash {value}: {e}")))
}

pub fn address_list(value: &Value) -> Result<Vec<Address>, WalletError> {
    let items = value.as_array().ok_or_else(|| WalletError::Decode(format!("expected account list, got {value}")))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(|s| s.parse::<Address>().ok())
                .ok_or_else(|| WalletError::Decode(format!("bad account {item}")))
        })
        .collect()
}

/// `null` while the transaction is still pending.
pub fn receipt(value: &Value) -> Result<Option<TxReceipt>, WalletError> {
    if value.is_null() {
        return Ok(None);
    }
    let transaction_hash = h256(&value["transactionHash"])?;
    let status = match value.get("status") {
        Some(v) if !v.is_null() => Some(quantity_u64(v)?),
        _ => None,
    };
    let block_number = match value.get("blockNumber") {
        Some(v) if !v.is_null() => Some(quantity_u64(v)?),
        _ => None,
    };
    let gas_used = match value.get("gasUsed") {
        Some(v) if !v.is_null() => Some(quantity_u256(v)?),
        _ => None,
    };
    Ok(Some(TxReceipt { transaction_hash, block_number, status, gas_used }))
}

pub fn call_object(req: &CallRequest) -> Value {
    let mut obj = serde_json::Map::new();
    if let Some(from) = req.from {
        obj.insert("from".into(), json!(from));
    }
    obj.insert("to".into(), json!(req.to));
    obj.insert("data".into(), json!(req.data));
    if let Some(value) = req.value {
        obj.insert("value".into(), json!(value));
    }
    if let Some(gas) = req.gas {
        obj.insert("gas".into(), json!(gas));
    }
    Value::Object(obj)
}

/// Plain HTTP JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcEndpoint {
    url: String,
    #[cfg(not(target_arch = "wasm32"))]
    client: reqwest::Client,
}

impl RpcEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            #[cfg(not(target_arch = "wasm32"))]
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let body = request_body(method, params);
        tracing::trace!(%method, url = %self.url, "rpc request");
        let envelope = self.post(body).await?;
        into_result(envelope)
    }

    #[cfg(target_arch = "wasm32")]
    async fn post(&self, body: Value) -> Result<Value, WalletError> {
        use gloo_net::http::Request;

        let resp = Request::post(&self.url)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .map_err(|e| WalletError::Transport(e.to_string()))?
            .send()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;
        resp.json().await.map_err(|e| WalletError::Decode(e.to_string()))
    }

    #[cfg(not(target_arch = "wasm32"))]
    async fn post(&self, body: Value) -> Result<Value, WalletError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;
        resp.json().await.map_err(|e| WalletError::Decode(e.to_string()))
    }
}
