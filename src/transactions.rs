use std::time::Duration;

use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{TransactionRequest, H256};
use ethers_signers::{LocalWallet, Signer};
use serde_json::json;

use crate::error::WalletError;
use crate::provider::{CallRequest, TxReceipt, WalletProvider};
use crate::rpc::{self, RpcEndpoint};
use crate::runtime;

/// How long to wait for a transaction to be mined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfirmPolicy {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        // 2s * 30 = 60s
        Self { poll_interval: Duration::from_secs(2), max_attempts: 30 }
    }
}

/// Progress of the write currently in flight, for status lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TxStatus {
    #[default]
    Idle,
    Submitting,
    Pending(H256),
    Confirmed(H256),
    Failed(String),
}

impl TxStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, TxStatus::Submitting | TxStatus::Pending(_))
    }
}

/// Poll for the receipt of `hash`; a mined receipt with non-success status is an error.
pub async fn wait_for_receipt(
    provider: &dyn WalletProvider,
    hash: H256,
    policy: ConfirmPolicy,
) -> Result<TxReceipt, WalletError> {
    for attempt in 0..policy.max_attempts {
        match provider.transaction_receipt(hash).await {
            Ok(Some(receipt)) if receipt.succeeded() => {
                tracing::info!(tx = ?hash, block = ?receipt.block_number, "transaction confirmed");
                return Ok(receipt);
            }
            Ok(Some(receipt)) => {
                tracing::error!(tx = ?hash, status = ?receipt.status, "transaction failed on-chain");
                return Err(WalletError::ReceiptFailed { hash, status: receipt.status });
            }
            Ok(None) => tracing::debug!(tx = ?hash, attempt, "receipt not available yet"),
            Err(err) => tracing::warn!(tx = ?hash, attempt, %err, "receipt poll failed"),
        }
        runtime::sleep(policy.poll_interval).await;
    }
    Err(WalletError::ReceiptTimeout(hash))
}

/// Sign `req` locally and push it with `eth_sendRawTransaction`.
///
/// Missing fields are filled from the node: pending nonce, gas price with a
/// 20% buffer, and a gas estimate with a 20% buffer unless `req.gas` is set.
pub async fn sign_and_send(
    endpoint: &RpcEndpoint,
    wallet: &LocalWallet,
    req: &CallRequest,
) -> Result<H256, WalletError> {
    let from = wallet.address();

    let nonce = rpc::quantity_u256(&endpoint.request("eth_getTransactionCount", json!([from, "pending"])).await?)?;
    let gas_price = rpc::quantity_u256(&endpoint.request("eth_gasPrice", json!([])).await?)?;
    let gas_price = gas_price + gas_price / 5;

    let gas = match req.gas {
        Some(gas) => gas,
        None => {
            let probe = CallRequest { from: Some(from), ..req.clone() };
            let estimate =
                rpc::quantity_u256(&endpoint.request("eth_estimateGas", json!([rpc::call_object(&probe)])).await?)?;
            estimate + estimate / 5
        }
    };

    let mut tx = TransactionRequest::new()
        .from(from)
        .to(req.to)
        .data(req.data.clone())
        .nonce(nonce)
        .gas(gas)
        .gas_price(gas_price)
        .chain_id(wallet.chain_id());
    if let Some(value) = req.value {
        tx = tx.value(value);
    }

    let typed: TypedTransaction = tx.into();
    let signature = wallet
        .sign_transaction(&typed)
        .await
        .map_err(|e| WalletError::Signer(e.to_string()))?;
    let raw = typed.rlp_signed(&signature);

    tracing::debug!(%from, nonce = %nonce, gas = %gas, "sending signed transaction");
    let hash = endpoint.request("eth_sendRawTransaction", json!([raw])).await?;
    rpc::h256(&hash)
}

