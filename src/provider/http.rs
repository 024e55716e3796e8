use async_trait::async_trait;
use ethers_core::types::{Address, Bytes, H256, U256};
use ethers_signers::{LocalWallet, Signer};
use serde_json::json;

use super::{CallRequest, EventHandler, TxReceipt, WalletProvider};
use crate::error::WalletError;
use crate::network::ChainParams;
use crate::rpc::{self, RpcEndpoint};
use crate::store::Subscription;
use crate::transactions;

/// JSON-RPC over HTTP, for scripts and local dev nodes.
///
/// With a signer, writes are signed locally and sent raw; without one the
/// node must hold the `from` account unlocked (Ganache / Hardhat).
#[derive(Debug, Clone)]
pub struct HttpProvider {
    endpoint: RpcEndpoint,
    signer: Option<LocalWallet>,
}

impl HttpProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self { endpoint: RpcEndpoint::new(url), signer: None }
    }

    /// `wallet` must already carry the endpoint's chain id.
    pub fn with_signer(url: impl Into<String>, wallet: LocalWallet) -> Self {
        Self { endpoint: RpcEndpoint::new(url), signer: Some(wallet) }
    }

    pub fn endpoint(&self) -> &RpcEndpoint {
        &self.endpoint
    }

    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(Signer::address)
    }
}

#[async_trait(?Send)]
impl WalletProvider for HttpProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.accounts().await
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        if let Some(address) = self.signer_address() {
            return Ok(vec![address]);
        }
        let value = self.endpoint.request("eth_accounts", json!([])).await?;
        rpc::address_list(&value)
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        let value = self.endpoint.request("eth_chainId", json!([])).await?;
        rpc::quantity_u64(&value)
    }

    async fn balance(&self, address: Address) -> Result<U256, WalletError> {
        let value = self.endpoint.request("eth_getBalance", json!([address, "latest"])).await?;
        rpc::quantity_u256(&value)
    }

    async fn call(&self, req: &CallRequest) -> Result<Bytes, WalletError> {
        let value = self.endpoint.request("eth_call", json!([rpc::call_object(req), "latest"])).await?;
        rpc::bytes(&value)
    }

    async fn send_transaction(&self, req: &CallRequest) -> Result<H256, WalletError> {
        match &self.signer {
            Some(wallet) => transactions::sign_and_send(&self.endpoint, wallet, req).await,
            None => {
                if req.from.is_none() {
                    return Err(WalletError::NotConnected);
                }
                let value = self.endpoint.request("eth_sendTransaction", json!([rpc::call_object(req)])).await?;
                rpc::h256(&value)
            }
        }
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TxReceipt>, WalletError> {
        let value = self.endpoint.request("eth_getTransactionReceipt", json!([hash])).await?;
        rpc::receipt(&value)
    }

    async fn switch_chain(&self, params: &ChainParams) -> Result<(), WalletError> {
        let current = self.chain_id().await?;
        if current == params.chain_id {
            Ok(())
        } else {
            Err(WalletError::Unknown(format!(
                "{} serves chain {current}, cannot switch to {}",
                self.endpoint.url(),
                params.chain_id
            )))
        }
    }

    fn subscribe(&self, _handler: EventHandler) -> Result<Subscription, WalletError> {
        // HTTP endpoints never push events.
        Ok(Subscription::noop())
    }
}
