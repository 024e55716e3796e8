//! EIP-1193 provider injected by browser wallets as `window.ethereum`.

use std::rc::Rc;

use async_trait::async_trait;
use ethers_core::types::{Address, Bytes, H256, U256};
use js_sys::{Array, Function, Object, Promise, Reflect};
use serde::Serialize;
use serde_json::{json, Value};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use super::{CallRequest, EventHandler, ProviderEvent, TxReceipt, WalletProvider};
use crate::error::{WalletError, UNRECOGNIZED_CHAIN_CODE};
use crate::network::ChainParams;
use crate::rpc;
use crate::store::Subscription;

type JsListener = Closure<dyn FnMut(JsValue)>;

#[derive(Debug, Clone, Copy, Default)]
pub struct InjectedProvider;

fn ethereum() -> Result<Object, WalletError> {
    let window = web_sys::window().ok_or(WalletError::ProviderUnavailable)?;
    Reflect::get(&window, &"ethereum".into())
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
        .and_then(|v| v.dyn_into::<Object>().ok())
        .ok_or(WalletError::ProviderUnavailable)
}

fn method(target: &Object, name: &str) -> Result<Function, WalletError> {
    Reflect::get(target, &name.into())
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok())
        .ok_or_else(|| WalletError::Unknown(format!("provider has no `{name}` method")))
}

/// Wallet errors are JS objects with (often non-enumerable) `code`/`message`/`data`.
fn provider_error(err: JsValue) -> WalletError {
    let get = |key: &str| Reflect::get(&err, &key.into()).unwrap_or(JsValue::UNDEFINED);
    let code = get("code").as_f64().map(|c| c as i64).unwrap_or(0);
    let message = get("message").as_string().unwrap_or_else(|| format!("{err:?}"));
    let data = get("data");
    let data = data
        .as_string()
        .or_else(|| Reflect::get(&data, &"message".into()).ok().and_then(|m| m.as_string()));
    WalletError::from_rpc(code, &message, data.as_deref())
}

impl InjectedProvider {
    pub fn new() -> Self {
        Self
    }

    pub async fn request(&self, name: &str, params: Value) -> Result<Value, WalletError> {
        let eth = ethereum()?;
        let args = Object::new();
        Reflect::set(&args, &"method".into(), &name.into()).map_err(provider_error)?;
        if !params.is_null() {
            let js_params = params
                .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
                .map_err(|e| WalletError::Decode(e.to_string()))?;
            Reflect::set(&args, &"params".into(), &js_params).map_err(provider_error)?;
        }

        let promise: Promise = method(&eth, "request")?
            .call1(&eth, &args)
            .map_err(provider_error)?
            .dyn_into()
            .map_err(|_| WalletError::Decode("request() did not return a promise".into()))?;
        let result = JsFuture::from(promise).await.map_err(provider_error)?;

        if result.is_undefined() || result.is_null() {
            return Ok(Value::Null);
        }
        serde_wasm_bindgen::from_value(result).map_err(|e| WalletError::Decode(e.to_string()))
    }

    fn listen(eth: &Object, event: &str, listener: &JsListener) -> Result<(), WalletError> {
        method(eth, "on")?
            .call2(eth, &event.into(), listener.as_ref().unchecked_ref())
            .map(|_| ())
            .map_err(provider_error)
    }
}

#[async_trait(?Send)]
impl WalletProvider for InjectedProvider {
    fn is_available(&self) -> bool {
        ethereum().is_ok()
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let value = self.request("eth_requestAccounts", Value::Null).await?;
        rpc::address_list(&value)
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        let value = self.request("eth_accounts", Value::Null).await?;
        rpc::address_list(&value)
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        let value = self.request("eth_chainId", Value::Null).await?;
        rpc::quantity_u64(&value)
    }

    async fn balance(&self, address: Address) -> Result<U256, WalletError> {
        let value = self.request("eth_getBalance", json!([address, "latest"])).await?;
        rpc::quantity_u256(&value)
    }

    async fn call(&self, req: &CallRequest) -> Result<Bytes, WalletError> {
        let value = self.request("eth_call", json!([rpc::call_object(req), "latest"])).await?;
        rpc::bytes(&value)
    }

    async fn send_transaction(&self, req: &CallRequest) -> Result<H256, WalletError> {
        let value = self.request("eth_sendTransaction", json!([rpc::call_object(req)])).await?;
        rpc::h256(&value)
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TxReceipt>, WalletError> {
        let value = self.request("eth_getTransactionReceipt", json!([hash])).await?;
        rpc::receipt(&value)
    }

    async fn switch_chain(&self, params: &ChainParams) -> Result<(), WalletError> {
        match self.request("wallet_switchEthereumChain", params.switch_request()).await {
            Ok(_) => Ok(()),
            Err(WalletError::Rpc { code, .. }) if code == UNRECOGNIZED_CHAIN_CODE => {
                tracing::info!(chain_id = params.chain_id, "chain unknown to wallet, adding it");
                self.request("wallet_addEthereumChain", params.add_request()).await.map(|_| ())
            }
            Err(err) => Err(err),
        }
    }

    fn subscribe(&self, handler: EventHandler) -> Result<Subscription, WalletError> {
        let eth = ethereum()?;
        let handler: Rc<dyn Fn(&ProviderEvent)> = Rc::from(handler);

        let on_accounts = Rc::clone(&handler);
        let accounts: JsListener = Closure::wrap(Box::new(move |value: JsValue| {
            let accounts = Array::from(&value)
                .iter()
                .filter_map(|a| a.as_string())
                .filter_map(|a| a.parse::<Address>().ok())
                .collect();
            on_accounts(&ProviderEvent::AccountsChanged(accounts));
        }) as Box<dyn FnMut(JsValue)>);

        let on_chain = Rc::clone(&handler);
        let chain: JsListener = Closure::wrap(Box::new(move |value: JsValue| {
            let raw = value.as_string().map(Value::String).unwrap_or(Value::Null);
            match rpc::quantity_u64(&raw) {
                Ok(id) => on_chain(&ProviderEvent::ChainChanged(id)),
                Err(err) => tracing::warn!(%err, "ignoring malformed chainChanged payload"),
            }
        }) as Box<dyn FnMut(JsValue)>);

        let on_disconnect = Rc::clone(&handler);
        let disconnect: JsListener = Closure::wrap(Box::new(move |_: JsValue| {
            on_disconnect(&ProviderEvent::Disconnect);
        }) as Box<dyn FnMut(JsValue)>);

        let registered = vec![("accountsChanged", accounts), ("chainChanged", chain), ("disconnect", disconnect)];
        for (event, listener) in &registered {
            Self::listen(&eth, event, listener)?;
        }

        Ok(Subscription::new(move || {
            let Ok(remove) = method(&eth, "removeListener") else {
                return;
            };
            for (event, listener) in registered {
                if let Err(err) = remove.call2(&eth, &event.into(), listener.as_ref().unchecked_ref()) {
                    tracing::warn!(event, ?err, "removeListener failed");
                }
            }
        }))
    }
}
