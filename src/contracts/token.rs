use ethers_core::abi::Token;
use ethers_core::types::{Address, U256};

use super::{single_uint, ContractHandle, ContractKind, ContractLoader, WriteOptions};
use crate::error::WalletError;
use crate::provider::TxReceipt;

/// ERC-20 style token (DeFi token, staking token, reward token).
#[derive(Debug, Clone)]
pub struct TokenContract {
    loader: ContractLoader,
    handle: ContractHandle,
}

impl ContractLoader {
    pub fn token(&self, kind: ContractKind, chain_id: u64) -> Result<TokenContract, WalletError> {
        Ok(TokenContract { loader: self.clone(), handle: self.resolve(kind, chain_id)? })
    }
}

impl TokenContract {
    pub fn address(&self) -> Address {
        self.handle.address
    }

    pub fn kind(&self) -> ContractKind {
        self.handle.kind
    }

    pub async fn balance_of(&self, owner: Address) -> Result<U256, WalletError> {
        single_uint(self.loader.read(&self.handle, "balanceOf", &[Token::Address(owner)]).await?)
    }

    pub async fn total_supply(&self) -> Result<U256, WalletError> {
        single_uint(self.loader.read(&self.handle, "totalSupply", &[]).await?)
    }

    pub async fn transfer(&self, from: Address, to: Address, amount: U256) -> Result<TxReceipt, WalletError> {
        self.loader
            .write(&self.handle, from, "transfer", &[Token::Address(to), Token::Uint(amount)], WriteOptions::default())
            .await
    }

    /// Transfer where the contract burns its configured share on the way.
    pub async fn transfer_with_auto_burn(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxReceipt, WalletError> {
        self.loader
            .write(
                &self.handle,
                from,
                "transferWithAutoBurn",
                &[Token::Address(to), Token::Uint(amount)],
                WriteOptions::default(),
            )
            .await
    }

    pub async fn approve(
        &self,
        from: Address,
        spender: Address,
        amount: U256,
        gas: Option<U256>,
    ) -> Result<TxReceipt, WalletError> {
        self.loader
            .write(
                &self.handle,
                from,
                "approve",
                &[Token::Address(spender), Token::Uint(amount)],
                WriteOptions { gas, ..Default::default() },
            )
            .await
    }
}
