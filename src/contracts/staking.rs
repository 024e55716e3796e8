use ethers_core::abi::Token;
use ethers_core::types::{Address, U256};

use super::{single_uint, ContractHandle, ContractKind, ContractLoader, WriteOptions};
use crate::error::WalletError;
use crate::provider::TxReceipt;

/// One entry of the platform's `stakers` mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StakerInfo {
    pub amount: U256,
    pub start_time: U256,
}

impl StakerInfo {
    pub fn has_stake(&self) -> bool {
        !self.amount.is_zero()
    }
}

#[derive(Debug, Clone)]
pub struct StakingContract {
    loader: ContractLoader,
    handle: ContractHandle,
}

impl ContractLoader {
    pub fn staking(&self, chain_id: u64) -> Result<StakingContract, WalletError> {
        Ok(StakingContract { loader: self.clone(), handle: self.resolve(ContractKind::StakingPlatform, chain_id)? })
    }
}

impl StakingContract {
    pub fn address(&self) -> Address {
        self.handle.address
    }

    pub async fn stakers(&self, account: Address) -> Result<StakerInfo, WalletError> {
        let tokens = self.loader.read(&self.handle, "stakers", &[Token::Address(account)]).await?;
        match tokens.as_slice() {
            [Token::Uint(amount), Token::Uint(start_time), ..] => {
                Ok(StakerInfo { amount: *amount, start_time: *start_time })
            }
            other => Err(WalletError::Decode(format!("stakers: unexpected output {other:?}"))),
        }
    }

    pub async fn calculate_rewards(&self, account: Address) -> Result<U256, WalletError> {
        single_uint(self.loader.read(&self.handle, "calculateRewards", &[Token::Address(account)]).await?)
    }

    /// Basis points.
    pub async fn apr(&self) -> Result<U256, WalletError> {
        single_uint(self.loader.read(&self.handle, "apr", &[]).await?)
    }

    /// Caller must have approved the platform for `amount` first.
    pub async fn stake(&self, from: Address, amount: U256) -> Result<TxReceipt, WalletError> {
        self.loader.write(&self.handle, from, "stake", &[Token::Uint(amount)], WriteOptions::default()).await
    }

    pub async fn un_stake(&self, from: Address) -> Result<TxReceipt, WalletError> {
        self.loader.write(&self.handle, from, "unStake", &[], WriteOptions::default()).await
    }

    /// Owner only.
    pub async fn set_apr(&self, from: Address, bps: U256) -> Result<TxReceipt, WalletError> {
        self.loader.write(&self.handle, from, "setAPR", &[Token::Uint(bps)], WriteOptions::default()).await
    }
}
