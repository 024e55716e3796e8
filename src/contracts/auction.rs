use ethers_core::types::{Address, U256};

use super::{single_address, single_bool, single_uint, ContractHandle, ContractKind, ContractLoader, WriteOptions};
use crate::error::WalletError;
use crate::provider::TxReceipt;

#[derive(Debug, Clone)]
pub struct AuctionContract {
    loader: ContractLoader,
    handle: ContractHandle,
}

impl ContractLoader {
    pub fn auction(&self, chain_id: u64) -> Result<AuctionContract, WalletError> {
        Ok(AuctionContract { loader: self.clone(), handle: self.resolve(ContractKind::SimpleAuction, chain_id)? })
    }
}

impl AuctionContract {
    pub fn address(&self) -> Address {
        self.handle.address
    }

    pub async fn highest_bid(&self) -> Result<U256, WalletError> {
        single_uint(self.loader.read(&self.handle, "highestBid", &[]).await?)
    }

    pub async fn highest_bidder(&self) -> Result<Address, WalletError> {
        single_address(self.loader.read(&self.handle, "highestBidder", &[]).await?)
    }

    pub async fn auction_ended(&self) -> Result<bool, WalletError> {
        single_bool(self.loader.read(&self.handle, "auctionEnded", &[]).await?)
    }

    /// Payable: the bid travels as the transaction value.
    pub async fn bid(&self, from: Address, value: U256) -> Result<TxReceipt, WalletError> {
        self.loader
            .write(&self.handle, from, "bid", &[], WriteOptions { value: Some(value), ..Default::default() })
            .await
    }

    pub async fn end_auction(&self, from: Address) -> Result<TxReceipt, WalletError> {
        self.loader.write(&self.handle, from, "endAuction", &[], WriteOptions::default()).await
    }

    pub async fn reset_auction(&self, from: Address) -> Result<TxReceipt, WalletError> {
        self.loader.write(&self.handle, from, "resetAuction", &[], WriteOptions::default()).await
    }
}
