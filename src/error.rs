use alloy_primitives::hex;
use ethers_core::abi::{self, ParamType, Token};
use ethers_core::types::H256;
use std::fmt;
use thiserror::Error;

/// EIP-1193 code for "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;
/// Selector of the Solidity `Error(string)` revert payload.
const ERROR_STRING_SELECTOR: &str = "08c379a0";
/// EIP-3085 code returned by `wallet_switchEthereumChain` for an unknown chain.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// Errors raised at the provider / contract boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WalletError {
    #[error("no injected wallet provider found")]
    ProviderUnavailable,
    #[error("request rejected by user")]
    UserRejected,
    #[error("wallet returned no accounts")]
    NoAccount,
    #[error("wallet is not connected")]
    NotConnected,
    #[error("{contract} is not deployed on network {chain_id}")]
    NetworkMismatch { contract: &'static str, chain_id: u64 },
    #[error("transaction reverted: {0}")]
    Reverted(RevertReason),
    #[error("transaction {hash:?} failed on-chain (status {status:?})")]
    ReceiptFailed { hash: H256, status: Option<u64> },
    #[error("no receipt for {0:?} after waiting")]
    ReceiptTimeout(H256),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("signer error: {0}")]
    Signer(String),
    #[error("{0}")]
    Unknown(String),
}

/// Secondary classification of a revert, matched on the revert text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertReason {
    Unauthorized,
    AlreadyFinalized,
    InsufficientFunds,
    Message(String),
    Unspecified,
}

impl RevertReason {
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("unauthorized") || lower.contains("only owner") || lower.contains("not the owner") {
            RevertReason::Unauthorized
        } else if lower.contains("auctionalreadyended")
            || lower.contains("already ended")
            || lower.contains("already finalized")
        {
            RevertReason::AlreadyFinalized
        } else if lower.contains("insufficient funds")
            || lower.contains("insufficient balance")
            || lower.contains("exceeds balance")
        {
            RevertReason::InsufficientFunds
        } else if let Some(msg) = extract_reason(text) {
            RevertReason::Message(msg)
        } else {
            RevertReason::Unspecified
        }
    }
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevertReason::Unauthorized => f.write_str("caller is not authorized"),
            RevertReason::AlreadyFinalized => f.write_str("already finalized"),
            RevertReason::InsufficientFunds => f.write_str("insufficient funds"),
            RevertReason::Message(msg) => f.write_str(msg),
            RevertReason::Unspecified => f.write_str("no reason given"),
        }
    }
}

// "execution reverted: Foo" / "... reason: Foo" / "revert Foo"
fn extract_reason(text: &str) -> Option<String> {
    for marker in ["reason: ", "execution reverted: ", "revert "] {
        if let Some(idx) = text.find(marker) {
            let rest = text[idx + marker.len()..].trim().trim_matches('"');
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }
    None
}

// ABI-encoded `Error(string)` revert data to its message.
fn decode_revert_data(data: &str) -> Option<String> {
    let payload = data.strip_prefix("0x").unwrap_or(data);
    let encoded = payload.strip_prefix(ERROR_STRING_SELECTOR)?;
    let bytes = hex::decode(encoded).ok()?;
    match abi::decode(&[ParamType::String], &bytes).ok()?.pop()? {
        Token::String(reason) => Some(reason),
        _ => None,
    }
}

impl WalletError {
    /// Map a JSON-RPC / EIP-1193 error object onto the taxonomy.
    pub fn from_rpc(code: i64, message: &str, data: Option<&str>) -> Self {
        let lower = message.to_lowercase();
        if code == USER_REJECTED_CODE || lower.contains("user rejected") || lower.contains("user denied") {
            return WalletError::UserRejected;
        }
        if lower.contains("revert") {
            let text = match data {
                Some(d) if !d.is_empty() => match decode_revert_data(d) {
                    Some(reason) => format!("execution reverted: {reason}"),
                    None => format!("{message} {d}"),
                },
                _ => message.to_string(),
            };
            return WalletError::Reverted(RevertReason::classify(&text));
        }
        if lower.contains("insufficient funds") {
            return WalletError::Reverted(RevertReason::InsufficientFunds);
        }
        WalletError::Rpc { code, message: message.to_string() }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, WalletError::UserRejected)
    }

    /// Short text suitable for a toast.
    pub fn user_message(&self) -> String {
        match self {
            WalletError::ProviderUnavailable => "Please install a browser wallet such as MetaMask".into(),
            WalletError::UserRejected => "Transaction rejected by user".into(),
            WalletError::NoAccount => "The wallet did not authorize any account".into(),
            WalletError::NotConnected => "Wallet not connected".into(),
            WalletError::NetworkMismatch { contract, .. } => {
                format!("{contract} contract is not deployed on this network")
            }
            WalletError::Reverted(RevertReason::InsufficientFunds) => {
                "Insufficient funds to complete the transaction".into()
            }
            WalletError::Reverted(RevertReason::Unauthorized) => {
                "You are not allowed to perform this action".into()
            }
            WalletError::Reverted(RevertReason::AlreadyFinalized) => "This has already been finalized".into(),
            WalletError::Reverted(RevertReason::Message(msg)) => msg.clone(),
            WalletError::Reverted(RevertReason::Unspecified) => "Transaction failed in the contract".into(),
            WalletError::ReceiptFailed { .. } => "Transaction failed on-chain".into(),
            WalletError::ReceiptTimeout(_) => "Timed out waiting for confirmation".into(),
            WalletError::Rpc { message, .. } if message.contains("gas required exceeds") => {
                "Transaction requires more gas than available".into()
            }
            other => other.to_string(),
        }
    }
}
