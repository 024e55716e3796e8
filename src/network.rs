use serde::Serialize;

pub const GANACHE_CHAIN_ID: u64 = 1337;
pub const GANACHE_NETWORK_ID: u64 = 5777;
pub const HARDHAT_CHAIN_ID: u64 = 31337;

pub fn chain_name(chain_id: u64) -> String {
    let known = match chain_id {
        1 => "Ethereum Mainnet",
        5 => "Goerli Testnet",
        10 => "Optimism",
        56 => "BNB Chain",
        97 => "BSC Testnet",
        137 => "Polygon",
        8453 => "Base",
        84532 => "Base Sepolia",
        11155111 => "Sepolia",
        80001 => "Mumbai",
        GANACHE_CHAIN_ID | GANACHE_NETWORK_ID => "Ganache Local",
        HARDHAT_CHAIN_ID => "Hardhat Network",
        _ => return format!("Unknown ({chain_id})"),
    };
    known.to_string()
}

pub fn currency_symbol(chain_id: u64) -> &'static str {
    match chain_id {
        56 => "BNB",
        97 => "tBNB",
        137 | 80001 => "MATIC",
        _ => "ETH",
    }
}

pub fn to_hex_id(chain_id: u64) -> String {
    format!("{chain_id:#x}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Parameters for `wallet_switchEthereumChain` / `wallet_addEthereumChain`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainParams {
    #[serde(rename = "chainId", serialize_with = "serialize_hex_id")]
    pub chain_id: u64,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Option<Vec<String>>,
}

fn serialize_hex_id<S: serde::Serializer>(id: &u64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&to_hex_id(*id))
}

impl ChainParams {
    pub fn for_chain(chain_id: u64, rpc_url: &str) -> Self {
        let symbol = currency_symbol(chain_id);
        Self {
            chain_id,
            chain_name: chain_name(chain_id),
            native_currency: NativeCurrency { name: symbol.into(), symbol: symbol.into(), decimals: 18 },
            rpc_urls: vec![rpc_url.to_string()],
            block_explorer_urls: None,
        }
    }

    pub fn ganache(rpc_url: &str) -> Self {
        Self::for_chain(GANACHE_CHAIN_ID, rpc_url)
    }

    pub fn switch_request(&self) -> serde_json::Value {
        serde_json::json!([{ "chainId": to_hex_id(self.chain_id) }])
    }

    pub fn add_request(&self) -> serde_json::Value {
        serde_json::json!([self])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_symbols() {
        assert_eq!(chain_name(1), "Ethereum Mainnet");
        assert_eq!(chain_name(1337), "Ganache Local");
        assert_eq!(chain_name(42424), "Unknown (42424)");
        assert_eq!(currency_symbol(56), "BNB");
        assert_eq!(currency_symbol(31337), "ETH");
    }

    #[test]
    fn add_chain_payload_shape() {
        let params = ChainParams::ganache("http://127.0.0.1:7545");
        let value = params.add_request();
        assert_eq!(value[0]["chainId"], "0x539");
        assert_eq!(value[0]["chainName"], "Ganache Local");
        assert_eq!(value[0]["nativeCurrency"]["decimals"], 18);
        assert_eq!(value[0]["rpcUrls"][0], "http://127.0.0.1:7545");
        assert_eq!(params.switch_request()[0]["chainId"], "0x539");
    }
}
