//! Wei ⇄ display conversions.

use std::fmt;

use ethers_core::types::{Address, U256};
use ethers_core::utils::{format_units, to_checksum};

pub const ETHER_DECIMALS: u32 = 18;

/// A raw on-chain integer amount rendered as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayBalance {
    raw: U256,
    decimals: u32,
}

impl DisplayBalance {
    pub fn new(raw: U256, decimals: u32) -> Self {
        Self { raw, decimals }
    }

    pub fn ether(raw: U256) -> Self {
        Self::new(raw, ETHER_DECIMALS)
    }

    pub fn raw(&self) -> U256 {
        self.raw
    }

    fn split(&self) -> (String, String) {
        let text = format_units(self.raw, self.decimals).unwrap_or_else(|_| self.raw.to_string());
        match text.split_once('.') {
            Some((whole, frac)) => (whole.to_string(), frac.to_string()),
            None => (text, String::new()),
        }
    }

    /// Truncated to `digits` fractional digits.
    pub fn fixed(&self, digits: usize) -> String {
        let (whole, frac) = self.split();
        if digits == 0 {
            return whole;
        }
        let mut frac: String = frac.chars().take(digits).collect();
        while frac.len() < digits {
            frac.push('0');
        }
        format!("{whole}.{frac}")
    }

    /// `1.2K` / `3.40M` style rendering for dashboards.
    pub fn compact(&self) -> String {
        let value: f64 = self.to_string().parse().unwrap_or(0.0);
        if value >= 1e9 {
            format!("{:.2}B", value / 1e9)
        } else if value >= 1e6 {
            format!("{:.2}M", value / 1e6)
        } else if value >= 1e3 {
            format!("{:.2}K", value / 1e3)
        } else {
            format!("{value:.4}")
        }
    }
}

impl fmt::Display for DisplayBalance {
    /// Shortest exact decimal: `1.5`, `0.0`, `1000.0`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (whole, frac) = self.split();
        let trimmed = frac.trim_end_matches('0');
        if trimmed.is_empty() {
            write!(f, "{whole}.0")
        } else {
            write!(f, "{whole}.{trimmed}")
        }
    }
}

pub fn format_ether(raw: U256) -> String {
    DisplayBalance::ether(raw).to_string()
}

/// Basis points → `"35.50%"`. Values beyond `u64` saturate.
pub fn format_apr(bps: U256) -> String {
    let bps = u64::try_from(bps).unwrap_or(u64::MAX);
    format!("{}.{:02}%", bps / 100, bps % 100)
}

/// `0x1234...abcd`; inputs shorter than 10 characters are returned as-is.
pub fn short_address(address: &str) -> String {
    if address.len() < 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

pub fn checksum(address: &Address) -> String {
    to_checksum(address, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::utils::parse_ether;

    #[test]
    fn exact_decimal_rendering() {
        assert_eq!(format_ether(U256::zero()), "0.0");
        assert_eq!(format_ether(parse_ether("1.5").unwrap()), "1.5");
        assert_eq!(format_ether(parse_ether("1000").unwrap()), "1000.0");
        assert_eq!(format_ether(U256::from(1u64)), "0.000000000000000001");
        assert_eq!(DisplayBalance::new(U256::from(1_500_000u64), 6).to_string(), "1.5");
        assert_eq!(DisplayBalance::new(U256::from(42u64), 0).to_string(), "42.0");
    }

    #[test]
    fn fixed_truncates() {
        let b = DisplayBalance::ether(parse_ether("2.123456").unwrap());
        assert_eq!(b.fixed(4), "2.1234");
        assert_eq!(b.fixed(0), "2");
        assert_eq!(DisplayBalance::new(U256::from(5u64), 0).fixed(2), "5.00");
    }

    #[test]
    fn compact_suffixes() {
        assert_eq!(DisplayBalance::ether(parse_ether("12.5").unwrap()).compact(), "12.5000");
        assert_eq!(DisplayBalance::ether(parse_ether("1500").unwrap()).compact(), "1.50K");
        assert_eq!(DisplayBalance::ether(parse_ether("2500000").unwrap()).compact(), "2.50M");
        assert_eq!(DisplayBalance::ether(parse_ether("3000000000").unwrap()).compact(), "3.00B");
    }

    #[test]
    fn apr_and_addresses() {
        assert_eq!(format_apr(U256::from(3550u64)), "35.50%");
        assert_eq!(format_apr(U256::from(5u64)), "0.05%");
        assert_eq!(format_apr(U256::from(u64::MAX) + 1), "184467440737095516.15%");
        assert_eq!(format_apr(U256::MAX), "184467440737095516.15%");
        assert_eq!(short_address("0x1234567890abcdef1234567890abcdef12345678"), "0x1234...5678");
        assert_eq!(short_address("0x12"), "0x12");
    }
}
