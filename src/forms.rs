//! Advisory client-side validation.
//!
//! Nothing here is authoritative: the contracts enforce the real rules.
//! These checks only keep obviously failing transactions from ever being
//! sent, so a form that fails validation never reaches a write call.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::OnceLock;

use ethers_core::types::{Address, U256};
use ethers_core::utils::parse_units;
use regex::Regex;
use thiserror::Error;

use crate::units::{format_ether, ETHER_DECIMALS};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{0} is required")]
    Empty(&'static str),
    #[error("amount must be a number")]
    NotNumeric,
    #[error("amount has more than 18 decimal places")]
    TooPrecise,
    #[error("amount must be greater than zero")]
    Zero,
    #[error("amount is too large")]
    Overflow,
    #[error("invalid address")]
    InvalidAddress,
    #[error("amount exceeds your balance of {available}")]
    ExceedsBalance { available: String },
    #[error("bid must be higher than the current highest bid of {highest}")]
    BidTooLow { highest: String },
    #[error("another transaction is still pending")]
    Busy,
}

fn matches(pattern: &'static OnceLock<Result<Regex, regex::Error>>, source: &str, input: &str) -> bool {
    match pattern.get_or_init(|| Regex::new(source)) {
        Ok(re) => re.is_match(input),
        Err(_) => false,
    }
}

fn is_amount(input: &str) -> bool {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    matches(&PATTERN, r"^[0-9]*\.?[0-9]*$", input)
}

fn is_address(input: &str) -> bool {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    matches(&PATTERN, r"^0x[0-9a-fA-F]{40}$", input)
}

/// Keystroke filter for amount inputs: keep `next` only if it could still
/// become a valid amount.
pub fn sanitize_amount_input(previous: &str, next: &str) -> String {
    if is_amount(next) {
        next.to_string()
    } else {
        previous.to_string()
    }
}

/// Decimal ether string to wei. Rejects empty, non-numeric, zero and
/// over-precise input.
pub fn parse_amount(input: &str) -> Result<U256, FormError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(FormError::Empty("amount"));
    }
    if !is_amount(input) || input == "." {
        return Err(FormError::NotNumeric);
    }

    let (whole, frac) = input.split_once('.').unwrap_or((input, ""));
    if frac.len() > ETHER_DECIMALS as usize {
        return Err(FormError::TooPrecise);
    }
    // below 10^59 ether the wei value stays under 2^256
    if whole.trim_start_matches('0').len() > 59 {
        return Err(FormError::Overflow);
    }
    let whole = if whole.is_empty() { "0" } else { whole };
    let frac = if frac.is_empty() { "0" } else { frac };
    let wei: U256 = parse_units(format!("{whole}.{frac}"), ETHER_DECIMALS)
        .map_err(|_| FormError::Overflow)?
        .into();
    if wei.is_zero() {
        return Err(FormError::Zero);
    }
    Ok(wei)
}

pub fn parse_recipient(input: &str) -> Result<Address, FormError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(FormError::Empty("recipient"));
    }
    if !is_address(input) {
        return Err(FormError::InvalidAddress);
    }
    input.parse().map_err(|_| FormError::InvalidAddress)
}

fn check_balance(amount: U256, balance: Option<U256>) -> Result<(), FormError> {
    match balance {
        Some(available) if amount > available => Err(FormError::ExceedsBalance { available: format_ether(available) }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferForm {
    pub recipient: String,
    pub amount: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidTransfer {
    pub to: Address,
    pub amount: U256,
}

impl TransferForm {
    pub fn new(recipient: impl Into<String>, amount: impl Into<String>) -> Self {
        Self { recipient: recipient.into(), amount: amount.into() }
    }

    /// `balance` is the displayed token balance, when one has been read.
    pub fn validate(&self, balance: Option<U256>) -> Result<ValidTransfer, FormError> {
        let to = parse_recipient(&self.recipient)?;
        let amount = parse_amount(&self.amount)?;
        check_balance(amount, balance)?;
        Ok(ValidTransfer { to, amount })
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StakeForm {
    pub amount: String,
}

impl StakeForm {
    pub fn new(amount: impl Into<String>) -> Self {
        Self { amount: amount.into() }
    }

    pub fn validate(&self, balance: Option<U256>) -> Result<U256, FormError> {
        let amount = parse_amount(&self.amount)?;
        check_balance(amount, balance)?;
        Ok(amount)
    }

    pub fn clear(&mut self) {
        self.amount.clear();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BidForm {
    pub amount: String,
}

impl BidForm {
    pub fn new(amount: impl Into<String>) -> Self {
        Self { amount: amount.into() }
    }

    /// Must beat `highest_bid` strictly and fit in the native `balance`.
    pub fn validate(&self, highest_bid: U256, balance: Option<U256>) -> Result<U256, FormError> {
        let amount = parse_amount(&self.amount)?;
        if amount <= highest_bid {
            return Err(FormError::BidTooLow { highest: format_ether(highest_bid) });
        }
        check_balance(amount, balance)?;
        Ok(amount)
    }

    pub fn clear(&mut self) {
        self.amount.clear();
    }
}

/// Disables an action while its transaction is pending.
#[derive(Debug, Clone, Default)]
pub struct ActionGate {
    busy: Rc<Cell<bool>>,
}

impl ActionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// `None` while another submission holds the gate.
    pub fn try_begin(&self) -> Option<PendingGuard> {
        if self.busy.replace(true) {
            return None;
        }
        Some(PendingGuard { busy: Rc::clone(&self.busy) })
    }
}

/// Re-opens the gate when dropped.
#[derive(Debug)]
pub struct PendingGuard {
    busy: Rc<Cell<bool>>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}
