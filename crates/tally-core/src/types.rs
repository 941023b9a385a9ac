//! Ledger-facing value types
//!
//! Addresses and transaction hashes are fixed-width byte arrays rendered as
//! `0x`-prefixed lowercase hex. Amounts are 256-bit unsigned integers in the
//! ledger's native unit and travel through serde as decimal strings so no
//! precision is lost at a JSON boundary.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn decode_prefixed<const N: usize>(s: &str) -> Result<[u8; N], hex::FromHexError> {
    let hex_str = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let bytes = hex::decode(hex_str)?;
    if bytes.len() != N {
        return Err(hex::FromHexError::InvalidStringLength);
    }
    let mut array = [0u8; N];
    array.copy_from_slice(&bytes);
    Ok(array)
}

// ============================================================================
// Account
// ============================================================================

/// A wallet address, the partition key for all expense data.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Account([u8; 20]);

impl Account {
    /// Create an account from raw address bytes
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account({self})")
    }
}

impl FromStr for Account {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_prefixed::<20>(s).map(Self)
    }
}

impl From<Account> for String {
    fn from(account: Account) -> Self {
        account.to_string()
    }
}

impl TryFrom<String> for Account {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============================================================================
// Transaction handle
// ============================================================================

/// Opaque handle for a submitted write: the transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TxHandle([u8; 32]);

impl TxHandle {
    /// Create a handle from a raw 32-byte hash
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHandle({self})")
    }
}

impl FromStr for TxHandle {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_prefixed::<32>(s).map(Self)
    }
}

impl From<TxHandle> for String {
    fn from(handle: TxHandle) -> Self {
        handle.to_string()
    }
}

impl TryFrom<String> for TxHandle {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============================================================================
// Amount
// ============================================================================

/// Failure to parse a decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountParseError {
    /// Input contained something other than ASCII digits
    #[error("amount contains a non-digit character")]
    InvalidDigit,
    /// Input does not fit in 256 bits
    #[error("amount exceeds 256 bits")]
    Overflow,
    /// Input was empty
    #[error("amount is empty")]
    Empty,
}

/// Unsigned amount in the ledger's native unit (`uint256`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Amount(U256);

impl Amount {
    /// The zero amount
    pub const ZERO: Amount = Amount(U256([0; 4]));

    /// Create an amount from a 256-bit integer
    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    /// Parse a base-10 string of ASCII digits.
    ///
    /// Signs, whitespace, separators, and fractional parts are rejected.
    pub fn parse_decimal(input: &str) -> Result<Self, AmountParseError> {
        if input.is_empty() {
            return Err(AmountParseError::Empty);
        }
        if !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountParseError::InvalidDigit);
        }
        U256::from_dec_str(input)
            .map(Self::new)
            .map_err(|_| AmountParseError::Overflow)
    }

    /// Whether the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition; `None` on overflow
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_decimal(s)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_decimal(&value)
    }
}

// ============================================================================
// Ledger records
// ============================================================================

/// One recorded expense, as stored by the ledger.
///
/// Entries are append-only: index `i` always names the same entry for a
/// given account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpenseEntry {
    /// Amount in the ledger's native unit
    pub amount: Amount,
    /// Free-form description supplied at submission
    pub description: String,
    /// Block timestamp, seconds since the Unix epoch
    pub timestamp: u64,
}

impl ExpenseEntry {
    /// Create a new entry
    pub fn new(amount: Amount, description: impl Into<String>, timestamp: u64) -> Self {
        Self {
            amount,
            description: description.into(),
            timestamp,
        }
    }
}

/// Per-account totals maintained by the ledger.
///
/// Never computed locally; the ledger's numbers are authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AccountAggregate {
    /// Number of entries recorded for the account
    pub entry_count: u64,
    /// Sum of all entry amounts
    pub total_amount: Amount,
}

impl AccountAggregate {
    /// The aggregate of an account with no on-chain footprint
    pub const EMPTY: AccountAggregate = AccountAggregate {
        entry_count: 0,
        total_amount: Amount::ZERO,
    };

    /// Create an aggregate
    pub fn new(entry_count: u64, total_amount: Amount) -> Self {
        Self {
            entry_count,
            total_amount,
        }
    }
}
