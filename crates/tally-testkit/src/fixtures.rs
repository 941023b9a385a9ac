//! Common accounts and entries for tests.

use tally_core::{Account, Amount, ExpenseEntry};

/// Fixed block timestamp used as the mock ledger's starting clock
pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Deterministic account whose address bytes are all `n`
pub fn account(n: u8) -> Account {
    Account::from_bytes([n; 20])
}

/// Primary test account
pub fn alice() -> Account {
    account(0xa1)
}

/// Secondary test account
pub fn bob() -> Account {
    account(0xb0)
}

/// Build an entry with a small amount
pub fn entry(amount: u64, description: &str, timestamp: u64) -> ExpenseEntry {
    ExpenseEntry::new(Amount::from(amount), description, timestamp)
}

/// Three entries in insertion order: rent, groceries, coffee
pub fn abc_entries() -> Vec<ExpenseEntry> {
    vec![
        entry(1200, "rent", GENESIS_TIMESTAMP),
        entry(85, "groceries", GENESIS_TIMESTAMP + 60),
        entry(4, "coffee", GENESIS_TIMESTAMP + 120),
    ]
}
