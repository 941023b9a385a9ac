//! Tally Testing Infrastructure
//!
//! Deterministic stand-ins for the external ledger so the synchronization
//! core can be exercised without a chain, a wallet, or a network.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! tally-testkit = { path = "../tally-testkit" }
//! ```
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tally_testkit::{fixtures, MockLedger};
//!
//! let ledger = MockLedger::new();
//! ledger.seed_entries(fixtures::alice(), vec![fixtures::entry(100, "rent", 1)]);
//! let client: Arc<dyn tally_core::LedgerClient> = Arc::new(ledger.clone());
//! ```

pub mod fixtures;
pub mod mock_ledger;

pub use mock_ledger::{CallCounts, MockLedger};
