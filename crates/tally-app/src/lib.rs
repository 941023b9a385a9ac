//! # Tally App - Portable Synchronization Core
//!
//! Headless application core for an on-chain expense ledger. It reads an
//! account's aggregate and entries through a [`LedgerClient`], submits new
//! expenses, tracks each write to confirmation, and keeps a consistent
//! read-side snapshot for whatever front end is attached.
//!
//! ## Architecture
//!
//! ```text
//!              ┌──────────────────────────────┐
//!  front end ─►│ SyncController               │
//!              │  ├─ TransactionTracker       │──► Dynamic<TransactionLifecycle>
//!              │  ├─ ReadStateCache           │──► Dynamic<Arc<ReadSnapshot>>
//!              │  └─ Arc<dyn LedgerClient>    │
//!              └──────────────────────────────┘
//! ```
//!
//! Front ends observe state by polling subscriptions, by registering a
//! [`SyncObserver`], or by rendering [`SyncController::view`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! let controller = SyncController::new(client, SyncConfig::default());
//! controller.on_wallet_changed(WalletStatus::connected(account)).await;
//! controller.create_expense("120", "groceries").await?;
//! let view = controller.view();
//! ```
//!
//! [`LedgerClient`]: tally_core::LedgerClient

#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod controller;
pub mod logging;
pub mod observer;
pub mod tracker;
pub mod validation;
pub mod views;
pub mod wallet;

pub use cache::{ReadStateCache, RefreshOutcome};
pub use config::{LedgerConfig, SyncConfig};
pub use controller::SyncController;
pub use observer::{FnObserver, LoggingObserver, NoOpObserver, SyncEvent, SyncObserver};
pub use tracker::TransactionTracker;
pub use validation::ExpenseInput;
pub use views::{DashboardView, ExpenseRow, StatusView};
pub use wallet::WalletStatus;

pub use tally_core::{
    Account, AccountAggregate, Amount, ExpenseEntry, ReadSnapshot, TallyError,
    TransactionLifecycle, TxHandle, TxPhase,
};
