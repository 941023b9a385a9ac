//! Sync Configuration
//!
//! Runtime knobs for the synchronization core, loadable from TOML. Every
//! field has a default, so an empty document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tally_core::{Account, Result, TallyError};

fn default_read_concurrency() -> usize {
    8
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Synchronization core configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum entry reads in flight during one refresh
    #[serde(default = "default_read_concurrency")]
    pub read_concurrency: usize,

    /// `tracing` filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Ledger the client collaborator is expected to talk to
    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            read_concurrency: default_read_concurrency(),
            log_filter: default_log_filter(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| TallyError::config(format!("invalid config: {e}")))?;
        Ok(config.normalized())
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            TallyError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TallyError::config(format!("failed to serialize config: {e}")))
    }

    /// Entry-read fan-out, never below one
    pub fn effective_read_concurrency(&self) -> usize {
        self.read_concurrency.max(1)
    }

    fn normalized(mut self) -> Self {
        self.read_concurrency = self.effective_read_concurrency();
        self
    }
}

/// Target ledger description.
///
/// The core never dials the network; these values are carried for the client
/// collaborator and for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Human-readable network name
    pub network_name: String,

    /// EVM chain id
    pub chain_id: u64,

    /// Deployed expense contract
    pub contract_address: Account,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            network_name: "Flare Testnet Coston2".to_string(),
            chain_id: 114,
            contract_address: Account::from_bytes([0; 20]),
        }
    }
}
