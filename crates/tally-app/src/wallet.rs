//! Wallet connection state as reported by the account provider.

use serde::{Deserialize, Serialize};
use tally_core::Account;

/// What the wallet provider currently reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WalletStatus {
    /// Whether a wallet session is open
    pub connected: bool,
    /// Selected account, if any
    pub account: Option<Account>,
}

impl WalletStatus {
    /// No wallet session
    pub const fn disconnected() -> Self {
        Self {
            connected: false,
            account: None,
        }
    }

    /// A connected wallet with the given account selected
    pub const fn connected(account: Account) -> Self {
        Self {
            connected: true,
            account: Some(account),
        }
    }

    /// The account reads and writes should use.
    ///
    /// A missing account and a closed session are treated the same.
    pub fn active_account(&self) -> Option<Account> {
        if self.connected {
            self.account
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_hides_account() {
        let account = Account::from_bytes([1; 20]);
        let status = WalletStatus {
            connected: false,
            account: Some(account),
        };
        assert_eq!(status.active_account(), None);
        assert_eq!(
            WalletStatus::connected(account).active_account(),
            Some(account)
        );
        assert_eq!(
            WalletStatus {
                connected: true,
                account: None
            }
            .active_account(),
            None
        );
    }
}
