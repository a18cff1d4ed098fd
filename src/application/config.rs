use crate::domain::Cents;

/// Starting balance handed to an account that has never stored one (1000.00).
pub const DEFAULT_STARTING_BALANCE: Cents = 100_000;

/// Tag recorded as `approvedBy` / `rejectedBy`.
pub const DEFAULT_APPROVER: &str = "admin";

/// Tunables for a [`LedgerService`](super::LedgerService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub starting_balance: Cents,
    pub approver: String,
}

impl LedgerConfig {
    pub fn with_starting_balance(mut self, starting_balance: Cents) -> Self {
        self.starting_balance = starting_balance;
        self
    }

    pub fn with_approver(mut self, approver: impl Into<String>) -> Self {
        self.approver = approver.into();
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_STARTING_BALANCE,
            approver: DEFAULT_APPROVER.to_string(),
        }
    }
}
