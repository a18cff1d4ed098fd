use thiserror::Error;

use crate::domain::{format_cents, Cents, RequestId, RequestStatus};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Recharge not found: {0}")]
    RechargeNotFound(RequestId),

    #[error("Withdrawal not found: {0}")]
    WithdrawalNotFound(RequestId),

    #[error("Insufficient balance: balance {}, required {}", format_cents(*.balance), format_cents(*.required))]
    InsufficientFunds { balance: Cents, required: Cents },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Request {id} is already {status}")]
    RequestNotPending { id: RequestId, status: RequestStatus },

    #[error("Stored record '{key}' is unreadable: {reason}")]
    CorruptRecord { key: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
