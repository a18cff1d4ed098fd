use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{amount, request::deserialize_id, Cents, RequestId, RequestKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
    RechargeApproved,
    RechargeRejected,
    WithdrawalApproved,
    WithdrawalRejected,
}

impl ApprovalKind {
    pub fn approved(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Recharge => ApprovalKind::RechargeApproved,
            RequestKind::Withdrawal => ApprovalKind::WithdrawalApproved,
        }
    }

    pub fn rejected(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Recharge => ApprovalKind::RechargeRejected,
            RequestKind::Withdrawal => ApprovalKind::WithdrawalRejected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalKind::RechargeApproved => "recharge_approved",
            ApprovalKind::RechargeRejected => "recharge_rejected",
            ApprovalKind::WithdrawalApproved => "withdrawal_approved",
            ApprovalKind::WithdrawalRejected => "withdrawal_rejected",
        }
    }
}

impl std::fmt::Display for ApprovalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One admin decision in the append-only approval log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalLogEntry {
    #[serde(rename = "type")]
    pub kind: ApprovalKind,
    /// Older logs keyed the target by request type.
    #[serde(alias = "rechargeId", alias = "withdrawId", deserialize_with = "deserialize_id")]
    pub target_id: RequestId,
    #[serde(with = "amount")]
    pub amount: Cents,
    pub timestamp: DateTime<Utc>,
}

impl ApprovalLogEntry {
    pub fn new(kind: ApprovalKind, target_id: impl Into<RequestId>, amount: Cents) -> Self {
        Self {
            kind,
            target_id: target_id.into(),
            amount,
            timestamp: Utc::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
