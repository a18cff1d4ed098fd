use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    amount, format_timestamp, Cents, InvestmentRecord, RecordedTime, RechargeRequest, RequestId,
    WithdrawalRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Recharge,
    Withdraw,
    Investment,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Recharge => "recharge",
            TransactionKind::Withdraw => "withdraw",
            TransactionKind::Investment => "investment",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Normalized row of the unified transaction history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: RequestId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(with = "amount")]
    pub amount: Cents,
    pub status: String,
    pub created_at: Option<RecordedTime>,
    pub approved_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_at: Option<RecordedTime>,
}

impl TransactionView {
    /// Parsed creation time; `None` when missing or unparseable.
    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_ref().and_then(RecordedTime::parse)
    }
}

impl From<RechargeRequest> for TransactionView {
    fn from(r: RechargeRequest) -> Self {
        Self {
            id: r.id,
            kind: TransactionKind::Recharge,
            amount: r.amount,
            status: r.status.to_string(),
            created_at: r.created_at,
            approved_at: r.approved_at.map(format_timestamp),
            note: r.note,
            provider: None,
            payout_at: None,
        }
    }
}

impl From<WithdrawalRequest> for TransactionView {
    fn from(w: WithdrawalRequest) -> Self {
        Self {
            id: w.id,
            kind: TransactionKind::Withdraw,
            amount: w.amount,
            status: w.status.to_string(),
            created_at: w.created_at,
            approved_at: w.approved_at.map(format_timestamp),
            note: w.note,
            provider: None,
            payout_at: None,
        }
    }
}

impl From<InvestmentRecord> for TransactionView {
    fn from(inv: InvestmentRecord) -> Self {
        Self {
            id: inv.id,
            kind: TransactionKind::Investment,
            amount: inv.amount,
            status: inv.status.unwrap_or_default(),
            created_at: inv.created_at,
            approved_at: None,
            note: None,
            provider: inv.provider,
            payout_at: inv.payout_at,
        }
    }
}

/// Merge all three lists into one history, most recent first.
///
/// Rows without a usable creation time sort last and keep their merge order
/// (recharges, then withdrawals, then investments).
pub fn merge_transactions(
    recharges: Vec<RechargeRequest>,
    withdrawals: Vec<WithdrawalRequest>,
    investments: Vec<InvestmentRecord>,
) -> Vec<TransactionView> {
    let mut transactions: Vec<TransactionView> = recharges
        .into_iter()
        .map(TransactionView::from)
        .chain(withdrawals.into_iter().map(TransactionView::from))
        .chain(investments.into_iter().map(TransactionView::from))
        .collect();

    transactions.sort_by_cached_key(|t| std::cmp::Reverse(t.created_time()));
    transactions
}
