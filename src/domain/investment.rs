use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{amount, request::deserialize_id, Cents, RecordedTime, RequestId};

/// An investment position opened elsewhere. Read-only from the ledger's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: RequestId,
    #[serde(with = "amount")]
    pub amount: Cents,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<RecordedTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_at: Option<RecordedTime>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_investment_reads_browser_record() {
        let record: InvestmentRecord = serde_json::from_value(json!({
            "id": "inv-7",
            "amount": 300,
            "status": "active",
            "provider": "Alpha Fund",
            "createdAt": "2024-03-01T08:00:00.000Z",
            "payoutAt": "2024-04-01T08:00:00.000Z",
            "rate": 0.05
        }))
        .unwrap();

        assert_eq!(record.amount, 30000);
        assert_eq!(record.status.as_deref(), Some("active"));
        assert_eq!(record.provider.as_deref(), Some("Alpha Fund"));
        assert_eq!(
            record.payout_at,
            Some(RecordedTime::from("2024-04-01T08:00:00.000Z"))
        );
        assert_eq!(record.extra.get("rate"), Some(&json!(0.05)));
    }

    #[test]
    fn test_investment_reads_numeric_times() {
        let record: InvestmentRecord = serde_json::from_value(json!({
            "id": 9,
            "amount": 300,
            "createdAt": 1709280000000i64,
            "payoutAt": 1711958400000i64
        }))
        .unwrap();

        assert_eq!(record.created_at, Some(RecordedTime::Millis(1709280000000)));
        assert!(record.payout_at.and_then(|t| t.parse()).is_some());
    }
}
