use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{amount, Cents, RecordedTime};

/// Request identifiers are opaque strings. Older records used numeric ids,
/// which are read back as their decimal string.
pub type RequestId = String;

pub(crate) fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RequestId, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

/// A missing or null status reads as pending.
pub(crate) fn deserialize_status<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<RequestStatus, D::Error> {
    Ok(Option::<RequestStatus>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Recharge,
    Withdrawal,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Recharge => "recharge",
            RequestKind::Withdrawal => "withdrawal",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Shared behaviour of requests that an admin approves or rejects.
pub trait ReviewableRequest {
    const KIND: RequestKind;

    fn id(&self) -> &str;
    fn amount(&self) -> Cents;
    fn status(&self) -> RequestStatus;
    fn mark_approved(&mut self, by: &str, at: DateTime<Utc>);
    fn mark_rejected(&mut self, by: &str, at: DateTime<Utc>);
}

/// A request to add funds to the balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeRequest {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: RequestId,
    #[serde(with = "amount")]
    pub amount: Cents,
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<RecordedTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Fields written by other tools, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RechargeRequest {
    pub fn new(amount: Cents, created_at: DateTime<Utc>) -> Self {
        assert!(amount > 0, "Recharge amount must be positive");
        Self {
            id: Uuid::new_v4().to_string(),
            amount,
            status: RequestStatus::Pending,
            created_at: Some(created_at.into()),
            approved_at: None,
            approved_by: None,
            rejected_at: None,
            rejected_by: None,
            note: None,
            extra: Map::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl ReviewableRequest for RechargeRequest {
    const KIND: RequestKind = RequestKind::Recharge;

    fn id(&self) -> &str {
        &self.id
    }

    fn amount(&self) -> Cents {
        self.amount
    }

    fn status(&self) -> RequestStatus {
        self.status
    }

    fn mark_approved(&mut self, by: &str, at: DateTime<Utc>) {
        self.status = RequestStatus::Approved;
        self.approved_at = Some(at);
        self.approved_by = Some(by.to_string());
    }

    fn mark_rejected(&mut self, by: &str, at: DateTime<Utc>) {
        self.status = RequestStatus::Rejected;
        self.rejected_at = Some(at);
        self.rejected_by = Some(by.to_string());
    }
}

/// A request to take funds out of the balance.
/// Stored with `created` rather than `createdAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: RequestId,
    #[serde(with = "amount")]
    pub amount: Cents,
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: RequestStatus,
    #[serde(default, rename = "created", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<RecordedTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WithdrawalRequest {
    pub fn new(amount: Cents, created_at: DateTime<Utc>) -> Self {
        assert!(amount > 0, "Withdrawal amount must be positive");
        Self {
            id: Uuid::new_v4().to_string(),
            amount,
            status: RequestStatus::Pending,
            created_at: Some(created_at.into()),
            approved_at: None,
            approved_by: None,
            rejected_at: None,
            rejected_by: None,
            note: None,
            extra: Map::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl ReviewableRequest for WithdrawalRequest {
    const KIND: RequestKind = RequestKind::Withdrawal;

    fn id(&self) -> &str {
        &self.id
    }

    fn amount(&self) -> Cents {
        self.amount
    }

    fn status(&self) -> RequestStatus {
        self.status
    }

    fn mark_approved(&mut self, by: &str, at: DateTime<Utc>) {
        self.status = RequestStatus::Approved;
        self.approved_at = Some(at);
        self.approved_by = Some(by.to_string());
    }

    fn mark_rejected(&mut self, by: &str, at: DateTime<Utc>) {
        self.status = RequestStatus::Rejected;
        self.rejected_at = Some(at);
        self.rejected_by = Some(by.to_string());
    }
}

/// Keep only pending requests, in their stored order.
pub fn pending_only<R: ReviewableRequest>(requests: Vec<R>) -> Vec<R> {
    requests
        .into_iter()
        .filter(|r| r.status().is_pending())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recharge_reads_browser_record() {
        let recharge: RechargeRequest = serde_json::from_value(json!({
            "id": 1705312200000i64,
            "amount": 250.5,
            "status": "pending",
            "createdAt": "2024-01-15T10:30:00.000Z",
            "method": "USDT-TRC20",
            "note": "first top-up"
        }))
        .unwrap();

        assert_eq!(recharge.id, "1705312200000");
        assert_eq!(recharge.amount, 25050);
        assert_eq!(recharge.status, RequestStatus::Pending);
        assert_eq!(recharge.note.as_deref(), Some("first top-up"));
        assert_eq!(recharge.extra.get("method"), Some(&json!("USDT-TRC20")));
    }

    #[test]
    fn test_missing_status_is_pending() {
        let withdrawal: WithdrawalRequest =
            serde_json::from_value(json!({"id": "w1", "amount": 10})).unwrap();
        assert_eq!(withdrawal.status, RequestStatus::Pending);
        assert_eq!(withdrawal.created_at, None);
    }

    #[test]
    fn test_null_status_is_pending() {
        let recharge: RechargeRequest =
            serde_json::from_value(json!({"id": "r1", "amount": 10, "status": null})).unwrap();
        assert_eq!(recharge.status, RequestStatus::Pending);

        let withdrawal: WithdrawalRequest =
            serde_json::from_value(json!({"id": "w1", "amount": 10, "status": null})).unwrap();
        assert_eq!(withdrawal.status, RequestStatus::Pending);
    }

    #[test]
    fn test_numeric_creation_times_are_kept() {
        let recharge: RechargeRequest = serde_json::from_value(json!({
            "id": "r1",
            "amount": 10,
            "createdAt": 1705312200000i64
        }))
        .unwrap();
        assert_eq!(recharge.created_at, Some(RecordedTime::Millis(1705312200000)));

        let withdrawal: WithdrawalRequest = serde_json::from_value(json!({
            "id": "w1",
            "amount": 10,
            "created": 1705312200000i64
        }))
        .unwrap();
        let value = serde_json::to_value(&withdrawal).unwrap();
        assert_eq!(value["created"], json!(1705312200000i64));
    }

    #[test]
    fn test_withdrawal_uses_created_key() {
        let withdrawal: WithdrawalRequest = serde_json::from_value(json!({
            "id": "w1",
            "amount": 10,
            "created": "2024-02-01T00:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(
            withdrawal.created_at,
            Some(RecordedTime::from("2024-02-01T00:00:00.000Z"))
        );

        let value = serde_json::to_value(&withdrawal).unwrap();
        assert_eq!(value["created"], json!("2024-02-01T00:00:00.000Z"));
        assert!(value.get("createdAt").is_none());
    }

    #[test]
    fn test_extra_fields_survive_round_trip() {
        let input = json!({"id": "r1", "amount": 5, "userId": "user_1_2", "txHash": "0xabc"});
        let recharge: RechargeRequest = serde_json::from_value(input).unwrap();
        let output = serde_json::to_value(&recharge).unwrap();
        assert_eq!(output["userId"], json!("user_1_2"));
        assert_eq!(output["txHash"], json!("0xabc"));
    }

    #[test]
    fn test_mark_approved_and_rejected() {
        let now = Utc::now();
        let mut recharge = RechargeRequest::new(1000, now);
        recharge.mark_approved("admin", now);
        assert_eq!(recharge.status, RequestStatus::Approved);
        assert_eq!(recharge.approved_by.as_deref(), Some("admin"));
        assert_eq!(recharge.approved_at, Some(now));

        let mut withdrawal = WithdrawalRequest::new(1000, now).with_note("rent");
        withdrawal.mark_rejected("ops", now);
        assert_eq!(withdrawal.status, RequestStatus::Rejected);
        assert_eq!(withdrawal.rejected_by.as_deref(), Some("ops"));
        assert_eq!(withdrawal.note.as_deref(), Some("rent"));
    }

    #[test]
    fn test_pending_only_preserves_order() {
        let now = Utc::now();
        let mut requests: Vec<RechargeRequest> =
            (1..=4).map(|i| RechargeRequest::new(i * 100, now)).collect();
        requests[1].mark_approved("admin", now);
        let expected: Vec<RequestId> = [0, 2, 3].iter().map(|&i| requests[i].id.clone()).collect();

        let pending: Vec<RequestId> = pending_only(requests).into_iter().map(|r| r.id).collect();
        assert_eq!(pending, expected);
    }

    #[test]
    #[should_panic(expected = "Recharge amount must be positive")]
    fn test_recharge_requires_positive_amount() {
        RechargeRequest::new(0, Utc::now());
    }
}
