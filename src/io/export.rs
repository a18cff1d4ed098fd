use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{format_cents, format_timestamp, ApprovalLogEntry, Cents, TransactionView};
use crate::storage::KeyValueStore;

/// Account snapshot for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub account: String,
    pub balance: String,
    pub transactions: Vec<TransactionView>,
    pub approvals: Vec<ApprovalLogEntry>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a, S> {
    service: &'a LedgerService<S>,
}

impl<'a, S: KeyValueStore> Exporter<'a, S> {
    pub fn new(service: &'a LedgerService<S>) -> Self {
        Self { service }
    }

    /// Export the unified transaction history to CSV format
    pub async fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let transactions = self.service.get_all_transactions().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "type",
            "amount",
            "status",
            "created_at",
            "approved_at",
            "note",
            "provider",
            "payout_at",
        ])?;

        for tx in &transactions {
            let created_at = tx.created_at.as_ref().map(ToString::to_string);
            let payout_at = tx.payout_at.as_ref().map(ToString::to_string);
            csv_writer.write_record([
                tx.id.as_str(),
                tx.kind.as_str(),
                format_cents(tx.amount).as_str(),
                tx.status.as_str(),
                created_at.as_deref().unwrap_or_default(),
                tx.approved_at.as_deref().unwrap_or_default(),
                tx.note.as_deref().unwrap_or_default(),
                tx.provider.as_deref().unwrap_or_default(),
                payout_at.as_deref().unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    /// Export the unified transaction history as a JSON array
    pub async fn export_transactions_json<W: Write>(&self, mut writer: W) -> Result<usize> {
        let transactions = self.service.get_all_transactions().await?;
        serde_json::to_writer_pretty(&mut writer, &transactions)?;
        writeln!(writer)?;
        Ok(transactions.len())
    }

    /// Export the approval log to CSV format
    pub async fn export_approvals_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let approvals = self.service.list_approvals().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["timestamp", "type", "target_id", "amount"])?;
        for entry in &approvals {
            csv_writer.write_record([
                format_timestamp(entry.timestamp).as_str(),
                entry.kind.as_str(),
                entry.target_id.as_str(),
                format_cents(entry.amount).as_str(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(approvals.len())
    }

    /// Export the approval log as a JSON array
    pub async fn export_approvals_json<W: Write>(&self, mut writer: W) -> Result<usize> {
        let approvals = self.service.list_approvals().await?;
        serde_json::to_writer_pretty(&mut writer, &approvals)?;
        writeln!(writer)?;
        Ok(approvals.len())
    }

    /// Export balance, history and approval log as one JSON document
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<AccountSnapshot> {
        let balance: Cents = self.service.get_balance().await?;
        let snapshot = AccountSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            account: self.service.keys().prefix().to_string(),
            balance: format_cents(balance),
            transactions: self.service.get_all_transactions().await?,
            approvals: self.service.list_approvals().await?,
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writeln!(writer)?;
        Ok(snapshot)
    }
}
