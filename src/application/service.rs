use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::domain::{
    format_cents, generate_user_id, merge_transactions, parse_cents, pending_only,
    ApprovalKind, ApprovalLogEntry, Cents, InvestmentRecord, RechargeRequest, RequestKind,
    ReviewableRequest, TransactionView, WithdrawalRequest,
};
use crate::storage::{KeyValueStore, Keyspace, RecordKey, SqliteStore};

use super::{AppError, LedgerConfig};

/// Application service over one account's records in a key-value store.
///
/// Every mutating operation runs under the service lock and persists all of
/// its keys with a single `set_many`, so two operations issued through the
/// same service never interleave their read-modify-write.
pub struct LedgerService<S> {
    store: S,
    keys: Keyspace,
    config: LedgerConfig,
    lock: Mutex<()>,
}

/// Result of approving or rejecting a request
#[derive(Debug, Clone)]
pub struct ReviewResult<R> {
    pub request: R,
    pub log_entry: ApprovalLogEntry,
    /// New balance, when the decision moved funds
    pub balance: Option<Cents>,
}

/// Result of submitting a request
#[derive(Debug, Clone)]
pub struct SubmitResult<R> {
    pub request: R,
    pub balance: Cents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Approve,
    Reject,
}

impl LedgerService<SqliteStore> {
    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str, keys: Keyspace) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let store = SqliteStore::init(&db_url).await?;
        Ok(Self::new(store, keys))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, keys: Keyspace) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let store = SqliteStore::connect(&db_url).await?;
        Ok(Self::new(store, keys))
    }
}

impl<S: KeyValueStore> LedgerService<S> {
    pub fn new(store: S, keys: Keyspace) -> Self {
        Self {
            store,
            keys,
            config: LedgerConfig::default(),
            lock: Mutex::new(()),
        }
    }

    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn keys(&self) -> &Keyspace {
        &self.keys
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ========================
    // Balance operations
    // ========================

    /// Current balance, or the starting balance if none is stored yet.
    pub async fn get_balance(&self) -> Result<Cents, AppError> {
        match self.current_balance().await {
            Err(AppError::CorruptRecord { key, reason }) => {
                log::warn!("Ignoring unreadable {}: {}", key, reason);
                Ok(self.config.starting_balance)
            }
            other => other,
        }
    }

    /// Overwrite the balance. The sign is not checked.
    pub async fn set_balance(&self, amount: Cents) -> Result<(), AppError> {
        let _guard = self.lock.lock().await;
        self.persist(vec![self.balance_entry(amount)]).await
    }

    /// Add to the balance and return the new balance.
    pub async fn add_balance(&self, amount: Cents) -> Result<Cents, AppError> {
        let _guard = self.lock.lock().await;
        let balance = self.credited(amount).await?;
        self.persist(vec![self.balance_entry(balance)]).await?;
        Ok(balance)
    }

    /// Subtract from the balance unless that would make it negative.
    pub async fn subtract_balance(&self, amount: Cents) -> Result<Cents, AppError> {
        let _guard = self.lock.lock().await;
        let balance = self.debited(amount).await?;
        self.persist(vec![self.balance_entry(balance)]).await?;
        Ok(balance)
    }

    // ========================
    // Identity
    // ========================

    /// The account's user identifier, generated and stored on first use.
    pub async fn get_user_id(&self) -> Result<String, AppError> {
        let _guard = self.lock.lock().await;
        let key = self.keys.key(RecordKey::UserId);

        if let Some(existing) = self.store.get(&key).await? {
            if !existing.is_empty() {
                return Ok(existing);
            }
        }

        let user_id = generate_user_id(Utc::now(), &mut rand::thread_rng());
        self.store.set(&key, &user_id).await?;
        log::info!("Generated user id {}", user_id);
        Ok(user_id)
    }

    // ========================
    // Request queries
    // ========================

    pub async fn list_recharges(&self) -> Result<Vec<RechargeRequest>, AppError> {
        self.load_list_or_default(RecordKey::Recharges).await
    }

    pub async fn list_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, AppError> {
        self.load_list_or_default(RecordKey::Withdrawals).await
    }

    pub async fn list_investments(&self) -> Result<Vec<InvestmentRecord>, AppError> {
        self.load_list_or_default(RecordKey::Investments).await
    }

    /// Recharges still awaiting a decision, in stored order.
    pub async fn get_pending_recharges(&self) -> Result<Vec<RechargeRequest>, AppError> {
        Ok(pending_only(self.list_recharges().await?))
    }

    /// Withdrawals still awaiting a decision, in stored order.
    pub async fn get_pending_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, AppError> {
        Ok(pending_only(self.list_withdrawals().await?))
    }

    /// Unified history of recharges, withdrawals and investments, newest first.
    pub async fn get_all_transactions(&self) -> Result<Vec<TransactionView>, AppError> {
        let recharges = self.list_recharges().await?;
        let withdrawals = self.list_withdrawals().await?;
        let investments = self.list_investments().await?;
        Ok(merge_transactions(recharges, withdrawals, investments))
    }

    // ========================
    // Submissions
    // ========================

    /// Queue a recharge for approval. The balance is credited on approval.
    pub async fn submit_recharge(
        &self,
        amount: Cents,
        note: Option<String>,
    ) -> Result<SubmitResult<RechargeRequest>, AppError> {
        validate_amount(amount)?;
        let _guard = self.lock.lock().await;

        let balance = self.current_balance().await?;
        let mut recharge = RechargeRequest::new(amount, Utc::now());
        if let Some(note) = note {
            recharge = recharge.with_note(note);
        }

        let mut recharges: Vec<RechargeRequest> = self.load_list(RecordKey::Recharges).await?;
        recharges.push(recharge.clone());
        self.persist(vec![self.list_entry(RecordKey::Recharges, &recharges)?])
            .await?;

        log::info!(
            "Submitted recharge {} for {}",
            recharge.id,
            format_cents(amount)
        );
        Ok(SubmitResult {
            request: recharge,
            balance,
        })
    }

    /// Queue a withdrawal for approval, debiting the balance up front.
    /// Rejecting it later refunds the amount.
    pub async fn submit_withdrawal(
        &self,
        amount: Cents,
        note: Option<String>,
    ) -> Result<SubmitResult<WithdrawalRequest>, AppError> {
        validate_amount(amount)?;
        let _guard = self.lock.lock().await;

        let balance = self.debited(amount).await?;

        let mut withdrawal = WithdrawalRequest::new(amount, Utc::now());
        if let Some(note) = note {
            withdrawal = withdrawal.with_note(note);
        }

        let mut withdrawals: Vec<WithdrawalRequest> =
            self.load_list(RecordKey::Withdrawals).await?;
        withdrawals.push(withdrawal.clone());
        self.persist(vec![
            self.list_entry(RecordKey::Withdrawals, &withdrawals)?,
            self.balance_entry(balance),
        ])
        .await?;

        log::info!(
            "Submitted withdrawal {} for {}, balance now {}",
            withdrawal.id,
            format_cents(amount),
            format_cents(balance)
        );
        Ok(SubmitResult {
            request: withdrawal,
            balance,
        })
    }

    // ========================
    // Approvals
    // ========================

    /// Approve a pending recharge and credit its amount.
    pub async fn approve_recharge(
        &self,
        id: &str,
    ) -> Result<ReviewResult<RechargeRequest>, AppError> {
        self.review(RecordKey::Recharges, id, Decision::Approve)
            .await
    }

    /// Reject a pending recharge. The balance is untouched.
    pub async fn reject_recharge(
        &self,
        id: &str,
    ) -> Result<ReviewResult<RechargeRequest>, AppError> {
        self.review(RecordKey::Recharges, id, Decision::Reject).await
    }

    /// Approve a pending withdrawal. Funds already left at submission.
    pub async fn approve_withdrawal(
        &self,
        id: &str,
    ) -> Result<ReviewResult<WithdrawalRequest>, AppError> {
        self.review(RecordKey::Withdrawals, id, Decision::Approve)
            .await
    }

    /// Reject a pending withdrawal and refund its amount.
    pub async fn reject_withdrawal(
        &self,
        id: &str,
    ) -> Result<ReviewResult<WithdrawalRequest>, AppError> {
        self.review(RecordKey::Withdrawals, id, Decision::Reject)
            .await
    }

    /// Append an entry to the approval log.
    pub async fn log_approval(&self, entry: ApprovalLogEntry) -> Result<(), AppError> {
        let _guard = self.lock.lock().await;
        let mut approvals: Vec<ApprovalLogEntry> = self.load_list(RecordKey::Approvals).await?;
        approvals.push(entry);
        self.persist(vec![self.list_entry(RecordKey::Approvals, &approvals)?])
            .await
    }

    /// The approval log, oldest first.
    pub async fn list_approvals(&self) -> Result<Vec<ApprovalLogEntry>, AppError> {
        self.load_list_or_default(RecordKey::Approvals).await
    }

    async fn review<R>(
        &self,
        record: RecordKey,
        id: &str,
        decision: Decision,
    ) -> Result<ReviewResult<R>, AppError>
    where
        R: ReviewableRequest + Serialize + DeserializeOwned + Clone,
    {
        let _guard = self.lock.lock().await;
        let mut requests: Vec<R> = self.load_list(record).await?;

        let request = requests
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| not_found(R::KIND, id))?;

        if !request.status().is_pending() {
            return Err(AppError::RequestNotPending {
                id: id.to_string(),
                status: request.status(),
            });
        }

        let now = Utc::now();
        let kind = match decision {
            Decision::Approve => {
                request.mark_approved(&self.config.approver, now);
                ApprovalKind::approved(R::KIND)
            }
            Decision::Reject => {
                request.mark_rejected(&self.config.approver, now);
                ApprovalKind::rejected(R::KIND)
            }
        };
        let reviewed = request.clone();
        let amount = reviewed.amount();

        let mut entries = vec![self.list_entry(record, &requests)?];

        // Recharges credit on approval; withdrawals were debited at
        // submission and are refunded on rejection.
        let moves_funds = matches!(
            (R::KIND, decision),
            (RequestKind::Recharge, Decision::Approve)
                | (RequestKind::Withdrawal, Decision::Reject)
        );
        let balance = if moves_funds {
            let balance = self.credited(amount).await?;
            entries.push(self.balance_entry(balance));
            Some(balance)
        } else {
            None
        };

        let log_entry = ApprovalLogEntry::new(kind, id, amount).with_timestamp(now);
        let mut approvals: Vec<ApprovalLogEntry> = self.load_list(RecordKey::Approvals).await?;
        approvals.push(log_entry.clone());
        entries.push(self.list_entry(RecordKey::Approvals, &approvals)?);

        self.persist(entries).await?;

        log::info!(
            "{} {} ({}) by {}",
            kind,
            id,
            format_cents(amount),
            self.config.approver
        );
        Ok(ReviewResult {
            request: reviewed,
            log_entry,
            balance,
        })
    }

    // ========================
    // Storage helpers
    // ========================

    /// Stored balance, strictly parsed.
    async fn current_balance(&self) -> Result<Cents, AppError> {
        let key = self.keys.key(RecordKey::Balance);
        match self.store.get(&key).await? {
            None => Ok(self.config.starting_balance),
            Some(raw) if raw.trim().is_empty() => Ok(self.config.starting_balance),
            Some(raw) => parse_cents(&raw).map_err(|e| AppError::CorruptRecord {
                key,
                reason: format!("{} ({:?})", e, raw),
            }),
        }
    }

    async fn credited(&self, amount: Cents) -> Result<Cents, AppError> {
        let balance = self.current_balance().await?;
        balance
            .checked_add(amount)
            .ok_or_else(|| AppError::InvalidAmount("Balance would overflow".to_string()))
    }

    async fn debited(&self, amount: Cents) -> Result<Cents, AppError> {
        let balance = self.current_balance().await?;
        match balance.checked_sub(amount) {
            Some(remaining) if remaining >= 0 => Ok(remaining),
            _ => Err(AppError::InsufficientFunds {
                balance,
                required: amount,
            }),
        }
    }

    async fn load_list<T: DeserializeOwned>(&self, record: RecordKey) -> Result<Vec<T>, AppError> {
        let key = self.keys.key(record);
        match self.store.get(&key).await? {
            None => Ok(Vec::new()),
            Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| AppError::CorruptRecord {
                key,
                reason: e.to_string(),
            }),
        }
    }

    /// Read path: a corrupt list reads as empty instead of failing.
    async fn load_list_or_default<T: DeserializeOwned>(
        &self,
        record: RecordKey,
    ) -> Result<Vec<T>, AppError> {
        match self.load_list(record).await {
            Err(AppError::CorruptRecord { key, reason }) => {
                log::warn!("Ignoring unreadable {}: {}", key, reason);
                Ok(Vec::new())
            }
            other => other,
        }
    }

    fn list_entry<T: Serialize>(
        &self,
        record: RecordKey,
        items: &[T],
    ) -> Result<(String, String), AppError> {
        let key = self.keys.key(record);
        let value = serde_json::to_string(items)
            .map_err(|e| anyhow::anyhow!("Failed to serialize {}: {}", key, e))?;
        Ok((key, value))
    }

    fn balance_entry(&self, balance: Cents) -> (String, String) {
        (self.keys.key(RecordKey::Balance), format_cents(balance))
    }

    async fn persist(&self, entries: Vec<(String, String)>) -> Result<(), AppError> {
        for (key, _) in &entries {
            log::debug!("Writing {}", key);
        }
        self.store.set_many(&entries).await?;
        Ok(())
    }
}

fn validate_amount(amount: Cents) -> Result<(), AppError> {
    if amount <= 0 {
        return Err(AppError::InvalidAmount(
            "Amount must be positive".to_string(),
        ));
    }
    Ok(())
}

fn not_found(kind: RequestKind, id: &str) -> AppError {
    match kind {
        RequestKind::Recharge => AppError::RechargeNotFound(id.to_string()),
        RequestKind::Withdrawal => AppError::WithdrawalNotFound(id.to_string()),
    }
}
