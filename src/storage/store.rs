use anyhow::Result;

/// A string-keyed store of string values, the ledger's only persistence port.
///
/// `set_many` must apply all of its writes or none of them.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn set_many(&self, entries: &[(String, String)]) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<()> {
        (**self).set_many(entries).await
    }
}

/// The record categories an account keeps in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Balance,
    UserId,
    Recharges,
    Withdrawals,
    Investments,
    Approvals,
}

impl RecordKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKey::Balance => "balance",
            RecordKey::UserId => "user_id",
            RecordKey::Recharges => "recharges",
            RecordKey::Withdrawals => "withdraws",
            RecordKey::Investments => "invests",
            RecordKey::Approvals => "approvals",
        }
    }
}

/// Account context: every key of one account shares this prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Keyspace {
    prefix: String,
}

impl Keyspace {
    pub const DEFAULT_PREFIX: &'static str = "dmall";

    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn key(&self, record: RecordKey) -> String {
        format!("{}_{}", self.prefix, record.as_str())
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX)
    }
}
