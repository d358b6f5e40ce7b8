use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{
    Account, AccountId, NewAccount, NewTransaction, Page, PageRequest, Transaction,
};

mod memory;
mod sqlite;

pub use memory::*;
pub use sqlite::*;

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Capability interface over durable storage of accounts and their
/// transactions. Reads must observe every committed write.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Persist a new account, assigning its id and creation time.
    async fn insert_account(&self, account: NewAccount) -> Result<Account>;

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>>;

    async fn account_exists(&self, id: AccountId) -> Result<bool>;

    /// Remove an account together with its transactions.
    /// Returns false if no such account existed.
    async fn delete_account(&self, id: AccountId) -> Result<bool>;

    /// Accounts in id order.
    async fn list_accounts(&self, request: PageRequest) -> Result<Page<Account>>;

    /// Transactions owned by `account_id`, in id order.
    async fn list_transactions(
        &self,
        account_id: AccountId,
        request: PageRequest,
    ) -> Result<Page<Transaction>>;

    /// Open a unit of work. Its writes become visible together on
    /// [`StoreUnit::commit`] and are discarded if the unit is dropped first.
    async fn begin(&self) -> Result<Box<dyn StoreUnit>>;
}

/// A single all-or-nothing write boundary.
///
/// Accounts read through [`StoreUnit::find_account_for_update`] stay locked
/// against concurrent units until this one commits or is dropped.
#[async_trait]
pub trait StoreUnit: Send {
    async fn find_account_for_update(&mut self, id: AccountId) -> Result<Option<Account>>;

    async fn save_account(&mut self, account: &Account) -> Result<()>;

    /// Persist a transaction, stamping it with the current server time.
    async fn insert_transaction(&mut self, transaction: NewTransaction) -> Result<Transaction>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

pub type LedgerStoreBox = Box<dyn LedgerStore>;

/// Connection settings for [`SqliteStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    /// Create the database file when it does not exist yet.
    pub create_if_missing: bool,
    /// How long a writer waits on a locked database before giving up.
    pub busy_timeout: Duration,
    pub max_connections: u32,
}

impl StoreConfig {
    pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

    /// Settings for a SQLite database file at `path`.
    pub fn for_path(path: &str) -> Self {
        Self {
            database_url: format!("sqlite:{}", path),
            create_if_missing: false,
            busy_timeout: Self::DEFAULT_BUSY_TIMEOUT,
            max_connections: 8,
        }
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}
