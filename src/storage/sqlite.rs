use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};

use crate::domain::{
    Account, AccountId, NewAccount, NewTransaction, Page, PageRequest, Transaction,
};

use super::{LedgerStore, MIGRATION_001_INITIAL, StoreConfig, StoreUnit};

const ACCOUNT_COLUMNS: &str = "id, holder_name, email, balance, created_at";
const TRANSACTION_COLUMNS: &str = "id, account_id, amount, created_at";

/// SQLite-backed store for accounts and transactions.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store over an existing SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database described by `config`.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .with_context(|| format!("Invalid database URL: {}", config.database_url))?
            .create_if_missing(config.create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        tracing::debug!(url = %config.database_url, "connected to database");
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate), creating the file if needed.
    pub async fn init(config: &StoreConfig) -> Result<Self> {
        let config = config.clone().create_if_missing(true);
        let store = Self::connect(&config).await?;
        store.migrate().await?;
        Ok(store)
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let balance: String = row.get("balance");
        let created_at: String = row.get("created_at");

        Ok(Account {
            id: row.get("id"),
            holder_name: row.get("holder_name"),
            email: row.get("email"),
            balance: parse_decimal(&balance).context("Invalid account balance")?,
            created_at: parse_timestamp(&created_at).context("Invalid created_at timestamp")?,
        })
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let amount: String = row.get("amount");
        let created_at: String = row.get("created_at");

        Ok(Transaction {
            id: row.get("id"),
            account_id: row.get("account_id"),
            amount: parse_decimal(&amount).context("Invalid transaction amount")?,
            created_at: parse_timestamp(&created_at).context("Invalid created_at timestamp")?,
        })
    }
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account> {
        let created_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (holder_name, email, balance, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&account.holder_name)
        .bind(&account.email)
        .bind(account.balance.to_string())
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;

        Ok(account.into_account(result.last_insert_rowid(), created_at))
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    async fn account_exists(&self, id: AccountId) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check account existence")?;
        Ok(count > 0)
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let removed_entries = sqlx::query("DELETE FROM transactions WHERE account_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete account transactions")?
            .rows_affected();

        let removed = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete account")?
            .rows_affected();

        tx.commit().await.context("Failed to commit account deletion")?;

        tracing::debug!(account_id = id, removed_entries, "deleted account rows");
        Ok(removed > 0)
    }

    async fn list_accounts(&self, request: PageRequest) -> Result<Page<Account>> {
        // Count and fetch share one snapshot.
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&mut *tx)
            .await
            .context("Failed to count accounts")?;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM accounts ORDER BY id LIMIT ? OFFSET ?",
            ACCOUNT_COLUMNS
        ))
        .bind(i64::from(request.size()))
        .bind(request.offset() as i64)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to list accounts")?;

        tx.commit().await.context("Failed to finish account listing")?;

        let content = rows
            .iter()
            .map(Self::row_to_account)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(content, request, total as u64))
    }

    async fn list_transactions(
        &self,
        account_id: AccountId,
        request: PageRequest,
    ) -> Result<Page<Transaction>> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE account_id = ?")
            .bind(account_id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to count transactions")?;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM transactions WHERE account_id = ? ORDER BY id LIMIT ? OFFSET ?",
            TRANSACTION_COLUMNS
        ))
        .bind(account_id)
        .bind(i64::from(request.size()))
        .bind(request.offset() as i64)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to list transactions")?;

        tx.commit().await.context("Failed to finish transaction listing")?;

        let content = rows
            .iter()
            .map(Self::row_to_transaction)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(content, request, total as u64))
    }

    async fn begin(&self) -> Result<Box<dyn StoreUnit>> {
        let tx = self.pool.begin().await.context("Failed to begin transaction")?;
        Ok(Box::new(SqliteUnit { tx }))
    }
}

/// A SQLite transaction. Rolled back by sqlx when dropped uncommitted.
pub struct SqliteUnit {
    tx: sqlx::Transaction<'static, Sqlite>,
}

#[async_trait]
impl StoreUnit for SqliteUnit {
    async fn find_account_for_update(&mut self, id: AccountId) -> Result<Option<Account>> {
        // SQLite has no row locks; a no-op write takes the database write
        // lock, which is then held until commit or rollback.
        sqlx::query("UPDATE accounts SET balance = balance WHERE id = ?")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .context("Failed to lock account")?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(SqliteStore::row_to_account).transpose()
    }

    async fn save_account(&mut self, account: &Account) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET holder_name = ?, email = ?, balance = ?
            WHERE id = ?
            "#,
        )
        .bind(&account.holder_name)
        .bind(&account.email)
        .bind(account.balance.to_string())
        .bind(account.id)
        .execute(&mut *self.tx)
        .await
        .context("Failed to save account")?
        .rows_affected();

        if updated != 1 {
            anyhow::bail!("Account {} vanished during update", account.id);
        }
        Ok(())
    }

    async fn insert_transaction(&mut self, transaction: NewTransaction) -> Result<Transaction> {
        let created_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO transactions (account_id, amount, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(transaction.account_id)
        .bind(transaction.amount.to_string())
        .bind(created_at.to_rfc3339())
        .execute(&mut *self.tx)
        .await
        .context("Failed to save transaction")?;

        Ok(transaction.into_transaction(result.last_insert_rowid(), created_at))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }
}

fn parse_decimal(value: &str) -> Result<Decimal> {
    Decimal::from_str(value).with_context(|| format!("Invalid decimal: {}", value))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}
