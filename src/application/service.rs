use rust_decimal::Decimal;

use crate::domain::{
    Account, AccountId, NewAccount, NewTransaction, Page, PageRequest, Transaction,
    TransferReceipt,
};
use crate::storage::{InMemoryStore, LedgerStoreBox, SqliteStore, StoreConfig};

use super::AppError;

/// Application service providing the account and transfer operations.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct LedgerService {
    store: LedgerStoreBox,
}

impl LedgerService {
    /// Create a new ledger service over the given store.
    pub fn new(store: LedgerStoreBox) -> Self {
        Self { store }
    }

    /// Initialize a new SQLite database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        Self::init_with(&StoreConfig::for_path(database_path)).await
    }

    /// Initialize (create and migrate) the database described by `config`.
    pub async fn init_with(config: &StoreConfig) -> Result<Self, AppError> {
        let store = SqliteStore::init(config).await?;
        Ok(Self::new(Box::new(store)))
    }

    /// Connect to an existing SQLite database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        Self::connect_with(&StoreConfig::for_path(database_path)).await
    }

    pub async fn connect_with(config: &StoreConfig) -> Result<Self, AppError> {
        let store = SqliteStore::connect(config).await?;
        Ok(Self::new(Box::new(store)))
    }

    /// A service backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Box::new(InMemoryStore::new()))
    }

    // ========================
    // Account operations
    // ========================

    /// Create a new account. The opening balance is stored as given.
    pub async fn create_account(&self, account: NewAccount) -> Result<Account, AppError> {
        let account = self.store.insert_account(account).await?;
        tracing::info!(
            account_id = account.id,
            balance = %account.balance,
            "account created"
        );
        Ok(account)
    }

    /// Get an account by id.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.store
            .find_account(id)
            .await?
            .ok_or(AppError::AccountNotFound(id))
    }

    /// List accounts in storage order, one page at a time.
    pub async fn list_accounts(&self, page: u32, size: u32) -> Result<Page<Account>, AppError> {
        let request = PageRequest::new(page, size)?;
        Ok(self.store.list_accounts(request).await?)
    }

    /// Delete an account and its transaction history.
    pub async fn delete_account(&self, id: AccountId) -> Result<(), AppError> {
        if !self.store.account_exists(id).await? {
            return Err(AppError::AccountNotFound(id));
        }
        // A concurrent delete may have won the race since the check.
        if !self.store.delete_account(id).await? {
            return Err(AppError::AccountNotFound(id));
        }
        tracing::info!(account_id = id, "account deleted");
        Ok(())
    }

    /// Get the current balance of an account.
    pub async fn get_account_balance(&self, id: AccountId) -> Result<Decimal, AppError> {
        Ok(self.get_account(id).await?.balance)
    }

    /// Get one page of an account's transaction history, oldest first.
    pub async fn get_account_transactions(
        &self,
        id: AccountId,
        page: u32,
        size: u32,
    ) -> Result<Page<Transaction>, AppError> {
        if !self.store.account_exists(id).await? {
            return Err(AppError::AccountNotFound(id));
        }
        let request = PageRequest::new(page, size)?;
        Ok(self.store.list_transactions(id, request).await?)
    }

    // ========================
    // Transfer operations
    // ========================

    /// Move `amount` from one account to another.
    ///
    /// Both balance updates and the debit/credit entry pair are written in a
    /// single store unit of work, so either all four writes land or none do.
    /// Concurrent transfers touching the same account are serialized by the
    /// store, and the funds check always sees the latest committed balance.
    pub async fn transfer(
        &self,
        from_id: AccountId,
        to_id: AccountId,
        amount: Decimal,
    ) -> Result<TransferReceipt, AppError> {
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidAmount(format!(
                "transfer amount must be positive, got {}",
                amount
            )));
        }
        if from_id == to_id {
            return Err(AppError::SameAccount(from_id));
        }

        let mut unit = self.store.begin().await?;

        let mut from = unit
            .find_account_for_update(from_id)
            .await?
            .ok_or(AppError::AccountNotFound(from_id))?;
        let mut to = unit
            .find_account_for_update(to_id)
            .await?
            .ok_or(AppError::AccountNotFound(to_id))?;

        if !from.covers(amount) {
            tracing::warn!(
                account_id = from_id,
                balance = %from.balance,
                requested = %amount,
                "transfer rejected: insufficient funds"
            );
            return Err(AppError::InsufficientFunds {
                account_id: from_id,
                balance: from.balance,
                requested: amount,
            });
        }

        from.debit(amount).ok_or(AppError::AmountOverflow(from_id))?;
        to.credit(amount).ok_or(AppError::AmountOverflow(to_id))?;

        unit.save_account(&from).await?;
        unit.save_account(&to).await?;

        let debit = unit
            .insert_transaction(NewTransaction::debit(from_id, amount))
            .await?;
        let credit = unit
            .insert_transaction(NewTransaction::credit(to_id, amount))
            .await?;

        unit.commit().await?;

        tracing::info!(
            from = from_id,
            to = to_id,
            amount = %amount,
            "transfer committed"
        );
        Ok(TransferReceipt { debit, credit })
    }
}
