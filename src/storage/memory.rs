use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{
    Account, AccountId, NewAccount, NewTransaction, Page, PageRequest, Transaction, TransactionId,
};

use super::{LedgerStore, StoreUnit};

#[derive(Debug, Default)]
struct MemoryState {
    accounts: BTreeMap<AccountId, Account>,
    /// Kept in insertion order, which is also id order.
    transactions: Vec<Transaction>,
    last_account_id: AccountId,
    last_transaction_id: TransactionId,
}

/// A thread-safe in-memory store for accounts and transactions.
///
/// A single mutex guards all state. An open [`StoreUnit`] holds it, so units
/// run one at a time. Ideal for testing or embedding where persistence is not
/// required.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account> {
        let mut state = self.state.lock().await;
        state.last_account_id += 1;
        let account = account.into_account(state.last_account_id, Utc::now());
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state.accounts.get(&id).cloned())
    }

    async fn account_exists(&self, id: AccountId) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state.accounts.contains_key(&id))
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.accounts.remove(&id).is_none() {
            return Ok(false);
        }
        state.transactions.retain(|tx| tx.account_id != id);
        Ok(true)
    }

    async fn list_accounts(&self, request: PageRequest) -> Result<Page<Account>> {
        let state = self.state.lock().await;
        let content = state
            .accounts
            .values()
            .skip(request.offset() as usize)
            .take(request.size() as usize)
            .cloned()
            .collect();
        Ok(Page::new(content, request, state.accounts.len() as u64))
    }

    async fn list_transactions(
        &self,
        account_id: AccountId,
        request: PageRequest,
    ) -> Result<Page<Transaction>> {
        let state = self.state.lock().await;
        let owned: Vec<&Transaction> = state
            .transactions
            .iter()
            .filter(|tx| tx.account_id == account_id)
            .collect();
        let content = request.slice(&owned).iter().map(|tx| (*tx).clone()).collect();
        Ok(Page::new(content, request, owned.len() as u64))
    }

    async fn begin(&self) -> Result<Box<dyn StoreUnit>> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryUnit {
            state: guard,
            staged_accounts: BTreeMap::new(),
            staged_transactions: Vec::new(),
        }))
    }
}

/// Holds the store lock and buffers writes until commit.
pub struct MemoryUnit {
    state: OwnedMutexGuard<MemoryState>,
    staged_accounts: BTreeMap<AccountId, Account>,
    staged_transactions: Vec<Transaction>,
}

#[async_trait]
impl StoreUnit for MemoryUnit {
    async fn find_account_for_update(&mut self, id: AccountId) -> Result<Option<Account>> {
        Ok(self
            .staged_accounts
            .get(&id)
            .or_else(|| self.state.accounts.get(&id))
            .cloned())
    }

    async fn save_account(&mut self, account: &Account) -> Result<()> {
        if !self.state.accounts.contains_key(&account.id) {
            anyhow::bail!("Account {} vanished during update", account.id);
        }
        self.staged_accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn insert_transaction(&mut self, transaction: NewTransaction) -> Result<Transaction> {
        let id = self.state.last_transaction_id + self.staged_transactions.len() as i64 + 1;
        let transaction = transaction.into_transaction(id, Utc::now());
        self.staged_transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryUnit {
            mut state,
            staged_accounts,
            staged_transactions,
        } = *self;

        state.accounts.extend(staged_accounts);
        if let Some(last) = staged_transactions.last() {
            state.last_transaction_id = last.id;
        }
        state.transactions.extend(staged_transactions);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_in_memory_account_store() {
        let store = InMemoryStore::new();
        let account = store
            .insert_account(NewAccount::new("Alan", dec!(100.0)))
            .await
            .unwrap();

        assert_eq!(account.id, 1);
        let retrieved = store.find_account(1).await.unwrap().unwrap();
        assert_eq!(retrieved, account);

        assert!(store.find_account(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unit_is_invisible_until_commit() {
        let store = InMemoryStore::new();
        let account = store
            .insert_account(NewAccount::new("Alan", dec!(10)))
            .await
            .unwrap();

        let mut unit = store.begin().await.unwrap();
        let mut locked = unit.find_account_for_update(account.id).await.unwrap().unwrap();
        locked.balance = dec!(4);
        unit.save_account(&locked).await.unwrap();
        let staged = unit.find_account_for_update(account.id).await.unwrap().unwrap();
        assert_eq!(staged.balance, dec!(4));
        drop(unit);

        let fetched = store.find_account(account.id).await.unwrap().unwrap();
        assert_eq!(fetched.balance, dec!(10));
    }

    #[tokio::test]
    async fn test_commit_assigns_sequential_ids() {
        let store = InMemoryStore::new();
        let a = store.insert_account(NewAccount::new("A", dec!(1))).await.unwrap();
        let b = store.insert_account(NewAccount::new("B", dec!(1))).await.unwrap();

        for _ in 0..2 {
            let mut unit = store.begin().await.unwrap();
            unit.insert_transaction(NewTransaction::debit(a.id, dec!(1)))
                .await
                .unwrap();
            unit.insert_transaction(NewTransaction::credit(b.id, dec!(1)))
                .await
                .unwrap();
            unit.commit().await.unwrap();
        }

        let page = PageRequest::new(0, 10).unwrap();
        let ids: Vec<_> = store
            .list_transactions(a.id, page)
            .await
            .unwrap()
            .content
            .iter()
            .map(|tx| tx.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_delete_removes_owned_transactions() {
        let store = InMemoryStore::new();
        let a = store.insert_account(NewAccount::new("A", dec!(1))).await.unwrap();
        let b = store.insert_account(NewAccount::new("B", dec!(1))).await.unwrap();

        let mut unit = store.begin().await.unwrap();
        unit.insert_transaction(NewTransaction::debit(a.id, dec!(1)))
            .await
            .unwrap();
        unit.insert_transaction(NewTransaction::credit(b.id, dec!(1)))
            .await
            .unwrap();
        unit.commit().await.unwrap();

        assert!(store.delete_account(a.id).await.unwrap());
        assert!(!store.delete_account(a.id).await.unwrap());

        let page = PageRequest::new(0, 10).unwrap();
        assert!(store.list_transactions(a.id, page).await.unwrap().is_empty());
        assert_eq!(store.list_transactions(b.id, page).await.unwrap().total_elements, 1);
    }
}
