use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type AccountId = i64;

/// Caller-supplied fields for a new account. Identity and creation time are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub holder_name: String,
    pub email: Option<String>,
    /// Opening balance. Any sign is accepted.
    pub balance: Decimal,
}

impl NewAccount {
    pub fn new(holder_name: impl Into<String>, balance: Decimal) -> Self {
        Self {
            holder_name: holder_name.into(),
            email: None,
            balance,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Materialize the stored account once the store has assigned an id.
    pub fn into_account(self, id: AccountId, created_at: DateTime<Utc>) -> Account {
        Account {
            id,
            holder_name: self.holder_name,
            email: self.email,
            balance: self.balance,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub holder_name: String,
    pub email: Option<String>,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Returns true if the balance covers `amount` without going below zero.
    pub fn covers(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }

    /// Subtract `amount` from the balance. Returns `None` on decimal overflow,
    /// leaving the balance untouched. Does not check for sufficient funds.
    pub fn debit(&mut self, amount: Decimal) -> Option<()> {
        self.balance = self.balance.checked_sub(amount)?;
        Some(())
    }

    /// Add `amount` to the balance. Returns `None` on decimal overflow.
    pub fn credit(&mut self, amount: Decimal) -> Option<()> {
        self.balance = self.balance.checked_add(amount)?;
        Some(())
    }
}
