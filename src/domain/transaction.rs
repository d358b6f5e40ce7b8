use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::AccountId;

pub type TransactionId = i64;

/// A signed ledger entry on a single account. Entries are written once, as
/// one half of a transfer, and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Owning account
    pub account_id: AccountId,
    /// Negative for a debit, positive for a credit
    pub amount: Decimal,
    /// Server time at which the entry was persisted
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_debit(&self) -> bool {
        self.amount.is_sign_negative()
    }

    pub fn is_credit(&self) -> bool {
        !self.is_debit()
    }
}

/// An entry waiting to be persisted. The store assigns id and timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub amount: Decimal,
}

impl NewTransaction {
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            amount: -amount,
        }
    }

    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self { account_id, amount }
    }

    pub fn into_transaction(self, id: TransactionId, created_at: DateTime<Utc>) -> Transaction {
        Transaction {
            id,
            account_id: self.account_id,
            amount: self.amount,
            created_at,
        }
    }
}

/// The matched entry pair written by a successful transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReceipt {
    pub debit: Transaction,
    pub credit: Transaction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_debit_and_credit_are_inverses() {
        let debit = NewTransaction::debit(1, dec!(30.00));
        let credit = NewTransaction::credit(2, dec!(30.00));

        assert_eq!(debit.amount, dec!(-30.00));
        assert_eq!(credit.amount, dec!(30.00));
        assert_eq!(debit.amount + credit.amount, Decimal::ZERO);
    }

    #[test]
    fn test_entry_direction() {
        let now = Utc::now();
        let debit = NewTransaction::debit(1, dec!(5)).into_transaction(1, now);
        let credit = NewTransaction::credit(2, dec!(5)).into_transaction(2, now);

        assert!(debit.is_debit());
        assert!(!debit.is_credit());
        assert!(credit.is_credit());
        assert_eq!(debit.account_id, 1);
        assert_eq!(credit.account_id, 2);
    }
}
