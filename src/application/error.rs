use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{AccountId, PageRequestError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found with id: {0}")]
    AccountNotFound(AccountId),

    #[error("Insufficient funds in account with id: {account_id}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: Decimal,
        requested: Decimal,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Cannot transfer from account {0} to itself")]
    SameAccount(AccountId),

    #[error("Invalid page request: {0}")]
    InvalidPage(#[from] PageRequestError),

    #[error("Balance of account {0} would overflow")]
    AmountOverflow(AccountId),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Coarse outcome classes a request layer maps onto its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A referenced account does not exist.
    NotFound,
    /// The request was understood but refused by a ledger rule.
    Rejected,
    /// Storage or other unexpected failure.
    Internal,
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::AccountNotFound(_) => ErrorCategory::NotFound,
            AppError::InsufficientFunds { .. }
            | AppError::InvalidAmount(_)
            | AppError::SameAccount(_)
            | AppError::InvalidPage(_)
            | AppError::AmountOverflow(_) => ErrorCategory::Rejected,
            AppError::Storage(_) => ErrorCategory::Internal,
        }
    }
}
