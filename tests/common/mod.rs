// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use coffer::application::LedgerService;
use coffer::domain::{Account, NewAccount};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// A service plus whatever must outlive it.
pub struct Backend {
    pub name: &'static str,
    pub service: LedgerService,
    _temp: Option<TempDir>,
}

/// One service per store implementation, so a test can assert the same
/// behavior against each.
pub async fn backends() -> Result<Vec<Backend>> {
    let (sqlite, temp) = test_service().await?;
    Ok(vec![
        Backend {
            name: "sqlite",
            service: sqlite,
            _temp: Some(temp),
        },
        Backend {
            name: "memory",
            service: LedgerService::in_memory(),
            _temp: None,
        },
    ])
}

pub async fn open_account(service: &LedgerService, holder: &str, balance: Decimal) -> Result<Account> {
    Ok(service.create_account(NewAccount::new(holder, balance)).await?)
}

/// Test fixture: the two accounts used throughout the transfer scenarios
pub struct StandardAccounts {
    pub x: Account,
    pub y: Account,
}

impl StandardAccounts {
    /// X holds 100.00, Y holds 50.00
    pub async fn create(service: &LedgerService) -> Result<Self> {
        let x = open_account(service, "Xavier", dec!(100.00)).await?;
        let y = open_account(service, "Yvonne", dec!(50.00)).await?;
        Ok(Self { x, y })
    }
}
