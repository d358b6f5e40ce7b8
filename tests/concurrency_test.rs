mod common;

use std::sync::Arc;

use anyhow::Result;
use coffer::application::{AppError, LedgerService};
use common::{backends, open_account};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::task::JoinSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_never_overdraw() -> Result<()> {
    for backend in backends().await? {
        let name = backend.name;
        let service = Arc::new(backend.service);
        let source = open_account(&service, "Source", dec!(50)).await?;
        let sink = open_account(&service, "Sink", dec!(0)).await?;

        let (from, to) = (source.id, sink.id);

        let mut tasks = JoinSet::new();
        for _ in 0..10 {
            let service = Arc::clone(&service);
            tasks.spawn(async move { service.transfer(from, to, dec!(10)).await });
        }

        let mut succeeded = 0;
        let mut rejected = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined? {
                Ok(_) => succeeded += 1,
                Err(AppError::InsufficientFunds { .. }) => rejected += 1,
                Err(other) => panic!("{}: unexpected transfer error: {:?}", name, other),
            }
        }

        assert_eq!(succeeded, 5, "{}", name);
        assert_eq!(rejected, 5, "{}", name);
        assert_eq!(service.get_account_balance(source.id).await?, Decimal::ZERO);
        assert_eq!(service.get_account_balance(sink.id).await?, dec!(50));
        assert_eq!(
            service.get_account_transactions(source.id, 0, 50).await?.total_elements,
            5
        );
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_conserve_total() -> Result<()> {
    for backend in backends().await? {
        let name = backend.name;
        let service = Arc::new(backend.service);
        let mut ids = Vec::new();
        for holder in ["A", "B", "C"] {
            ids.push(open_account(&service, holder, dec!(100.00)).await?.id);
        }

        let mut tasks = JoinSet::new();
        for i in 0..30 {
            let service = Arc::clone(&service);
            let from = ids[i % 3];
            let to = ids[(i + 1) % 3];
            let amount = Decimal::new(i as i64 + 1, 1);
            tasks.spawn(async move { service.transfer(from, to, amount).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined??;
        }

        let mut total = Decimal::ZERO;
        let mut entries = 0;
        for id in &ids {
            total += service.get_account_balance(*id).await?;
            let history = service.get_account_transactions(*id, 0, 100).await?;
            entries += history.total_elements;
            let net: Decimal = history.content.iter().map(|tx| tx.amount).sum();
            assert_eq!(
                service.get_account_balance(*id).await?,
                dec!(100.00) + net,
                "{}: balance must equal opening balance plus history",
                name
            );
        }

        assert_eq!(total, dec!(300.00), "{}", name);
        assert_eq!(entries, 60, "{}", name);
    }
    Ok(())
}
