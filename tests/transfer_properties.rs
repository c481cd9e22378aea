//! Transfer properties against the in-memory store
//!
//! Conservation, ledger symmetry, atomicity under injected faults, freedom
//! from deadlock under opposing concurrent transfers, rejection cases.

mod common;

use std::time::Duration;

use bank_ledger::ledger::{
    ErrorKind, FaultPoint, LedgerError, ListEntriesParams, ListTransfersParams, TransferParams,
};
use common::{memory_ledger, open_account, random_amount};

#[tokio::test]
async fn transfer_scenario_a100_b50_moves_30() {
    let (store, ledger) = memory_ledger();
    let a = open_account(&ledger, 100).await;
    let b = open_account(&ledger, 50).await;

    let result = ledger
        .transfer(TransferParams::new(a.id, b.id, 30))
        .await
        .unwrap();

    assert_eq!(result.transfer.amount, 30);
    assert_eq!(result.from_account.balance, 70);
    assert_eq!(result.to_account.balance, 80);
    assert_eq!(result.from_entry.account_id, a.id);
    assert_eq!(result.from_entry.amount, -30);
    assert_eq!(result.to_entry.account_id, b.id);
    assert_eq!(result.to_entry.amount, 30);

    assert_eq!(ledger.get_account(a.id).await.unwrap().balance, 70);
    assert_eq!(ledger.get_account(b.id).await.unwrap().balance, 80);
    assert!(store.audit().is_empty(), "{:?}", store.audit());
}

#[tokio::test]
async fn transfers_conserve_total_balance() {
    let (store, ledger) = memory_ledger();
    let mut accounts = Vec::new();
    for _ in 0..4 {
        accounts.push(open_account(&ledger, 10_000).await);
    }
    let total: i64 = accounts.iter().map(|a| a.balance).sum();

    for i in 0..40 {
        let from = &accounts[i % 4];
        let to = &accounts[(i * 3 + 1) % 4];
        if from.id == to.id {
            continue;
        }
        ledger
            .transfer(TransferParams::new(from.id, to.id, random_amount()))
            .await
            .unwrap();
    }

    let mut after = 0;
    for a in &accounts {
        after += ledger.get_account(a.id).await.unwrap().balance;
    }
    assert_eq!(after, total);
    assert!(store.audit().is_empty(), "{:?}", store.audit());
}

#[tokio::test]
async fn committed_transfer_has_matching_entry_pair() {
    let (_store, ledger) = memory_ledger();
    let a = open_account(&ledger, 500).await;
    let b = open_account(&ledger, 500).await;
    let amount = random_amount();

    let result = ledger
        .transfer(TransferParams::new(b.id, a.id, amount))
        .await
        .unwrap();

    let debits = ledger
        .list_entries(ListEntriesParams {
            account_id: b.id,
            limit: 10,
            offset: 0,
        })
        .await
        .unwrap();
    let credits = ledger
        .list_entries(ListEntriesParams {
            account_id: a.id,
            limit: 10,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(debits, vec![result.from_entry.clone()]);
    assert_eq!(credits, vec![result.to_entry.clone()]);
    assert_eq!(debits[0].amount + credits[0].amount, 0);

    let fetched = ledger.get_transfer(result.transfer.id).await.unwrap();
    assert_eq!(fetched, result.transfer);

    // Visible from both sides.
    for id in [a.id, b.id] {
        let transfers = ledger
            .list_transfers(ListTransfersParams {
                from_account_id: id,
                to_account_id: id,
                limit: 10,
                offset: 0,
            })
            .await
            .unwrap();
        assert_eq!(transfers, vec![result.transfer.clone()]);
    }
}

#[tokio::test]
async fn failure_after_debit_entry_leaves_no_trace() {
    let (store, ledger) = memory_ledger();
    let a = open_account(&ledger, 100).await;
    let b = open_account(&ledger, 50).await;
    let before = store.counts();

    // Let the debit entry through, fail the credit entry.
    store.inject_fault_after(
        FaultPoint::InsertEntry,
        1,
        LedgerError::Unavailable("connection reset".into()),
    );
    let err = ledger
        .transfer(TransferParams::new(a.id, b.id, 30))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(err.message().starts_with("insert credit entry"), "{}", err);

    assert_eq!(store.counts(), before);
    assert_eq!(ledger.get_account(a.id).await.unwrap().balance, 100);
    assert_eq!(ledger.get_account(b.id).await.unwrap().balance, 50);
    assert!(store.audit().is_empty(), "{:?}", store.audit());
}

#[tokio::test]
async fn failure_between_balance_updates_leaves_no_trace() {
    let (store, ledger) = memory_ledger();
    let a = open_account(&ledger, 100).await;
    let b = open_account(&ledger, 50).await;
    let before = store.counts();

    store.inject_fault_after(
        FaultPoint::AddBalance,
        1,
        LedgerError::Internal("disk full".into()),
    );
    let err = ledger
        .transfer(TransferParams::new(b.id, a.id, 20))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.message().starts_with("update second balance"), "{}", err);

    assert_eq!(store.counts(), before);
    assert_eq!(ledger.get_account(a.id).await.unwrap().balance, 100);
    assert_eq!(ledger.get_account(b.id).await.unwrap().balance, 50);

    // The store is usable again afterwards.
    ledger.transfer(TransferParams::new(b.id, a.id, 20)).await.unwrap();
    assert_eq!(ledger.get_account(a.id).await.unwrap().balance, 120);
    assert!(store.audit().is_empty(), "{:?}", store.audit());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposing_concurrent_transfers_do_not_deadlock() {
    const N: usize = 20;
    const AMOUNT: i64 = 10;

    let (store, ledger) = memory_ledger();
    let a = open_account(&ledger, 1_000).await;
    let b = open_account(&ledger, 1_000).await;
    store.set_lock_delay(Duration::from_millis(2));

    let mut handles = Vec::with_capacity(N);
    for i in 0..N {
        let ledger = ledger.clone();
        let params = if i % 2 == 0 {
            TransferParams::new(a.id, b.id, AMOUNT)
        } else {
            TransferParams::new(b.id, a.id, AMOUNT)
        };
        handles.push(tokio::spawn(async move { ledger.transfer(params).await }));
    }

    let joined = tokio::time::timeout(Duration::from_secs(10), futures::future::join_all(handles))
        .await
        .expect("transfers deadlocked");
    for res in joined {
        res.unwrap().unwrap();
    }

    // Equal numbers in each direction.
    assert_eq!(ledger.get_account(a.id).await.unwrap().balance, 1_000);
    assert_eq!(ledger.get_account(b.id).await.unwrap().balance, 1_000);
    assert_eq!(store.counts().transfers, N);
    assert_eq!(store.counts().entries, 2 * N);
    assert!(store.audit().is_empty(), "{:?}", store.audit());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_one_way_transfers_apply_every_update() {
    const N: i64 = 25;

    let (store, ledger) = memory_ledger();
    let a = open_account(&ledger, 1_000).await;
    let b = open_account(&ledger, 0).await;

    let mut handles = Vec::new();
    for _ in 0..N {
        let ledger = ledger.clone();
        let params = TransferParams::new(a.id, b.id, 4);
        handles.push(tokio::spawn(async move { ledger.transfer(params).await }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    assert_eq!(ledger.get_account(a.id).await.unwrap().balance, 1_000 - 4 * N);
    assert_eq!(ledger.get_account(b.id).await.unwrap().balance, 4 * N);
    assert!(store.audit().is_empty(), "{:?}", store.audit());
}

#[tokio::test]
async fn invalid_transfers_are_rejected_without_side_effects() {
    let (store, ledger) = memory_ledger();
    let a = open_account(&ledger, 100).await;
    let b = open_account(&ledger, 50).await;
    let before = store.counts();

    let cases = [
        (TransferParams::new(a.id, a.id, 10), ErrorKind::InvalidArgument),
        (TransferParams::new(a.id, b.id, 0), ErrorKind::InvalidArgument),
        (TransferParams::new(a.id, b.id, -5), ErrorKind::InvalidArgument),
        (TransferParams::new(a.id, 9_999, 10), ErrorKind::NotFound),
        (TransferParams::new(9_999, b.id, 10), ErrorKind::NotFound),
    ];
    for (params, kind) in cases {
        let err = ledger.transfer(params).await.unwrap_err();
        assert_eq!(err.kind(), kind, "{:?}: {}", params, err);
    }

    assert_eq!(store.counts(), before);
    assert_eq!(ledger.get_account(a.id).await.unwrap().balance, 100);
    assert_eq!(ledger.get_account(b.id).await.unwrap().balance, 50);
}

#[tokio::test]
async fn cancelled_transfer_is_rolled_back() {
    let (store, ledger) = memory_ledger();
    let a = open_account(&ledger, 100).await;
    let b = open_account(&ledger, 50).await;
    store.set_lock_delay(Duration::from_millis(100));

    let (cancel_tx, cancel_rx) = tokio::sync::oneshot::channel::<()>();
    let coordinator = ledger.coordinator().clone();
    let handle = tokio::spawn(async move {
        coordinator
            .execute_transfer_cancellable(TransferParams::new(a.id, b.id, 30), async {
                let _ = cancel_rx.await;
            })
            .await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel_tx.send(()).unwrap();

    let err = handle.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    store.set_lock_delay(Duration::ZERO);
    assert_eq!(store.counts().transfers, 0);
    assert_eq!(ledger.get_account(a.id).await.unwrap().balance, 100);
    assert_eq!(ledger.get_account(b.id).await.unwrap().balance, 50);
}
