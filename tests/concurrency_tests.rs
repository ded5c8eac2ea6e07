use ledger::error::ErrorKind;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_alternating_transfers_net_to_zero() {
    let ledger = common::ledger_with(&[(1, dec!(100.00)), (2, dec!(100.00))]).await;

    let mut handles = Vec::new();
    for i in 0..100 {
        let ledger = ledger.clone();
        let (source, destination) = if i % 2 == 0 { (1, 2) } else { (2, 1) };
        handles.push(tokio::spawn(async move {
            ledger.transfer(source, destination, dec!(1.00)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(common::balance_of(&ledger, 1).await, dec!(100.00));
    assert_eq!(common::balance_of(&ledger, 2).await, dec!(100.00));
    assert_eq!(ledger.transfer_log().await.unwrap().len(), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_inverted_pairs_never_deadlock() {
    let ledger = common::ledger_with(&[(1, dec!(1000)), (2, dec!(1000))]).await;

    let run = async {
        let mut handles = Vec::new();
        for i in 0..500 {
            let ledger = ledger.clone();
            let (source, destination) = if i % 2 == 0 { (1, 2) } else { (2, 1) };
            handles.push(tokio::spawn(async move {
                ledger.transfer(source, destination, dec!(3.00)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    };
    tokio::time::timeout(Duration::from_secs(30), run)
        .await
        .expect("transfers deadlocked");

    assert_eq!(common::total_balance(&ledger).await, dec!(2000));
    assert_eq!(ledger.transfer_log().await.unwrap().len(), 500);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_random_workload_conserves_money() {
    let accounts: Vec<(i64, Decimal)> = (1..=6).map(|id| (id, dec!(25.00))).collect();
    let ledger = common::ledger_with(&accounts).await;

    let plan: Vec<(i64, i64, Decimal)> = {
        let mut rng = rand::thread_rng();
        (0..400)
            .map(|_| {
                let source = rng.gen_range(1..=6);
                let mut destination = rng.gen_range(1..=6);
                if destination == source {
                    destination = source % 6 + 1;
                }
                let cents: i64 = rng.gen_range(1..=1500);
                (source, destination, Decimal::new(cents, 2))
            })
            .collect()
    };

    let mut handles = Vec::new();
    for (source, destination, amount) in plan {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.transfer(source, destination, amount).await
        }));
    }

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::InsufficientFunds),
        }
    }

    assert_eq!(common::total_balance(&ledger).await, dec!(150.00));
    for account in ledger.accounts().await.unwrap() {
        assert!(account.balance.value() >= Decimal::ZERO);
    }
    assert_eq!(ledger.transfer_log().await.unwrap().len(), committed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_half_a_transfer() {
    let ledger = common::ledger_with(&[(1, dec!(500)), (2, dec!(500))]).await;

    let writer = {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            for i in 0..300 {
                let (source, destination) = if i % 3 == 0 { (2, 1) } else { (1, 2) };
                let _ = ledger.transfer(source, destination, dec!(2.50)).await;
            }
        })
    };

    while !writer.is_finished() {
        let accounts = ledger.accounts().await.unwrap();
        let total: Decimal = accounts.iter().map(|a| a.balance.value()).sum();
        assert_eq!(total, dec!(1000));
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_disjoint_pairs_progress_while_another_pair_is_busy() {
    let ledger = common::ledger_with(&[
        (1, dec!(100)),
        (2, dec!(100)),
        (3, dec!(100)),
        (4, dec!(100)),
    ])
    .await;

    let mut handles = Vec::new();
    for i in 0..200 {
        let ledger = ledger.clone();
        let (source, destination) = match i % 4 {
            0 => (1, 2),
            1 => (2, 1),
            2 => (3, 4),
            _ => (4, 3),
        };
        handles.push(tokio::spawn(async move {
            ledger.transfer(source, destination, dec!(0.25)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(
        common::balance_of(&ledger, 1).await + common::balance_of(&ledger, 2).await,
        dec!(200)
    );
    assert_eq!(
        common::balance_of(&ledger, 3).await + common::balance_of(&ledger, 4).await,
        dec!(200)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_creation_has_one_winner() {
    let ledger = common::ledger_with(&[]).await;

    let mut handles = Vec::new();
    for i in 0..20 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.create_account(42, Decimal::new(i, 0)).await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::DuplicateAccount),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(ledger.accounts().await.unwrap().len(), 1);
}
