//! Property-based tests for account balance consistency.
//!
//! Property 1: an account's balance always equals the signed sum of its
//! transaction log, whatever sequence of postings was attempted.

use billfold_shared::types::UserId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::service::AccountLedger;
use super::types::{AccountKind, Category, PostTransactionInput, TransactionType};
use super::{replay_balance, verify_balance};
use crate::error::LedgerError;
use crate::store::InMemoryStore;

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    // 0.01 to 10,000.00
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn posting_strategy() -> impl Strategy<Value = (TransactionType, Decimal)> {
    (
        prop_oneof![Just(TransactionType::Income), Just(TransactionType::Expense)],
        positive_amount(),
    )
}

fn input(transaction_type: TransactionType, amount: Decimal) -> PostTransactionInput {
    let category = match transaction_type {
        TransactionType::Income => Category::Sale,
        _ => Category::Expense,
    };
    PostTransactionInput {
        transaction_type,
        amount,
        description: "generated".to_string(),
        category,
        related_document: None,
        reference: None,
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 1.1: Balance equals the replayed log after any posting sequence.
    ///
    /// *For any* sequence of income/expense postings on a fresh account, the
    /// stored balance SHALL equal the signed sum of the committed transactions,
    /// and rejected expenses SHALL be exactly those exceeding the balance.
    #[test]
    fn prop_balance_matches_log(postings in prop::collection::vec(posting_strategy(), 1..30)) {
        let rt = runtime();
        rt.block_on(async {
            let ledger = AccountLedger::new(InMemoryStore::new());
            let owner = UserId::new();
            ledger.initialize(owner, AccountKind::Cash, None).await.unwrap();

            let mut expected = Decimal::ZERO;
            for (transaction_type, amount) in postings {
                let result = ledger
                    .post_transaction(owner, AccountKind::Cash, input(transaction_type, amount))
                    .await;
                match (transaction_type, result) {
                    (TransactionType::Income, Ok(_)) => expected += amount,
                    (TransactionType::Expense, Ok(_)) => {
                        prop_assert!(amount <= expected);
                        expected -= amount;
                    }
                    (TransactionType::Expense, Err(LedgerError::InsufficientFunds { available, .. })) => {
                        prop_assert!(amount > expected);
                        prop_assert_eq!(available, expected);
                    }
                    (_, other) => prop_assert!(false, "unexpected result {:?}", other),
                }
            }

            let statement = ledger.statement(owner, AccountKind::Cash).await.unwrap();
            prop_assert_eq!(statement.account.balance, expected);
            prop_assert_eq!(replay_balance(&statement.transactions), expected);
            prop_assert!(verify_balance(&statement.account, &statement.transactions).is_ok());
            prop_assert!(statement.account.balance >= Decimal::ZERO);
            Ok(())
        })?;
    }

    /// Property 1.2: Replay is order independent.
    ///
    /// *For any* log, replaying it reversed SHALL give the same balance.
    #[test]
    fn prop_replay_order_independent(postings in prop::collection::vec(posting_strategy(), 0..30)) {
        let rt = runtime();
        let log = rt.block_on(async {
            let ledger = AccountLedger::new(InMemoryStore::new());
            let owner = UserId::new();
            ledger.initialize(owner, AccountKind::Cash, None).await.unwrap();
            for (transaction_type, amount) in postings {
                let _ = ledger
                    .post_transaction(owner, AccountKind::Cash, input(transaction_type, amount))
                    .await;
            }
            ledger.statement(owner, AccountKind::Cash).await.unwrap().transactions
        });

        let forward = replay_balance(&log);
        let backward = replay_balance(log.iter().rev());
        prop_assert_eq!(forward, backward);
    }
}
