//! Account ledger service scenarios against the in-memory store.

use billfold_shared::types::UserId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::*;
use crate::error::LedgerError;
use crate::store::InMemoryStore;

fn ledger() -> AccountLedger<InMemoryStore> {
    AccountLedger::new(InMemoryStore::new())
}

fn entry(transaction_type: TransactionType, amount: Decimal, category: Category) -> PostTransactionInput {
    PostTransactionInput {
        transaction_type,
        amount,
        description: format!("{category:?}"),
        category,
        related_document: None,
        reference: None,
    }
}

async fn funded(ledger: &AccountLedger<InMemoryStore>, owner: UserId, cash: Decimal) {
    ledger.ensure_accounts(owner).await.unwrap();
    if cash > Decimal::ZERO {
        ledger
            .post_transaction(
                owner,
                AccountKind::Cash,
                entry(TransactionType::Income, cash, Category::Sale),
            )
            .await
            .unwrap();
    }
}

// ========== initialize ==========

#[tokio::test]
async fn test_initialize_creates_zero_balance_account() {
    let ledger = ledger();
    let owner = UserId::new();

    let account = ledger.initialize(owner, AccountKind::Cash, None).await.unwrap();
    assert_eq!(account.balance, Decimal::ZERO);
    assert_eq!(account.owner, owner);
    assert!(account.bank.is_none());
}

#[tokio::test]
async fn test_initialize_twice_fails_already_exists() {
    let ledger = ledger();
    let owner = UserId::new();

    ledger.initialize(owner, AccountKind::Bank, None).await.unwrap();
    let result = ledger.initialize(owner, AccountKind::Bank, None).await;
    assert!(matches!(result, Err(LedgerError::AlreadyExists(_))));

    // A different user is unaffected.
    assert!(ledger.initialize(UserId::new(), AccountKind::Bank, None).await.is_ok());
}

#[tokio::test]
async fn test_ensure_accounts_is_idempotent() {
    let ledger = ledger();
    let owner = UserId::new();

    let (cash, bank) = ledger.ensure_accounts(owner).await.unwrap();
    let (cash_again, bank_again) = ledger.ensure_accounts(owner).await.unwrap();
    assert_eq!(cash.id, cash_again.id);
    assert_eq!(bank.id, bank_again.id);
    assert_eq!(bank.bank.unwrap().bank_name, types::DEFAULT_BANK_NAME);
}

#[tokio::test]
async fn test_concurrent_first_ensure_accounts_agree() {
    let ledger = ledger();
    let owner = UserId::new();

    let results =
        futures::future::join_all((0..4).map(|_| ledger.ensure_accounts(owner))).await;
    let accounts: Vec<(Account, Account)> = results.into_iter().map(Result::unwrap).collect();
    assert!(accounts.iter().all(|(cash, bank)| {
        cash.id == accounts[0].0.id && bank.id == accounts[0].1.id
    }));
}

#[tokio::test]
async fn test_statement_of_missing_account_is_not_found() {
    let result = ledger().statement(UserId::new(), AccountKind::Cash).await;
    assert!(matches!(result, Err(LedgerError::AccountNotFound { .. })));
}

// ========== post_transaction ==========

#[tokio::test]
async fn test_income_then_expense_scenario() {
    let ledger = ledger();
    let owner = UserId::new();
    ledger.initialize(owner, AccountKind::Cash, None).await.unwrap();

    ledger
        .post_transaction(
            owner,
            AccountKind::Cash,
            entry(TransactionType::Income, dec!(1000), Category::Sale),
        )
        .await
        .unwrap();
    let posting = ledger
        .post_transaction(
            owner,
            AccountKind::Cash,
            entry(TransactionType::Expense, dec!(400), Category::Expense),
        )
        .await
        .unwrap();
    assert_eq!(posting.account.balance, dec!(600));

    let statement = ledger.statement(owner, AccountKind::Cash).await.unwrap();
    assert_eq!(statement.account.balance, dec!(600));
    assert_eq!(statement.transactions.len(), 2);
    assert_eq!(statement.transactions[0].transaction_type, TransactionType::Income);
    assert!(verify_balance(&statement.account, &statement.transactions).is_ok());
}

#[tokio::test]
async fn test_expense_above_balance_leaves_state_unchanged() {
    let ledger = ledger();
    let owner = UserId::new();
    funded(&ledger, owner, dec!(100)).await;
    let before = ledger.statement(owner, AccountKind::Cash).await.unwrap();

    let result = ledger
        .post_transaction(
            owner,
            AccountKind::Cash,
            entry(TransactionType::Expense, dec!(100.01), Category::Expense),
        )
        .await;
    match result {
        Err(LedgerError::InsufficientFunds {
            available,
            requested,
        }) => {
            assert_eq!(available, dec!(100));
            assert_eq!(requested, dec!(100.01));
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }

    let after = ledger.statement(owner, AccountKind::Cash).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_expense_equal_to_balance_is_allowed() {
    let ledger = ledger();
    let owner = UserId::new();
    funded(&ledger, owner, dec!(250)).await;

    let posting = ledger
        .post_transaction(
            owner,
            AccountKind::Cash,
            entry(TransactionType::Expense, dec!(250), Category::Purchase),
        )
        .await
        .unwrap();
    assert_eq!(posting.account.balance, Decimal::ZERO);
}

#[tokio::test]
async fn test_posting_to_missing_account_fails() {
    let result = ledger()
        .post_transaction(
            UserId::new(),
            AccountKind::Bank,
            entry(TransactionType::Income, dec!(10), Category::Deposit),
        )
        .await;
    assert!(matches!(
        result,
        Err(LedgerError::AccountNotFound {
            kind: AccountKind::Bank,
            ..
        })
    ));
}

#[tokio::test]
async fn test_invalid_posting_rejected_before_mutation() {
    let ledger = ledger();
    let owner = UserId::new();
    funded(&ledger, owner, dec!(50)).await;

    let result = ledger
        .post_transaction(
            owner,
            AccountKind::Cash,
            entry(TransactionType::Income, dec!(10), Category::CustomerCollection),
        )
        .await;
    assert!(matches!(result, Err(LedgerError::Validation(_))));

    let statement = ledger.statement(owner, AccountKind::Cash).await.unwrap();
    assert_eq!(statement.transactions.len(), 1);
    assert_eq!(statement.account.balance, dec!(50));
}

#[tokio::test]
async fn test_out_of_range_income_rejected_without_panic() {
    let ledger = ledger();
    let owner = UserId::new();
    funded(&ledger, owner, dec!(1)).await;

    for amount in [Decimal::MAX, validation::MAX_AMOUNT + dec!(1)] {
        let result = ledger
            .post_transaction(
                owner,
                AccountKind::Cash,
                entry(TransactionType::Income, amount, Category::Sale),
            )
            .await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    let statement = ledger.statement(owner, AccountKind::Cash).await.unwrap();
    assert_eq!(statement.account.balance, dec!(1));
}

// ========== transfer ==========

#[tokio::test]
async fn test_transfer_scenario() {
    let ledger = ledger();
    let owner = UserId::new();
    funded(&ledger, owner, dec!(1000)).await;

    let receipt = ledger
        .transfer(
            owner,
            TransferInput {
                from: AccountKind::Cash,
                to: AccountKind::Bank,
                amount: dec!(300),
                description: "Deposit takings".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(receipt.from.account.balance, dec!(700));
    assert_eq!(receipt.to.account.balance, dec!(300));

    let expected = Some(RelatedDocument::transfer(receipt.transfer_id));
    assert_eq!(receipt.from.transaction.related_document, expected);
    assert_eq!(receipt.to.transaction.related_document, expected);
    assert_eq!(receipt.from.transaction.transaction_type, TransactionType::Expense);
    assert_eq!(receipt.to.transaction.transaction_type, TransactionType::Income);
    assert_eq!(receipt.from.transaction.category, Category::BankTransfer);
    assert_eq!(receipt.to.transaction.category, Category::CashTransfer);

    let cash = ledger.statement(owner, AccountKind::Cash).await.unwrap();
    let bank = ledger.statement(owner, AccountKind::Bank).await.unwrap();
    assert_eq!(cash.account.balance, dec!(700));
    assert_eq!(bank.account.balance, dec!(300));
    assert_eq!(bank.transactions.len(), 1);
}

#[tokio::test]
async fn test_transfer_with_insufficient_funds_changes_nothing() {
    let ledger = ledger();
    let owner = UserId::new();
    funded(&ledger, owner, dec!(100)).await;
    let cash_before = ledger.statement(owner, AccountKind::Cash).await.unwrap();
    let bank_before = ledger.statement(owner, AccountKind::Bank).await.unwrap();

    let result = ledger
        .transfer(
            owner,
            TransferInput {
                from: AccountKind::Cash,
                to: AccountKind::Bank,
                amount: dec!(300),
                description: "Too much".to_string(),
            },
        )
        .await;
    assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));

    assert_eq!(ledger.statement(owner, AccountKind::Cash).await.unwrap(), cash_before);
    assert_eq!(ledger.statement(owner, AccountKind::Bank).await.unwrap(), bank_before);
}

#[tokio::test]
async fn test_transfer_without_destination_account_changes_nothing() {
    let ledger = ledger();
    let owner = UserId::new();
    ledger.initialize(owner, AccountKind::Bank, None).await.unwrap();
    ledger
        .post_transaction(
            owner,
            AccountKind::Bank,
            entry(TransactionType::Income, dec!(500), Category::Deposit),
        )
        .await
        .unwrap();

    let result = ledger
        .transfer(
            owner,
            TransferInput {
                from: AccountKind::Bank,
                to: AccountKind::Cash,
                amount: dec!(200),
                description: "Withdraw".to_string(),
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(LedgerError::AccountNotFound {
            kind: AccountKind::Cash,
            ..
        })
    ));

    let bank = ledger.statement(owner, AccountKind::Bank).await.unwrap();
    assert_eq!(bank.account.balance, dec!(500));
    assert_eq!(bank.transactions.len(), 1);
}

#[tokio::test]
async fn test_concurrent_expenses_never_overdraw() {
    let ledger = ledger();
    let owner = UserId::new();
    funded(&ledger, owner, dec!(1000)).await;

    let attempts = (0..20).map(|_| {
        ledger.post_transaction(
            owner,
            AccountKind::Cash,
            entry(TransactionType::Expense, dec!(75), Category::Expense),
        )
    });
    let results = futures::future::join_all(attempts).await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 13);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, LedgerError::InsufficientFunds { .. })));

    let statement = ledger.statement(owner, AccountKind::Cash).await.unwrap();
    assert_eq!(statement.account.balance, dec!(25));
    assert!(verify_balance(&statement.account, &statement.transactions).is_ok());
}
