//! Signed balance arithmetic over transaction logs.

use rust_decimal::Decimal;
use serde::Serialize;

use super::types::{Account, Transaction, TransactionType};

/// Returns the amount a transaction adds to its account balance.
///
/// Income is positive, expense is negative, transfer markers are zero.
#[must_use]
pub fn signed_amount(transaction_type: TransactionType, amount: Decimal) -> Decimal {
    match transaction_type {
        TransactionType::Income => amount,
        TransactionType::Expense => -amount,
        TransactionType::Transfer => Decimal::ZERO,
    }
}

/// Replays a transaction log from a zero balance.
#[must_use]
pub fn replay_balance<'a, I>(transactions: I) -> Decimal
where
    I: IntoIterator<Item = &'a Transaction>,
{
    transactions
        .into_iter()
        .map(|t| signed_amount(t.transaction_type, t.amount))
        .sum()
}

/// Mismatch between a stored balance and its replayed log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceDrift {
    /// Balance stored on the account.
    pub recorded: Decimal,
    /// Balance obtained by replaying the log.
    pub replayed: Decimal,
}

/// Checks that `account.balance` equals the replay of `transactions`.
pub fn verify_balance(account: &Account, transactions: &[Transaction]) -> Result<(), BalanceDrift> {
    let replayed = replay_balance(transactions);
    if replayed == account.balance {
        Ok(())
    } else {
        Err(BalanceDrift {
            recorded: account.balance,
            replayed,
        })
    }
}
