//! Cash and bank account ledger.
//!
//! This module implements the account side of the system:
//! - Account and transaction types
//! - Signed balance replay and verification
//! - Posting and transfer validation
//! - The `AccountLedger` service

pub mod balance;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod balance_props;
#[cfg(test)]
mod tests;

pub use balance::{BalanceDrift, replay_balance, signed_amount, verify_balance};
pub use service::AccountLedger;
pub use types::{
    Account, AccountKind, AccountStatement, BankAccountType, BankDetails, Category,
    DocumentType, PostTransactionInput, Posting, RelatedDocument, Transaction, TransactionType,
    TransferInput, TransferReceipt,
};
