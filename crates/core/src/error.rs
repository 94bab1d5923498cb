//! Error taxonomy for ledger, party and payment operations.
//!
//! Every expected business condition is a [`LedgerError`] variant. Store
//! faults arrive as [`StoreError`] and are folded in through `From`, so
//! services can use `?` across both.

use billfold_shared::{
    AppError,
    types::{InvoiceId, NoteId, PartyId, QuoteId, UserId},
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::account::AccountKind;
use crate::store::StoreError;

/// Machine-checkable classification of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Account, party or document missing.
    NotFound,
    /// Duplicate account, identifier or document number.
    AlreadyExists,
    /// Missing or malformed input.
    ValidationError,
    /// Debit larger than the account balance.
    InsufficientFunds,
    /// Payment amount differs from the sum of its allocations.
    AmountMismatch,
    /// Invoice would push the party past its credit limit.
    CreditLimitExceeded,
    /// Payment targets an invoice that is already paid.
    InvoiceAlreadyPaid,
    /// The account required by a payment method does not exist.
    AccountNotConfigured,
    /// A concurrent writer won; the operation may be retried.
    Conflict,
    /// Unexpected store fault.
    Internal,
}

impl ErrorKind {
    /// Returns the HTTP status code the caller should answer with.
    #[must_use]
    pub const fn http_status_code(self) -> u16 {
        match self {
            // 400 Bad Request - validation and business rule errors
            Self::ValidationError
            | Self::InsufficientFunds
            | Self::AmountMismatch
            | Self::CreditLimitExceeded
            | Self::InvoiceAlreadyPaid
            | Self::AccountNotConfigured => 400,

            // 404 Not Found
            Self::NotFound => 404,

            // 409 Conflict - duplicates and concurrency errors
            Self::AlreadyExists | Self::Conflict => 409,

            // 500 Internal Server Error
            Self::Internal => 500,
        }
    }
}

/// Errors that can occur during ledger, party and payment operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Not Found ==========
    /// No account of this kind exists for the user.
    #[error("{kind} account not found for user {owner}")]
    AccountNotFound {
        /// Account owner.
        owner: UserId,
        /// Requested account kind.
        kind: AccountKind,
    },

    /// Party not found (or owned by another user).
    #[error("Party not found: {0}")]
    PartyNotFound(PartyId),

    /// Invoice not found on the party.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// Quote not found on the party.
    #[error("Quote not found: {0}")]
    QuoteNotFound(QuoteId),

    /// Credit/debit note not found on the party.
    #[error("Note not found: {0}")]
    NoteNotFound(NoteId),

    // ========== Validation Errors ==========
    /// Duplicate account, identifier or document number.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Missing or malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    // ========== Business Rule Errors ==========
    /// Expense or transfer larger than the available balance.
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance before the operation.
        available: Decimal,
        /// Amount requested.
        requested: Decimal,
    },

    /// Payment amount does not match its allocations.
    #[error("Payment amount {amount} does not match allocated total {allocated}")]
    AmountMismatch {
        /// Declared payment amount.
        amount: Decimal,
        /// Sum of per-invoice allocations.
        allocated: Decimal,
    },

    /// Invoice would exceed the party's credit limit.
    #[error("Credit limit exceeded: limit {limit}, current balance {current}, requested {requested}")]
    CreditLimitExceeded {
        /// Party credit limit.
        limit: Decimal,
        /// Current party balance.
        current: Decimal,
        /// New invoice total.
        requested: Decimal,
    },

    /// Invoice is already fully paid.
    #[error("Invoice {0} is already paid")]
    InvoiceAlreadyPaid(InvoiceId),

    /// The payment method needs an account the user has not set up.
    #[error("No {0} account configured for this payment method")]
    AccountNotConfigured(AccountKind),

    // ========== Concurrency Errors ==========
    /// Concurrent modification detected.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Store Errors ==========
    /// Store fault.
    #[error("Store error: {0}")]
    Store(String),
}

impl LedgerError {
    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AccountNotFound { .. }
            | Self::PartyNotFound(_)
            | Self::InvoiceNotFound(_)
            | Self::QuoteNotFound(_)
            | Self::NoteNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::AmountMismatch { .. } => ErrorKind::AmountMismatch,
            Self::CreditLimitExceeded { .. } => ErrorKind::CreditLimitExceeded,
            Self::InvoiceAlreadyPaid(_) => ErrorKind::InvoiceAlreadyPaid,
            Self::AccountNotConfigured(_) => ErrorKind::AccountNotConfigured,
            Self::ConcurrentModification => ErrorKind::Conflict,
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            Self::PartyNotFound(_) => "PARTY_NOT_FOUND",
            Self::InvoiceNotFound(_) => "INVOICE_NOT_FOUND",
            Self::QuoteNotFound(_) => "QUOTE_NOT_FOUND",
            Self::NoteNotFound(_) => "NOTE_NOT_FOUND",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            Self::CreditLimitExceeded { .. } => "CREDIT_LIMIT_EXCEEDED",
            Self::InvoiceAlreadyPaid(_) => "INVOICE_ALREADY_PAID",
            Self::AccountNotConfigured(_) => "ACCOUNT_NOT_CONFIGURED",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        self.kind().http_status_code()
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(what) => Self::AlreadyExists(what),
            StoreError::Conflict(_) => Self::ConcurrentModification,
            StoreError::Backend(message) => Self::Store(message),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::ValidationError => Self::Validation(message),
            ErrorKind::AlreadyExists | ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::Internal => Self::Database(message),
            ErrorKind::InsufficientFunds
            | ErrorKind::AmountMismatch
            | ErrorKind::CreditLimitExceeded
            | ErrorKind::InvoiceAlreadyPaid
            | ErrorKind::AccountNotConfigured => Self::BusinessRule {
                code: err.error_code(),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LedgerError::PartyNotFound(PartyId::new()).error_code(),
            "PARTY_NOT_FOUND"
        );
        assert_eq!(
            LedgerError::InsufficientFunds {
                available: dec!(10),
                requested: dec!(20),
            }
            .error_code(),
            "INSUFFICIENT_FUNDS"
        );
        assert_eq!(
            LedgerError::AccountNotConfigured(AccountKind::Bank).error_code(),
            "ACCOUNT_NOT_CONFIGURED"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            LedgerError::InvoiceNotFound(InvoiceId::new()).http_status_code(),
            404
        );
        assert_eq!(
            LedgerError::Validation("amount".into()).http_status_code(),
            400
        );
        assert_eq!(
            LedgerError::AmountMismatch {
                amount: dec!(100),
                allocated: dec!(90),
            }
            .http_status_code(),
            400
        );
        assert_eq!(
            LedgerError::CreditLimitExceeded {
                limit: dec!(1000),
                current: dec!(900),
                requested: dec!(200),
            }
            .http_status_code(),
            400
        );
        assert_eq!(LedgerError::AlreadyExists("x".into()).http_status_code(), 409);
        assert_eq!(LedgerError::ConcurrentModification.http_status_code(), 409);
        assert_eq!(LedgerError::Store("down".into()).http_status_code(), 500);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::ConcurrentModification.is_retryable());
        assert!(!LedgerError::Validation("x".into()).is_retryable());
        assert!(!LedgerError::Store("x".into()).is_retryable());
    }

    #[test]
    fn test_store_error_conversion() {
        assert!(matches!(
            LedgerError::from(StoreError::UniqueViolation("tax_id".into())),
            LedgerError::AlreadyExists(_)
        ));
        assert!(matches!(
            LedgerError::from(StoreError::Conflict("deadlock".into())),
            LedgerError::ConcurrentModification
        ));
        assert!(matches!(
            LedgerError::from(StoreError::Backend("io".into())),
            LedgerError::Store(_)
        ));
    }

    #[test]
    fn test_app_error_conversion() {
        let app: AppError = LedgerError::InsufficientFunds {
            available: dec!(100),
            requested: dec!(400),
        }
        .into();
        assert_eq!(app.status_code(), 400);
        assert_eq!(app.error_code(), "INSUFFICIENT_FUNDS");

        let app: AppError = LedgerError::QuoteNotFound(QuoteId::new()).into();
        assert_eq!(app.status_code(), 404);

        let app: AppError = LedgerError::AlreadyExists("cuit".into()).into();
        assert_eq!(app.status_code(), 409);
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::InsufficientFunds {
            available: dec!(100.00),
            requested: dec!(400.00),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: available 100.00, requested 400.00"
        );

        let err = LedgerError::AccountNotConfigured(AccountKind::Bank);
        assert_eq!(
            err.to_string(),
            "No bank account configured for this payment method"
        );
    }
}
