//! Input validation for postings and transfers.
//!
//! Everything here runs before a store session is opened, so a rejected
//! input never touches stored state.

use rust_decimal::Decimal;

use super::types::{AccountKind, PostTransactionInput, TransactionType, TransferInput};
use crate::error::LedgerError;

/// Decimal places a stored amount keeps.
pub const MAX_SCALE: u32 = 4;

/// Largest amount a posting, document or credit limit may carry.
///
/// Money columns are `NUMERIC(19, 4)`: fifteen integer digits, four decimals.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0x89E7_FFFF, 0x8AC7_2304, 0, false, MAX_SCALE);

/// Checks that an amount fits a money column: at most [`MAX_SCALE`] decimal
/// places and no larger than [`MAX_AMOUNT`].
pub fn validate_money(amount: Decimal) -> Result<(), LedgerError> {
    if amount.normalize().scale() > MAX_SCALE {
        return Err(LedgerError::Validation(format!(
            "amount {amount} has more than {MAX_SCALE} decimal places"
        )));
    }
    if amount.abs() > MAX_AMOUNT {
        return Err(LedgerError::Validation(format!(
            "amount {amount} exceeds the maximum of {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

/// Checks that an amount is strictly positive and fits a money column.
pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::Validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    validate_money(amount)
}

fn validate_description(description: &str) -> Result<(), LedgerError> {
    if description.trim().is_empty() {
        return Err(LedgerError::Validation(
            "description is required".to_string(),
        ));
    }
    Ok(())
}

/// Validates a posting against the target account kind.
pub fn validate_posting(kind: AccountKind, input: &PostTransactionInput) -> Result<(), LedgerError> {
    if input.transaction_type == TransactionType::Transfer {
        return Err(LedgerError::Validation(
            "transfers must be posted through the transfer operation".to_string(),
        ));
    }
    validate_amount(input.amount)?;
    validate_description(&input.description)?;
    if !input.category.allowed_for(kind) {
        return Err(LedgerError::Validation(format!(
            "category {} is not valid for a {kind} account",
            input.category.as_str()
        )));
    }
    Ok(())
}

/// Validates a transfer request.
pub fn validate_transfer(input: &TransferInput) -> Result<(), LedgerError> {
    if input.from == input.to {
        return Err(LedgerError::Validation(
            "source and destination accounts must differ".to_string(),
        ));
    }
    validate_amount(input.amount)?;
    validate_description(&input.description)
}
